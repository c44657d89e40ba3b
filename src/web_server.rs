use actix_multipart::Multipart;
use actix_web::http::Method;
use actix_web::{web, App, HttpResponse, HttpResponseBuilder, HttpServer};
use futures::TryStreamExt;
use serde_json::Value;
use std::sync::Arc;
use crate::backend::{Backend, FormPart, SegmentationForm};
use crate::config::AppConfig;
use crate::error::AppError;
use crate::models::GalleryRequest;
use crate::validation::validate_similarity_request;

type BackendData = web::Data<Arc<dyn Backend>>;

fn allow_cors(builder: &mut HttpResponseBuilder) -> &mut HttpResponseBuilder {
    builder
        .insert_header(("Access-Control-Allow-Origin", "*"))
        .insert_header(("Access-Control-Allow-Methods", "POST, OPTIONS"))
        .insert_header(("Access-Control-Allow-Headers", "Content-Type"))
}

fn parse_body(body: &web::Bytes) -> Result<Value, AppError> {
    Ok(serde_json::from_slice(body)?)
}

async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "status": "OK" }))
}

async fn preflight() -> HttpResponse {
    allow_cors(&mut HttpResponse::Ok()).finish()
}

async fn image_gallery(
    backend: BackendData,
    body: web::Bytes,
) -> Result<HttpResponse, AppError> {
    // This route reports the failure message itself in `error`.
    let body = serde_json::from_slice::<Value>(&body).map_err(|e| {
        log::error!("Image gallery API error: {}", e);
        AppError::Generic(e.to_string())
    })?;
    match serde_json::from_value::<GalleryRequest>(body.clone()) {
        Ok(GalleryRequest::Page { page, page_size }) => {
            log::debug!("Gallery page request: page={} page_size={}", page, page_size)
        }
        Ok(GalleryRequest::Search(req)) => log::debug!(
            "Gallery similarity request: model={} limit={}",
            req.model.as_str(),
            req.limit
        ),
        Err(_) => log::debug!("Gallery request with unrecognized shape, forwarding as is"),
    }

    let data = backend.image_gallery(&body).await.map_err(|e| match e {
        AppError::Request(err) => {
            log::error!("Image gallery API error: {}", err);
            AppError::Generic(err.to_string())
        }
        other => other,
    })?;
    Ok(HttpResponse::Ok().json(data))
}

async fn similarity_search(
    backend: BackendData,
    body: web::Bytes,
) -> Result<HttpResponse, AppError> {
    let body = parse_body(&body)?;
    validate_similarity_request(&body)?;

    let data = backend.similarity_search(&body).await?;
    log::trace!("Similarity search response: {}", data);
    Ok(allow_cors(&mut HttpResponse::Ok()).json(data))
}

async fn read_form(mut payload: Multipart, limit: usize) -> Result<SegmentationForm, AppError> {
    let mut form = SegmentationForm::default();
    let mut total = 0usize;

    while let Some(mut field) = payload
        .try_next()
        .await
        .map_err(|e| AppError::Multipart(e.to_string()))?
    {
        let disposition = field.content_disposition();
        let name = disposition
            .and_then(|d| d.get_name())
            .unwrap_or_default()
            .to_string();
        let file_name = disposition.and_then(|d| d.get_filename()).map(str::to_string);
        let content_type = field.content_type().map(|m| m.essence_str().to_string());

        let mut data = web::BytesMut::new();
        while let Some(chunk) = field
            .try_next()
            .await
            .map_err(|e| AppError::Multipart(e.to_string()))?
        {
            total += chunk.len();
            if total > limit {
                return Err(AppError::PayloadTooLarge(limit));
            }
            data.extend_from_slice(&chunk);
        }

        log::trace!("Received form field '{}' ({} bytes)", name, data.len());
        form.parts.push(FormPart {
            name,
            file_name,
            content_type,
            data: data.freeze(),
        });
    }

    Ok(form)
}

async fn segmentation(
    backend: BackendData,
    app_config: web::Data<AppConfig>,
    payload: Multipart,
) -> Result<HttpResponse, AppError> {
    let form = read_form(payload, app_config.body_limit_bytes()).await?;
    if !form.has_image() {
        return Err(AppError::Validation("image file is required".to_string()));
    }
    log::debug!("Segmentation request with {} bytes of form data", form.len_bytes());

    let data = backend.segment(form).await?;
    Ok(allow_cors(&mut HttpResponse::Ok()).json(data))
}

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/health").route(web::get().to(health_check)))
        .service(web::resource("/api/image-gallery").route(web::post().to(image_gallery)))
        .service(
            web::resource("/api/image-similarity-search")
                .route(web::post().to(similarity_search))
                .route(web::method(Method::OPTIONS).to(preflight)),
        )
        .service(
            web::resource("/api/segmentation")
                .route(web::post().to(segmentation))
                .route(web::method(Method::OPTIONS).to(preflight)),
        );
}

pub async fn start_web_server(
    config: Arc<AppConfig>,
    backend: Arc<dyn Backend>,
) -> std::io::Result<()> {
    let port = config.web_port;
    let body_limit = config.body_limit_bytes();
    let config_data = web::Data::from(config);
    let backend_data: BackendData = web::Data::new(backend);

    log::info!("Starting web server on port: {}", port);
    log::debug!("Forwarding to backend at {}", config_data.backend_url);

    HttpServer::new(move || {
        App::new()
            .app_data(config_data.clone())
            .app_data(backend_data.clone())
            .app_data(web::PayloadConfig::new(body_limit))
            .configure(routes)
    })
    .bind(format!("0.0.0.0:{}", port))?
    .run()
    .await
}
