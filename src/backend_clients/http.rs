use crate::backend::{Backend, SegmentationForm};
use crate::config::AppConfig;
use crate::error::AppError;
use crate::validation::is_present;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use std::time::Duration;
use url::Url;

const GALLERY_PATH: &str = "image-gallery";
const SIMILARITY_PATH: &str = "image-similarity-search";
const SEGMENTATION_PATH: &str = "segmentation-v2";

pub struct HttpBackend {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpBackend {
    pub fn new(config: &AppConfig) -> Result<Self, AppError> {
        log::debug!("Creating backend client for URL: {}", config.backend_url);
        let mut base_url = Url::parse(&config.backend_url)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        log::trace!("Backend client created successfully.");
        Ok(Self { client, base_url })
    }

    fn endpoint(&self, path: &str) -> Result<Url, AppError> {
        Ok(self.base_url.join(path)?)
    }

    async fn post_json(&self, path: &str, body: &Value) -> Result<reqwest::Response, AppError> {
        let url = self.endpoint(path)?;
        log::debug!("Forwarding JSON request to {}", url);
        Ok(self.client.post(url).json(body).send().await?)
    }
}

fn status_line(response: &reqwest::Response) -> String {
    let status = response.status();
    format!(
        "{} {}",
        status.as_u16(),
        status.canonical_reason().unwrap_or_default()
    )
}

/// Non-2xx from `/image-gallery`: prefer the JSON `detail` field.
async fn detail_error(response: reqwest::Response) -> AppError {
    let status = response.status().as_u16();
    let fallback = format!("Backend error: {}", status_line(&response));
    let body: Value = response.json().await.unwrap_or(Value::Null);
    let detail = body.get("detail");
    let error = match detail {
        Some(Value::String(text)) if is_present(detail) => text.clone(),
        Some(other) if is_present(detail) => other.to_string(),
        _ => fallback,
    };
    log::warn!("Backend returned {}: {}", status, error);
    AppError::Upstream {
        status,
        error,
        details: None,
    }
}

/// Non-2xx from the search and segmentation endpoints: keep the raw body text.
async fn raw_text_error(response: reqwest::Response) -> AppError {
    let status = response.status().as_u16();
    let error = format!("Backend service error: {}", status_line(&response));
    let details = response.text().await.unwrap_or_default();
    log::error!("Backend error: {} {}", status, details);
    AppError::Upstream {
        status,
        error,
        details: Some(details),
    }
}

fn into_multipart(form: SegmentationForm) -> Result<Form, AppError> {
    let mut multipart = Form::new();
    for part in form.parts {
        if part.is_file() {
            let mut file_part = Part::bytes(part.data.to_vec());
            if let Some(file_name) = part.file_name {
                file_part = file_part.file_name(file_name);
            }
            if let Some(content_type) = part.content_type {
                file_part = file_part.mime_str(&content_type)?;
            }
            multipart = multipart.part(part.name, file_part);
        } else {
            let text = String::from_utf8_lossy(&part.data).into_owned();
            multipart = multipart.text(part.name, text);
        }
    }
    Ok(multipart)
}

#[async_trait]
impl Backend for HttpBackend {
    async fn image_gallery(&self, body: &Value) -> Result<Value, AppError> {
        let response = self.post_json(GALLERY_PATH, body).await?;
        if !response.status().is_success() {
            return Err(detail_error(response).await);
        }
        Ok(response.json().await?)
    }

    async fn similarity_search(&self, body: &Value) -> Result<Value, AppError> {
        let response = self.post_json(SIMILARITY_PATH, body).await?;
        if !response.status().is_success() {
            return Err(raw_text_error(response).await);
        }
        Ok(response.json().await?)
    }

    async fn segment(&self, form: SegmentationForm) -> Result<Value, AppError> {
        let url = self.endpoint(SEGMENTATION_PATH)?;
        log::debug!("Forwarding {} form fields to {}", form.parts.len(), url);
        let response = self
            .client
            .post(url)
            .multipart(into_multipart(form)?)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(raw_text_error(response).await);
        }
        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::FormPart;
    use actix_web::web::Bytes;
    use serde_json::json;
    use wiremock::matchers::{body_json, body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn backend_for(server: &MockServer) -> HttpBackend {
        let config = AppConfig {
            backend_url: server.uri(),
            ..AppConfig::default()
        };
        HttpBackend::new(&config).unwrap()
    }

    #[tokio::test]
    async fn gallery_forwards_body_verbatim() {
        let server = MockServer::start().await;
        let request = json!({ "page": 3, "page_size": 12 });

        Mock::given(method("POST"))
            .and(path("/image-gallery"))
            .and(body_json(&request))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "message": "ok",
                "data": [],
                "pagination": {
                    "page": 3, "page_size": 12, "total_items": 40,
                    "total_pages": 4, "has_next": true, "has_prev": true
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let result = backend_for(&server).image_gallery(&request).await.unwrap();
        assert_eq!(result["pagination"]["total_pages"], 4);
    }

    #[tokio::test]
    async fn gallery_error_uses_detail_field() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/image-gallery"))
            .respond_with(
                ResponseTemplate::new(404).set_body_json(json!({ "detail": "Page out of range" })),
            )
            .mount(&server)
            .await;

        let err = backend_for(&server)
            .image_gallery(&json!({ "page": 99, "page_size": 20 }))
            .await
            .unwrap_err();
        match err {
            AppError::Upstream { status, error, .. } => {
                assert_eq!(status, 404);
                assert_eq!(error, "Page out of range");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn gallery_error_without_detail_falls_back_to_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/image-gallery"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let err = backend_for(&server)
            .image_gallery(&json!({ "page": 1, "page_size": 20 }))
            .await
            .unwrap_err();
        match err {
            AppError::Upstream { status, error, .. } => {
                assert_eq!(status, 500);
                assert_eq!(error, "Backend error: 500 Internal Server Error");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn gallery_error_with_empty_detail_falls_back_to_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/image-gallery"))
            .respond_with(ResponseTemplate::new(422).set_body_json(json!({ "detail": "" })))
            .mount(&server)
            .await;

        let err = backend_for(&server)
            .image_gallery(&json!({ "page": 1, "page_size": 20 }))
            .await
            .unwrap_err();
        match err {
            AppError::Upstream { status, error, .. } => {
                assert_eq!(status, 422);
                assert_eq!(error, "Backend error: 422 Unprocessable Entity");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn gallery_error_with_false_or_zero_detail_falls_back_to_status() {
        for detail in [json!(false), json!(0)] {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/image-gallery"))
                .respond_with(ResponseTemplate::new(400).set_body_json(json!({ "detail": detail })))
                .mount(&server)
                .await;

            let err = backend_for(&server)
                .image_gallery(&json!({ "page": 1, "page_size": 20 }))
                .await
                .unwrap_err();
            assert_eq!(err.to_string(), "Backend error: 400 Bad Request");
        }
    }

    #[tokio::test]
    async fn segment_error_keeps_raw_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/segmentation-v2"))
            .respond_with(ResponseTemplate::new(500).set_body_string("CUDA out of memory"))
            .mount(&server)
            .await;

        let form = SegmentationForm {
            parts: vec![FormPart {
                name: "image".to_string(),
                file_name: Some("cat.png".to_string()),
                content_type: Some("image/png".to_string()),
                data: Bytes::from_static(b"PNGDATA"),
            }],
        };
        let err = backend_for(&server).segment(form).await.unwrap_err();
        match err {
            AppError::Upstream { status, error, details } => {
                assert_eq!(status, 500);
                assert_eq!(error, "Backend service error: 500 Internal Server Error");
                assert_eq!(details.as_deref(), Some("CUDA out of memory"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn similarity_error_keeps_raw_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/image-similarity-search"))
            .respond_with(ResponseTemplate::new(502).set_body_string("upstream exploded"))
            .mount(&server)
            .await;

        let err = backend_for(&server)
            .similarity_search(&json!({ "image": "x", "model": "v2", "limit": 5, "score_threshold": 0.5 }))
            .await
            .unwrap_err();
        match err {
            AppError::Upstream { status, error, details } => {
                assert_eq!(status, 502);
                assert_eq!(error, "Backend service error: 502 Bad Gateway");
                assert_eq!(details.as_deref(), Some("upstream exploded"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn segment_sends_multipart_with_file_name() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/segmentation-v2"))
            .and(body_string_contains("name=\"image\"; filename=\"cat.png\""))
            .and(body_string_contains("PNGDATA"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "message": "done",
                "results": [{ "bbox": [1, 2, 3, 4], "description": "cat", "confidence": 0.9 }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let form = SegmentationForm {
            parts: vec![FormPart {
                name: "image".to_string(),
                file_name: Some("cat.png".to_string()),
                content_type: Some("image/png".to_string()),
                data: Bytes::from_static(b"PNGDATA"),
            }],
        };
        let result = backend_for(&server).segment(form).await.unwrap();
        assert_eq!(result["results"][0]["description"], "cat");
    }

    #[tokio::test]
    async fn unreachable_backend_is_a_request_error() {
        let config = AppConfig {
            backend_url: "http://127.0.0.1:9".to_string(),
            ..AppConfig::default()
        };
        let err = HttpBackend::new(&config)
            .unwrap()
            .image_gallery(&json!({ "page": 1, "page_size": 20 }))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Request(_)));
    }
}
