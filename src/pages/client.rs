use crate::error::AppError;
use crate::models::{
    GalleryRequest, GalleryResponse, SegmentationResponse, SimilaritySearchRequest,
    SimilaritySearchResponse,
};
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use url::Url;

/// Talks to the dashboard's own `/api/*` routes, the way the browser pages do.
pub struct ProxyClient {
    client: reqwest::Client,
    base_url: Url,
}

impl ProxyClient {
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self, AppError> {
        let mut base_url = Url::parse(base_url)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self { client, base_url })
    }

    pub async fn gallery(&self, request: &GalleryRequest) -> Result<GalleryResponse, AppError> {
        let url = self.base_url.join("api/image-gallery")?;
        log::debug!("POST {}", url);
        let response = self.client.post(url).json(request).send().await?;
        read_json(response).await
    }

    pub async fn similarity_search(
        &self,
        request: &SimilaritySearchRequest,
    ) -> Result<SimilaritySearchResponse, AppError> {
        let url = self.base_url.join("api/image-similarity-search")?;
        log::debug!("POST {}", url);
        let response = self.client.post(url).json(request).send().await?;
        read_json(response).await
    }

    pub async fn segment(
        &self,
        image: Vec<u8>,
        file_name: &str,
    ) -> Result<SegmentationResponse, AppError> {
        let url = self.base_url.join("api/segmentation")?;
        let content_type = mime_guess::from_path(file_name).first_or(mime::APPLICATION_OCTET_STREAM);
        log::debug!("POST {} ({} bytes, {})", url, image.len(), content_type);

        let part = Part::bytes(image)
            .file_name(file_name.to_string())
            .mime_str(content_type.essence_str())?;
        let form = Form::new().part("image", part);
        let response = self.client.post(url).multipart(form).send().await?;
        read_json(response).await
    }
}

/// Non-2xx answers surface the proxy's `error` string, or the bare status.
async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, AppError> {
    let status = response.status();
    if !status.is_success() {
        let body: Value = response.json().await.unwrap_or(Value::Null);
        let error = body
            .get("error")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("HTTP error! status: {}", status.as_u16()));
        let details = body
            .get("details")
            .and_then(Value::as_str)
            .map(str::to_string);
        return Err(AppError::Upstream {
            status: status.as_u16(),
            error,
            details,
        });
    }
    Ok(response.json().await?)
}
