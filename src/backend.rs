use crate::error::AppError;
use async_trait::async_trait;
use actix_web::web::Bytes;
use serde_json::Value;

/// One field of a multipart upload, kept as received.
#[derive(Debug, Clone)]
pub struct FormPart {
    pub name: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Bytes,
}

impl FormPart {
    pub fn is_file(&self) -> bool {
        self.file_name.is_some() || self.content_type.is_some()
    }
}

#[derive(Debug, Clone, Default)]
pub struct SegmentationForm {
    pub parts: Vec<FormPart>,
}

impl SegmentationForm {
    pub fn has_image(&self) -> bool {
        self.parts
            .iter()
            .any(|part| part.name == "image" && !part.data.is_empty())
    }

    pub fn len_bytes(&self) -> usize {
        self.parts.iter().map(|part| part.data.len()).sum()
    }
}

/// The external inference service. Every call is a single request/response.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn image_gallery(&self, body: &Value) -> Result<Value, AppError>;
    async fn similarity_search(&self, body: &Value) -> Result<Value, AppError>;
    async fn segment(&self, form: SegmentationForm) -> Result<Value, AppError>;
}
