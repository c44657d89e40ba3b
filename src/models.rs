// src/models.rs

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImagePayload {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub object_image_url: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

/// A gallery entry. `score` is only set on similarity results.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct GalleryImage {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    pub payload: ImagePayload,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PaginationInfo {
    pub page: u32,
    pub page_size: u32,
    pub total_items: u64,
    pub total_pages: u32,
    pub has_next: bool,
    pub has_prev: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SearchParams {
    pub limit: u32,
    pub score_threshold: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SearchInfo {
    pub model_used: String,
    pub query_embedding_size: u32,
    pub search_params: SearchParams,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GalleryResponse {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub data: Vec<GalleryImage>,
    #[serde(default)]
    pub pagination: Option<PaginationInfo>,
    #[serde(default)]
    pub search_info: Option<SearchInfo>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingModel {
    V2,
    V3,
}

impl EmbeddingModel {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "v2" => Some(EmbeddingModel::V2),
            "v3" => Some(EmbeddingModel::V3),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EmbeddingModel::V2 => "v2",
            EmbeddingModel::V3 => "v3",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SimilaritySearchRequest {
    /// Base64 image bytes, without any `data:` prefix.
    pub image: String,
    pub model: EmbeddingModel,
    pub limit: u32,
    pub score_threshold: Option<f64>,
}

/// Body of `POST /image-gallery`: either a page listing or a similarity query.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum GalleryRequest {
    Search(SimilaritySearchRequest),
    Page { page: u32, page_size: u32 },
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SimilaritySearchResponse {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub model_used: String,
    #[serde(default)]
    pub query_embedding_size: u32,
    #[serde(default)]
    pub results: Vec<GalleryImage>,
    pub search_params: Option<SearchParams>,
}

/// `[x, y, width, height]` in source-image pixels.
pub type BBox = [f64; 4];

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SegmentationResult {
    pub bbox: BBox,
    #[serde(default)]
    pub description: String,
    pub confidence: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SegmentationResponse {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub results: Vec<SegmentationResult>,
    #[serde(default)]
    pub raw_output: Option<serde_json::Value>,
    #[serde(default)]
    pub debug_info: Option<serde_json::Value>,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct DetectedObject {
    pub id: String,
    pub bbox: BBox,
    pub description: String,
    pub confidence: f64,
    pub cropped_image_url: Option<String>,
}
