use super::client::ProxyClient;
use super::{strip_data_url, LoadState, RequestTicket, Tickets};
use crate::error::AppError;
use crate::models::{EmbeddingModel, GalleryImage, SimilaritySearchRequest, SimilaritySearchResponse};
use base64::Engine;

#[derive(Debug, Clone)]
enum QueryImage {
    File(Vec<u8>),
    DataUrl(String),
}

#[derive(Debug)]
pub struct SimilarityPage {
    pub state: LoadState,
    pub model: EmbeddingModel,
    pub limit: u32,
    pub score_threshold: f64,
    query: Option<QueryImage>,
    response: Option<SimilaritySearchResponse>,
    results: Vec<GalleryImage>,
    tickets: Tickets,
}

impl Default for SimilarityPage {
    fn default() -> Self {
        Self::new()
    }
}

impl SimilarityPage {
    pub fn new() -> Self {
        Self {
            state: LoadState::Idle,
            model: EmbeddingModel::V2,
            limit: 15,
            score_threshold: 0.6,
            query: None,
            response: None,
            results: Vec::new(),
            tickets: Tickets::default(),
        }
    }

    pub fn set_image_file(&mut self, bytes: Vec<u8>) {
        self.query = Some(QueryImage::File(bytes));
    }

    pub fn set_image_data_url(&mut self, data_url: String) {
        self.query = Some(QueryImage::DataUrl(data_url));
    }

    pub fn results(&self) -> &[GalleryImage] {
        &self.results
    }

    pub fn response(&self) -> Option<&SimilaritySearchResponse> {
        self.response.as_ref()
    }

    /// None when no query image has been chosen yet.
    pub fn begin_search(&mut self) -> Option<(RequestTicket, SimilaritySearchRequest)> {
        let image = match self.query.as_ref()? {
            QueryImage::File(bytes) => base64::engine::general_purpose::STANDARD.encode(bytes),
            QueryImage::DataUrl(url) => strip_data_url(url).to_string(),
        };
        self.state = LoadState::Loading;
        self.response = None;
        let ticket = self.tickets.issue();
        Some((
            ticket,
            SimilaritySearchRequest {
                image,
                model: self.model,
                limit: self.limit,
                score_threshold: Some(self.score_threshold),
            },
        ))
    }

    pub fn apply(
        &mut self,
        ticket: RequestTicket,
        result: Result<SimilaritySearchResponse, AppError>,
    ) -> bool {
        if !self.tickets.is_current(ticket) {
            log::debug!("Dropping stale similarity response {:?}", ticket);
            return false;
        }
        match result {
            Ok(response) if response.success => {
                self.results = response.results.clone();
                self.response = Some(response);
                self.state = LoadState::Success;
            }
            Ok(response) => {
                let message = if response.message.is_empty() {
                    "Search failed".to_string()
                } else {
                    response.message
                };
                self.fail(message);
            }
            Err(e) => self.fail(e.to_string()),
        }
        true
    }

    fn fail(&mut self, message: String) {
        log::warn!("Similarity search failed: {}", message);
        self.results.clear();
        self.state = LoadState::Error(message);
    }

    pub async fn search(&mut self, client: &ProxyClient) -> bool {
        let Some((ticket, request)) = self.begin_search() else {
            return false;
        };
        let result = client.similarity_search(&request).await;
        self.apply(ticket, result)
    }
}
