use super::client::ProxyClient;
use super::{LoadState, RequestTicket, Tickets};
use crate::crop;
use crate::error::AppError;
use crate::models::{DetectedObject, SegmentationResponse};
use image::{DynamicImage, GenericImageView};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.7;

struct SourceImage {
    file_name: String,
    bytes: Vec<u8>,
    decoded: DynamicImage,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetectionSummary {
    pub count: usize,
    pub average_confidence: f64,
    pub max_confidence: f64,
}

pub struct SegmentationPage {
    pub state: LoadState,
    pub confidence_threshold: f64,
    source: Option<SourceImage>,
    objects: Vec<DetectedObject>,
    selected: Option<String>,
    tickets: Tickets,
}

impl Default for SegmentationPage {
    fn default() -> Self {
        Self::new()
    }
}

impl SegmentationPage {
    pub fn new() -> Self {
        Self {
            state: LoadState::Idle,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            source: None,
            objects: Vec::new(),
            selected: None,
            tickets: Tickets::default(),
        }
    }

    /// Loads a new source image and resets previous detections.
    pub fn set_image(&mut self, file_name: &str, bytes: Vec<u8>) -> Result<(), AppError> {
        let decoded = image::load_from_memory(&bytes)?;
        let (width, height) = decoded.dimensions();
        log::debug!("Loaded {} ({}x{})", file_name, width, height);
        self.source = Some(SourceImage {
            file_name: file_name.to_string(),
            bytes,
            decoded,
        });
        self.objects.clear();
        self.selected = None;
        self.state = LoadState::Idle;
        Ok(())
    }

    pub fn objects(&self) -> &[DetectedObject] {
        &self.objects
    }

    pub fn select(&mut self, object_id: &str) {
        if self.objects.iter().any(|o| o.id == object_id) {
            self.selected = Some(object_id.to_string());
        }
    }

    pub fn selected(&self) -> Option<&DetectedObject> {
        let id = self.selected.as_ref()?;
        self.objects.iter().find(|o| &o.id == id)
    }

    pub fn begin_segmentation(&mut self) -> Option<(RequestTicket, String, Vec<u8>)> {
        let source = self.source.as_ref()?;
        let upload = (source.file_name.clone(), source.bytes.clone());
        self.state = LoadState::Loading;
        let ticket = self.tickets.issue();
        Some((ticket, upload.0, upload.1))
    }

    pub fn apply(
        &mut self,
        ticket: RequestTicket,
        result: Result<SegmentationResponse, AppError>,
    ) -> bool {
        if !self.tickets.is_current(ticket) {
            log::debug!("Dropping stale segmentation response {:?}", ticket);
            return false;
        }
        let source = match self.source.as_ref() {
            Some(source) => source,
            None => return false,
        };

        match result {
            Ok(response) if response.success => {
                let threshold = self.confidence_threshold;
                self.objects = response
                    .results
                    .into_iter()
                    .enumerate()
                    .filter(|(_, r)| r.confidence >= threshold)
                    .map(|(i, r)| {
                        let cropped_image_url = crop::cropped_image_url(&source.decoded, r.bbox)
                            .map_err(|e| log::warn!("Could not crop object {}: {}", i + 1, e))
                            .ok();
                        DetectedObject {
                            id: (i + 1).to_string(),
                            bbox: r.bbox,
                            description: r.description,
                            confidence: r.confidence,
                            cropped_image_url,
                        }
                    })
                    .collect();
                log::info!(
                    "{} objects above {} confidence",
                    self.objects.len(),
                    self.confidence_threshold
                );
                self.state = LoadState::Success;
            }
            Ok(response) => {
                let message = if response.message.is_empty() {
                    "Segmentation failed".to_string()
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
        log::warn!("Segmentation failed: {}", message);
        self.objects.clear();
        self.selected = None;
        self.state = LoadState::Error(message);
    }

    pub async fn run(&mut self, client: &ProxyClient) -> bool {
        let Some((ticket, file_name, bytes)) = self.begin_segmentation() else {
            return false;
        };
        let result = client.segment(bytes, &file_name).await;
        self.apply(ticket, result)
    }

    pub fn summary(&self) -> Option<DetectionSummary> {
        if self.objects.is_empty() {
            return None;
        }
        let count = self.objects.len();
        let total: f64 = self.objects.iter().map(|o| o.confidence).sum();
        let max_confidence = self
            .objects
            .iter()
            .map(|o| o.confidence)
            .fold(f64::MIN, f64::max);
        Some(DetectionSummary {
            count,
            average_confidence: total / count as f64,
            max_confidence,
        })
    }

    /// Writes every detected object as `{description}_{pct}%.jpg` into `dir`.
    pub fn save_crops(&self, dir: &Path) -> Result<Vec<PathBuf>, AppError> {
        let source = match self.source.as_ref() {
            Some(source) => source,
            None => return Ok(Vec::new()),
        };
        if !dir.exists() {
            std::fs::create_dir_all(dir)?;
            log::debug!("Created output directory: {:?}", dir);
        }

        let mut written = Vec::with_capacity(self.objects.len());
        for object in &self.objects {
            let path = dir.join(download_name(object));
            crop::save_crop(&source.decoded, object.bbox, &path)?;
            written.push(path);
        }
        Ok(written)
    }
}

pub fn download_name(object: &DetectedObject) -> String {
    let label: String = object
        .description
        .chars()
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect();
    let label = if label.trim().is_empty() {
        format!("object-{}", object.id)
    } else {
        label
    };
    format!("{}_{}.jpg", label, super::render::percent(object.confidence))
}
