use super::client::ProxyClient;
use super::{LoadState, RequestTicket, Tickets};
use crate::error::AppError;
use crate::models::{
    EmbeddingModel, GalleryImage, GalleryRequest, GalleryResponse, PaginationInfo, SearchInfo,
    SimilaritySearchRequest,
};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

pub const DEFAULT_PAGE_SIZE: u32 = 20;
const PAGE_WINDOW: u32 = 5;

#[derive(Debug, Clone, Default)]
pub struct GalleryFilters {
    pub query: String,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

impl GalleryFilters {
    fn is_active(&self) -> bool {
        !self.query.is_empty() || self.date_from.is_some() || self.date_to.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct SearchSettings {
    pub model: EmbeddingModel,
    pub limit: u32,
    pub score_threshold: f64,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            model: EmbeddingModel::V2,
            limit: 10,
            score_threshold: 0.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Pending {
    Page,
    Search,
}

/// Gallery view: paged listing, or similarity results when in search mode.
#[derive(Debug)]
pub struct GalleryPage {
    pub state: LoadState,
    pub filters: GalleryFilters,
    pub search: SearchSettings,
    images: Vec<GalleryImage>,
    pagination: Option<PaginationInfo>,
    search_info: Option<SearchInfo>,
    search_mode: bool,
    current_page: u32,
    selected: Vec<String>,
    tickets: Tickets,
    pending: Option<(RequestTicket, Pending)>,
}

impl Default for GalleryPage {
    fn default() -> Self {
        Self::new()
    }
}

impl GalleryPage {
    pub fn new() -> Self {
        Self {
            state: LoadState::Idle,
            filters: GalleryFilters::default(),
            search: SearchSettings::default(),
            images: Vec::new(),
            pagination: None,
            search_info: None,
            search_mode: false,
            current_page: 1,
            selected: Vec::new(),
            tickets: Tickets::default(),
            pending: None,
        }
    }

    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    pub fn is_search_mode(&self) -> bool {
        self.search_mode
    }

    pub fn pagination(&self) -> Option<&PaginationInfo> {
        self.pagination.as_ref()
    }

    pub fn search_info(&self) -> Option<&SearchInfo> {
        self.search_info.as_ref()
    }

    pub fn selected(&self) -> &[String] {
        &self.selected
    }

    pub fn begin_load(&mut self, page: u32, page_size: u32) -> (RequestTicket, GalleryRequest) {
        let page = page.max(1);
        self.current_page = page;
        self.state = LoadState::Loading;
        let ticket = self.tickets.issue();
        self.pending = Some((ticket, Pending::Page));
        (ticket, GalleryRequest::Page { page, page_size })
    }

    /// `image` is bare base64 (no data URL prefix).
    pub fn begin_search(&mut self, image: String) -> (RequestTicket, GalleryRequest) {
        self.state = LoadState::Loading;
        let ticket = self.tickets.issue();
        self.pending = Some((ticket, Pending::Search));
        let request = SimilaritySearchRequest {
            image,
            model: self.search.model,
            limit: self.search.limit,
            score_threshold: Some(self.search.score_threshold),
        };
        (ticket, GalleryRequest::Search(request))
    }

    /// Applies a finished call. Returns false when a newer call superseded it.
    pub fn apply(
        &mut self,
        ticket: RequestTicket,
        result: Result<GalleryResponse, AppError>,
    ) -> bool {
        let kind = match self.pending {
            Some((pending, kind)) if pending == ticket && self.tickets.is_current(ticket) => kind,
            _ => {
                log::debug!("Dropping stale gallery response {:?}", ticket);
                return false;
            }
        };
        self.pending = None;

        let default_error = match kind {
            Pending::Page => "Failed to load images",
            Pending::Search => "Search failed",
        };
        match result {
            Ok(response) if response.success => {
                self.images = response.data;
                match kind {
                    Pending::Page => {
                        self.pagination = response.pagination;
                        self.search_mode = false;
                        self.search_info = None;
                    }
                    Pending::Search => {
                        self.search_info = response.search_info;
                        self.search_mode = true;
                        self.pagination = None;
                    }
                }
                self.state = LoadState::Success;
            }
            Ok(response) => {
                let message = if response.message.is_empty() {
                    default_error.to_string()
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
        log::warn!("Gallery request failed: {}", message);
        self.images.clear();
        self.state = LoadState::Error(message);
    }

    pub async fn load(&mut self, client: &ProxyClient, page: u32, page_size: u32) -> bool {
        let (ticket, request) = self.begin_load(page, page_size);
        let result = client.gallery(&request).await;
        self.apply(ticket, result)
    }

    pub async fn search_similar(&mut self, client: &ProxyClient, image: String) -> bool {
        let (ticket, request) = self.begin_search(image);
        let result = client.gallery(&request).await;
        self.apply(ticket, result)
    }

    /// Next page to request, if the backend says one exists in that direction.
    pub fn page_change(&self, page: u32) -> Option<u32> {
        let pagination = self.pagination.as_ref()?;
        if self.search_mode || page < 1 || page > pagination.total_pages {
            return None;
        }
        if page < self.current_page && !pagination.has_prev {
            return None;
        }
        if page > self.current_page && !pagination.has_next {
            return None;
        }
        Some(page)
    }

    pub fn all_images(&self) -> &[GalleryImage] {
        &self.images
    }

    /// Images after client-side filters. Search results are never filtered.
    pub fn visible_images(&self) -> Vec<&GalleryImage> {
        if self.search_mode || !self.filters.is_active() {
            return self.images.iter().collect();
        }

        let query = self.filters.query.to_lowercase();
        let from = self.filters.date_from.map(start_of_day);
        let to = self.filters.date_to.map(start_of_day);

        self.images
            .iter()
            .filter(|image| {
                query.is_empty() || image.payload.description.to_lowercase().contains(&query)
            })
            .filter(|image| {
                if from.is_none() && to.is_none() {
                    return true;
                }
                match parse_timestamp(&image.payload.created_at) {
                    Some(created) => {
                        from.map_or(true, |from| created >= from)
                            && to.map_or(true, |to| created <= to)
                    }
                    None => false,
                }
            })
            .collect()
    }

    pub fn toggle_selection(&mut self, image_id: &str) {
        if let Some(pos) = self.selected.iter().position(|id| id == image_id) {
            self.selected.remove(pos);
        } else {
            self.selected.push(image_id.to_string());
        }
    }

    /// Page numbers for the pager, at most five around the current page.
    pub fn page_window(&self) -> Vec<u32> {
        match &self.pagination {
            Some(pagination) => page_window(self.current_page, pagination.total_pages),
            None => Vec::new(),
        }
    }

    pub fn shows_pager(&self) -> bool {
        !self.search_mode
            && self
                .pagination
                .as_ref()
                .map_or(false, |pagination| pagination.total_pages > 1)
    }
}

pub fn page_window(current: u32, total_pages: u32) -> Vec<u32> {
    let count = PAGE_WINDOW.min(total_pages);
    let first = (total_pages.saturating_sub(PAGE_WINDOW - 1) as i64)
        .min(current as i64 - 2)
        .max(1) as u32;
    (first..first + count)
        .filter(|page| *page <= total_pages)
        .collect()
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_hms_opt(0, 0, 0)
        .map(|naive| naive.and_utc())
        .unwrap_or_default()
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .map(start_of_day)
}
