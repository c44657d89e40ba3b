use super::gallery::GalleryPage;
use super::segmentation::{download_name, SegmentationPage};
use super::similarity::SimilarityPage;
use super::LoadState;
use crate::models::GalleryImage;
use std::fmt::Write;

/// `0.87` → `"87%"`, rounding half up.
pub fn percent(value: f64) -> String {
    format!("{}%", (value * 100.0).round() as i64)
}

/// Badge text for a gallery tile; absent when the image has no score.
pub fn score_badge(image: &GalleryImage) -> Option<String> {
    image.score.map(percent)
}

fn status_line(out: &mut String, state: &LoadState) {
    match state {
        LoadState::Idle => {}
        LoadState::Loading => out.push_str("Loading...\n"),
        LoadState::Success => {}
        LoadState::Error(message) => {
            let _ = writeln!(out, "Error: {}", message);
        }
    }
}

fn image_line(out: &mut String, image: &GalleryImage) {
    let badge = score_badge(image)
        .map(|badge| format!("[{}] ", badge))
        .unwrap_or_default();
    let _ = writeln!(
        out,
        "  {}{}  {}  {}",
        badge, image.id, image.payload.description, image.payload.url
    );
}

pub fn render_gallery(page: &GalleryPage) -> String {
    let mut out = String::new();
    status_line(&mut out, &page.state);

    let visible = page.visible_images();
    if page.is_search_mode() {
        let _ = writeln!(out, "Similar images: {} found", visible.len());
        if let Some(info) = page.search_info() {
            let _ = writeln!(
                out,
                "Model {} (embedding size {}), limit {}, threshold {}",
                info.model_used,
                info.query_embedding_size,
                info.search_params.limit,
                info.search_params
                    .score_threshold
                    .map(percent)
                    .unwrap_or_else(|| "none".to_string())
            );
        }
    } else if visible.len() != page.all_images().len() {
        let _ = writeln!(
            out,
            "{} images found ({} on this page before filters)",
            visible.len(),
            page.all_images().len()
        );
    } else {
        let _ = writeln!(out, "{} images found", visible.len());
    }

    for image in &visible {
        image_line(&mut out, image);
    }
    if visible.is_empty() && page.state == LoadState::Success {
        out.push_str("  No images found\n");
    }

    if let Some(pagination) = page.pagination() {
        let _ = writeln!(
            out,
            "Page {} of {} ({} total, {} per page)",
            pagination.page, pagination.total_pages, pagination.total_items, pagination.page_size
        );
    }
    if page.shows_pager() {
        let pages: Vec<String> = page
            .page_window()
            .into_iter()
            .map(|n| {
                if n == page.current_page() {
                    format!("[{}]", n)
                } else {
                    n.to_string()
                }
            })
            .collect();
        let _ = writeln!(out, "Pages: {}", pages.join(" "));
        let current = page.current_page();
        if let Some(prev) = page.page_change(current.saturating_sub(1)) {
            let _ = writeln!(out, "Previous: --page {}", prev);
        }
        if let Some(next) = page.page_change(current + 1) {
            let _ = writeln!(out, "Next: --page {}", next);
        }
    }
    if !page.selected().is_empty() {
        let _ = writeln!(out, "Selected: {}", page.selected().join(", "));
    }
    out
}

pub fn render_similarity(page: &SimilarityPage) -> String {
    let mut out = String::new();
    status_line(&mut out, &page.state);
    let _ = writeln!(
        out,
        "Model {}, limit {}, threshold {}",
        page.model.as_str(),
        page.limit,
        percent(page.score_threshold)
    );
    if let Some(response) = page.response() {
        let _ = writeln!(
            out,
            "{} similar images (model {}, embedding size {})",
            page.results().len(),
            response.model_used,
            response.query_embedding_size
        );
    }
    for image in page.results() {
        image_line(&mut out, image);
    }
    out
}

pub fn render_segmentation(page: &SegmentationPage) -> String {
    let mut out = String::new();
    status_line(&mut out, &page.state);
    let _ = writeln!(
        out,
        "Found {} objects above {} confidence",
        page.objects().len(),
        percent(page.confidence_threshold)
    );
    if let Some(summary) = page.summary() {
        let _ = writeln!(
            out,
            "Average confidence {}, best {}",
            percent(summary.average_confidence),
            percent(summary.max_confidence)
        );
    }
    for object in page.objects() {
        let [x, y, w, h] = object.bbox;
        let _ = writeln!(
            out,
            "  #{} {} {} at ({}, {}) {}x{}",
            object.id,
            object.description,
            percent(object.confidence),
            x,
            y,
            w,
            h
        );
    }
    if let Some(object) = page.selected() {
        let _ = writeln!(
            out,
            "Selected #{} {} ({} confidence), saves as {}",
            object.id,
            object.description,
            percent(object.confidence),
            download_name(object)
        );
    }
    out
}
