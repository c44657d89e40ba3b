mod backend;
mod backend_clients;
mod config;
mod crop;
mod error;
mod models;
mod pages;
mod validation;
mod web_server;

use crate::backend::Backend;
use crate::backend_clients::http::HttpBackend;
use crate::config::AppConfig;
use crate::models::EmbeddingModel;
use crate::pages::client::ProxyClient;
use crate::pages::gallery::{GalleryPage, DEFAULT_PAGE_SIZE};
use crate::pages::segmentation::{SegmentationPage, DEFAULT_CONFIDENCE_THRESHOLD};
use crate::pages::similarity::SimilarityPage;
use crate::pages::{render, LoadState};
use anyhow::{Context, Result};
use base64::Engine;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use log::info;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "vision-dashboard", version, about = "Dashboard proxy for the image search and segmentation backend")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Args, Debug)]
struct ProxyArgs {
    /// Base URL of a running dashboard (defaults to this host's web_port)
    #[arg(long)]
    proxy_url: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the proxy server
    Serve {
        #[arg(long)]
        port: Option<u16>,
        #[arg(long)]
        backend_url: Option<String>,
    },
    /// List one gallery page
    Gallery {
        #[command(flatten)]
        proxy: ProxyArgs,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
        page_size: u32,
        /// Only show images whose description contains this text
        #[arg(long)]
        query: Option<String>,
        #[arg(long)]
        from: Option<NaiveDate>,
        #[arg(long)]
        to: Option<NaiveDate>,
        /// Mark an image as selected (repeatable)
        #[arg(long = "select", value_name = "ID")]
        select: Vec<String>,
    },
    /// Find images similar to a local file
    Search {
        #[command(flatten)]
        proxy: ProxyArgs,
        image: PathBuf,
        #[arg(long, value_enum, default_value_t = EmbeddingModel::V2)]
        model: EmbeddingModel,
        #[arg(long)]
        limit: Option<u32>,
        #[arg(long)]
        threshold: Option<f64>,
        /// Search through the gallery route instead of the similarity route
        #[arg(long)]
        via_gallery: bool,
    },
    /// Detect objects in a local file and optionally save the crops
    Segment {
        #[command(flatten)]
        proxy: ProxyArgs,
        image: PathBuf,
        #[arg(long, default_value_t = DEFAULT_CONFIDENCE_THRESHOLD)]
        threshold: f64,
        #[arg(long)]
        out: Option<PathBuf>,
        /// Show the details of one detected object
        #[arg(long = "select", value_name = "ID")]
        select: Option<String>,
    },
}

fn proxy_client(config: &AppConfig, proxy: &ProxyArgs) -> Result<ProxyClient> {
    let base = proxy
        .proxy_url
        .clone()
        .unwrap_or_else(|| format!("http://127.0.0.1:{}", config.web_port));
    Ok(ProxyClient::new(&base, config.request_timeout_secs)?)
}

fn read_image(path: &Path) -> Result<(String, Vec<u8>)> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    Ok((file_name, bytes))
}

fn finish(state: &LoadState) -> Result<()> {
    match state {
        LoadState::Error(message) => anyhow::bail!("{}", message),
        _ => Ok(()),
    }
}

async fn serve(mut config: AppConfig, port: Option<u16>, backend_url: Option<String>) -> Result<()> {
    if let Some(port) = port {
        config.web_port = port;
    }
    if let Some(backend_url) = backend_url {
        config.backend_url = backend_url;
    }

    let backend: Arc<dyn Backend> = Arc::new(HttpBackend::new(&config)?);

    // Run the web server in the foreground
    if let Err(e) = web_server::start_web_server(Arc::new(config), backend).await {
        log::error!("Web server error: {}", e);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::new()?;

    // Initialize env_logger based on config.log_level
    env_logger::Builder::new()
        .filter_level(config.log_level.parse().unwrap_or(log::LevelFilter::Info))
        .init();

    info!("Starting vision-dashboard");

    match cli.command.unwrap_or(Command::Serve { port: None, backend_url: None }) {
        Command::Serve { port, backend_url } => serve(config, port, backend_url).await?,
        Command::Gallery { proxy, page, page_size, query, from, to, select } => {
            let client = proxy_client(&config, &proxy)?;
            let mut view = GalleryPage::new();
            view.filters.query = query.unwrap_or_default();
            view.filters.date_from = from;
            view.filters.date_to = to;
            view.load(&client, page, page_size).await;
            for id in &select {
                view.toggle_selection(id);
            }
            print!("{}", render::render_gallery(&view));
            finish(&view.state)?;
        }
        Command::Search { proxy, image, model, limit, threshold, via_gallery } => {
            let client = proxy_client(&config, &proxy)?;
            let (_, bytes) = read_image(&image)?;
            if via_gallery {
                let mut view = GalleryPage::new();
                view.search.model = model;
                if let Some(limit) = limit {
                    view.search.limit = limit;
                }
                if let Some(threshold) = threshold {
                    view.search.score_threshold = threshold;
                }
                let encoded = base64::engine::general_purpose::STANDARD.encode(&bytes);
                view.search_similar(&client, encoded).await;
                print!("{}", render::render_gallery(&view));
                finish(&view.state)?;
            } else {
                let mut view = SimilarityPage::new();
                view.model = model;
                if let Some(limit) = limit {
                    view.limit = limit;
                }
                if let Some(threshold) = threshold {
                    view.score_threshold = threshold;
                }
                if bytes.starts_with(b"data:") {
                    view.set_image_data_url(String::from_utf8_lossy(&bytes).trim().to_string());
                } else {
                    view.set_image_file(bytes);
                }
                view.search(&client).await;
                print!("{}", render::render_similarity(&view));
                finish(&view.state)?;
            }
        }
        Command::Segment { proxy, image, threshold, out, select } => {
            let client = proxy_client(&config, &proxy)?;
            let (file_name, bytes) = read_image(&image)?;
            let mut view = SegmentationPage::new();
            view.confidence_threshold = threshold;
            view.set_image(&file_name, bytes)?;
            view.run(&client).await;
            if let Some(id) = &select {
                view.select(id);
            }
            print!("{}", render::render_segmentation(&view));
            finish(&view.state)?;
            if let Some(dir) = out {
                let written = view.save_crops(&dir)?;
                info!("Saved {} cropped objects to {}", written.len(), dir.display());
            }
        }
    }

    info!("vision-dashboard finished");

    Ok(())
}
