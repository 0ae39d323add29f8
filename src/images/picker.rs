// src/images/picker.rs
use async_trait::async_trait;
use image::{DynamicImage, GenericImageView};
use scraper::{Html, Selector};
use url::Url;

use crate::error::FetchError;

/// Picks a representative image for a page. `Ok(None)` means nothing usable.
#[async_trait]
pub trait ImagePicker: Send + Sync {
    async fn pick(&self, page_url: &str) -> Result<Option<DynamicImage>, FetchError>;
}

pub const DEFAULT_MAX_CANDIDATES: usize = 6;
pub const DEFAULT_MIN_DIMENSION: u32 = 100;

/// Selectors tried in priority order, with the attribute holding the URL.
const CANDIDATE_SOURCES: &[(&str, &str)] = &[
    (r#"meta[property="og:image"]"#, "content"),
    (r#"meta[property="og:image:url"]"#, "content"),
    (r#"meta[name="twitter:image"]"#, "content"),
    (r#"meta[name="twitter:image:src"]"#, "content"),
    (r#"link[rel="image_src"]"#, "href"),
    ("img[src]", "src"),
];

/// Scrapes the linked page for image candidates and keeps the largest one
/// that decodes and clears `min_dimension` on both sides.
#[derive(Clone)]
pub struct HtmlImagePicker {
    client: reqwest::Client,
    max_candidates: usize,
    min_dimension: u32,
}

impl HtmlImagePicker {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            max_candidates: DEFAULT_MAX_CANDIDATES,
            min_dimension: DEFAULT_MIN_DIMENSION,
        }
    }

    pub fn with_max_candidates(mut self, n: usize) -> Self {
        self.max_candidates = n.max(1);
        self
    }

    pub fn with_min_dimension(mut self, px: u32) -> Self {
        self.min_dimension = px;
        self
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response, FetchError> {
        self.client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| FetchError::transport(url, e))
    }

    async fn download(&self, url: &Url) -> Option<DynamicImage> {
        let bytes = match self.get(url.as_str()).await {
            Ok(resp) => resp.bytes().await.ok()?,
            Err(e) => {
                tracing::debug!(url = %url, error = %e, "image candidate download failed");
                return None;
            }
        };
        decode(url, bytes).await
    }

    fn usable(&self, img: &DynamicImage) -> bool {
        let (w, h) = img.dimensions();
        w >= self.min_dimension && h >= self.min_dimension
    }
}

#[async_trait]
impl ImagePicker for HtmlImagePicker {
    async fn pick(&self, page_url: &str) -> Result<Option<DynamicImage>, FetchError> {
        let base = Url::parse(page_url).map_err(|e| FetchError::transport(page_url, e))?;
        let resp = self.get(page_url).await?;

        let is_image = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("image/"));
        if is_image {
            // The link points straight at an image.
            let bytes = resp
                .bytes()
                .await
                .map_err(|e| FetchError::transport(page_url, e))?;
            return Ok(decode(&base, bytes).await.filter(|img| self.usable(img)));
        }

        let html = resp
            .text()
            .await
            .map_err(|e| FetchError::transport(page_url, e))?;
        let candidates = image_candidates(&html, &base);
        tracing::debug!(page = page_url, candidates = candidates.len(), "image candidates");

        let mut best: Option<DynamicImage> = None;
        for url in candidates.into_iter().take(self.max_candidates) {
            let Some(img) = self.download(&url).await else {
                continue;
            };
            if !self.usable(&img) {
                continue;
            }
            let area = |i: &DynamicImage| u64::from(i.width()) * u64::from(i.height());
            if best.as_ref().map_or(true, |b| area(&img) > area(b)) {
                best = Some(img);
            }
        }
        Ok(best)
    }
}

/// Decode on the blocking pool; undecodable bytes are logged and skipped.
async fn decode<B>(url: &Url, bytes: B) -> Option<DynamicImage>
where
    B: AsRef<[u8]> + Send + 'static,
{
    let decoded = tokio::task::spawn_blocking(move || image::load_from_memory(bytes.as_ref()))
        .await
        .ok()?;
    match decoded {
        Ok(img) => Some(img),
        Err(e) => {
            tracing::debug!(url = %url, error = %e, "image did not decode");
            None
        }
    }
}

/// Absolute, de-duplicated image URLs found in `html`, best guesses first.
pub fn image_candidates(html: &str, base: &Url) -> Vec<Url> {
    let document = Html::parse_document(html);
    let mut out: Vec<Url> = Vec::new();
    for (selector, attr) in CANDIDATE_SOURCES {
        let Ok(sel) = Selector::parse(selector) else {
            continue;
        };
        for el in document.select(&sel) {
            let Some(raw) = el.value().attr(attr) else {
                continue;
            };
            let raw = raw.trim();
            if raw.is_empty() || raw.starts_with("data:") {
                continue;
            }
            let Ok(url) = base.join(raw) else {
                continue;
            };
            if !matches!(url.scheme(), "http" | "https") || out.contains(&url) {
                continue;
            }
            out.push(url);
        }
    }
    out
}
