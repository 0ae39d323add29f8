// src/images/worker.rs
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use image::{DynamicImage, ImageFormat};
use metrics::counter;

use crate::error::FetchError;
use crate::images::crop::Cropper;
use crate::images::picker::ImagePicker;
use crate::ingest::types::Item;
use crate::pool::{self, Dispatch};

pub const DEFAULT_CROP_WIDTH: u32 = 460;
pub const DEFAULT_CROP_HEIGHT: u32 = 160;

static TEMP_FILE_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Outcome of one image job. The item always comes back; `image` is only
/// set when `error` is `None` and a file was written.
#[derive(Debug)]
pub struct ImageResult {
    pub item: Item,
    pub error: Option<FetchError>,
}

/// Filename written for an item; the store keeps only this, not the path.
pub fn image_filename(item_id: &str) -> String {
    format!("{item_id}.png")
}

pub struct ImageFetcher {
    picker: Arc<dyn ImagePicker>,
    cropper: Arc<dyn Cropper>,
    image_dir: PathBuf,
    width: u32,
    height: u32,
}

impl ImageFetcher {
    pub fn new(
        picker: Arc<dyn ImagePicker>,
        cropper: Arc<dyn Cropper>,
        image_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            picker,
            cropper,
            image_dir: image_dir.into(),
            width: DEFAULT_CROP_WIDTH,
            height: DEFAULT_CROP_HEIGHT,
        }
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width.max(1);
        self.height = height.max(1);
        self
    }

    pub async fn fetch(&self, worker: usize, mut item: Item) -> ImageResult {
        if !item.image.is_empty() {
            tracing::debug!(worker, item = %item.id, "item already has an image");
            return ImageResult { item, error: None };
        }
        tracing::debug!(worker, item = %item.id, link = %item.link, "image worker processing item");

        let img = match self.picker.pick(&item.link).await {
            Ok(Some(img)) => img,
            Ok(None) => {
                let e = FetchError::ImageNotFound(item.link.clone());
                return failed(item, e);
            }
            Err(e) => return failed(item, e),
        };

        let filename = image_filename(&item.id);
        if let Err(e) = self.render_and_write(img, &filename).await {
            return failed(item, e);
        }

        counter!("fetch_images_written_total").increment(1);
        item.image = filename;
        ImageResult { item, error: None }
    }

    async fn render_and_write(&self, img: DynamicImage, filename: &str) -> Result<(), FetchError> {
        let path = self.image_dir.join(filename);
        if filename.contains("..") || filename.contains('/') || filename.contains('\\') {
            return Err(FetchError::ImageWrite {
                path,
                source: std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "item id is not a safe filename",
                ),
            });
        }

        let cropper = Arc::clone(&self.cropper);
        let (w, h) = (self.width, self.height);
        let png = tokio::task::spawn_blocking(move || encode_png(&cropper.crop(&img, w, h)))
            .await
            .map_err(|e| FetchError::ImageEncode(e.to_string()))??;

        write_atomic(&path, &png).await
    }
}

fn failed(item: Item, error: FetchError) -> ImageResult {
    counter!("fetch_image_errors_total", "kind" => error.kind()).increment(1);
    ImageResult {
        item,
        error: Some(error),
    }
}

fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, FetchError> {
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png)
        .map_err(|e| FetchError::ImageEncode(e.to_string()))?;
    Ok(buf.into_inner())
}

/// Write through a uniquely named temp file and rename, so a crash never
/// leaves a truncated `<id>.png` behind.
async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), FetchError> {
    let n = TEMP_FILE_COUNTER.fetch_add(1, Ordering::Relaxed);
    let tmp = path.with_extension(format!("png.tmp.{}.{n}", std::process::id()));

    if let Err(source) = tokio::fs::write(&tmp, bytes).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(FetchError::ImageWrite { path: tmp, source });
    }
    if let Err(source) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(FetchError::ImageWrite {
            path: path.to_path_buf(),
            source,
        });
    }
    Ok(())
}

/// Fan `items` out over `workers` image workers.
pub fn fetch_images(
    fetcher: Arc<ImageFetcher>,
    items: Vec<Item>,
    workers: usize,
) -> Dispatch<ImageResult> {
    pool::dispatch("images", workers, items, move |worker, item| {
        let fetcher = Arc::clone(&fetcher);
        async move { fetcher.fetch(worker, item).await }
    })
}
