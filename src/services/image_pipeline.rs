use std::io::Cursor;
use std::time::Duration;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, Rgb, RgbImage};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::Client;

use crate::error::Result;
use crate::services::object_storage::ObjectStorage;

const USER_AGENT_STRING: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0";

const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(10);
const PIPELINE_TIMEOUT: Duration = Duration::from_secs(5);
const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;
const MAX_WIDTH: u32 = 1920;
const MAX_HEIGHT: u32 = 1080;
const JPEG_QUALITY: u8 = 85;

/// Downloads, re-encodes and relocates article images. Best-effort by
/// contract: `process` always returns some usable URL and never blocks
/// article collection on image trouble.
pub struct ImagePipeline {
    client: Client,
    storage: Option<ObjectStorage>,
}

impl ImagePipeline {
    pub fn new(storage: Option<ObjectStorage>) -> Self {
        let client = Client::builder()
            .timeout(DOWNLOAD_TIMEOUT)
            .user_agent(USER_AGENT_STRING)
            .build()
            .expect("Failed to create HTTP client");

        Self { client, storage }
    }

    /// Resolve an external image reference into the URL to persist.
    /// `data:` URIs pass through unchanged; anything that is not HTTP(S),
    /// or any failure or timeout further down, returns the original URL.
    pub async fn process(&self, url: &str) -> String {
        if url.starts_with("data:") {
            return url.to_string();
        }

        if !url.starts_with("http://") && !url.starts_with("https://") {
            tracing::debug!("Not an HTTP(S) image reference, keeping as-is: {}", url);
            return url.to_string();
        }

        // Without storage there is nowhere to put the result; skip the
        // network work entirely.
        let Some(storage) = &self.storage else {
            tracing::debug!("Object storage not configured, keeping original URL");
            return url.to_string();
        };

        // Every stage reports failure through Result; this is the single
        // point where failure folds back into the original reference.
        match tokio::time::timeout(PIPELINE_TIMEOUT, self.run(url, storage)).await {
            Ok(Ok(stored_url)) => stored_url,
            Ok(Err(e)) => {
                tracing::debug!("Image pipeline failed for {}: {}", url, e);
                url.to_string()
            }
            Err(_) => {
                tracing::debug!("Image pipeline timed out for {}", url);
                url.to_string()
            }
        }
    }

    async fn run(&self, url: &str, storage: &ObjectStorage) -> Result<String> {
        let bytes = self.download(url).await?;
        self.transform_and_store(url, bytes, storage).await
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("image/avif,image/webp,image/png,image/jpeg,*/*;q=0.8"),
        );

        let response = self.client.get(url).headers(headers).send().await?;

        if !response.status().is_success() {
            return Err(anyhow::anyhow!("image fetch: HTTP {}", response.status()).into());
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        if !content_type.starts_with("image/") {
            return Err(anyhow::anyhow!("not an image content type: {}", content_type).into());
        }

        if let Some(length) = response.content_length() {
            if length as usize > MAX_IMAGE_BYTES {
                return Err(anyhow::anyhow!("image exceeds {} byte cap", MAX_IMAGE_BYTES).into());
            }
        }

        let bytes = response.bytes().await?.to_vec();
        if bytes.is_empty() {
            return Err(anyhow::anyhow!("empty image response").into());
        }
        if bytes.len() > MAX_IMAGE_BYTES {
            return Err(anyhow::anyhow!("image exceeds {} byte cap", MAX_IMAGE_BYTES).into());
        }

        Ok(bytes)
    }

    async fn transform_and_store(
        &self,
        url: &str,
        bytes: Vec<u8>,
        storage: &ObjectStorage,
    ) -> Result<String> {
        // Decode/re-encode is CPU work; keep it off the async threads.
        let jpeg = tokio::task::spawn_blocking(move || transform(&bytes))
            .await
            .map_err(|e| anyhow::anyhow!("transform task failed: {}", e))??;

        let key = ObjectStorage::image_key(url);
        let stored_url = storage.put(&key, jpeg, "image/jpeg").await?;
        tracing::debug!("Stored image {} as {}", url, stored_url);
        Ok(stored_url)
    }
}

/// Fit within 1920x1080 without upscaling, flatten transparency onto a
/// white background and re-encode as JPEG at quality 85.
pub(crate) fn transform(bytes: &[u8]) -> Result<Vec<u8>> {
    let mut img = image::load_from_memory(bytes)?;

    let (width, height) = img.dimensions();
    if width > MAX_WIDTH || height > MAX_HEIGHT {
        img = img.resize(MAX_WIDTH, MAX_HEIGHT, FilterType::Lanczos3);
    }

    let flattened = flatten_onto_white(&img);

    let mut out = Vec::new();
    JpegEncoder::new_with_quality(Cursor::new(&mut out), JPEG_QUALITY).encode_image(&flattened)?;
    Ok(out)
}

fn flatten_onto_white(img: &DynamicImage) -> RgbImage {
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    let mut out = RgbImage::from_pixel(width, height, Rgb([255, 255, 255]));

    for (x, y, pixel) in rgba.enumerate_pixels() {
        let alpha = pixel[3] as u32;
        let target = out.get_pixel_mut(x, y);
        for channel in 0..3 {
            let value = pixel[channel] as u32;
            target[channel] = ((value * alpha + 255 * (255 - alpha)) / 255) as u8;
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(width, height, image::Rgba([10, 20, 30, 255]));
        let mut bytes = Vec::new();
        DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[tokio::test]
    async fn data_uri_passes_through_unchanged() {
        let pipeline = ImagePipeline::new(None);
        let uri = "data:image/png;base64,iVBORw0KGgo=";
        assert_eq!(pipeline.process(uri).await, uri);
    }

    #[tokio::test]
    async fn non_http_reference_is_kept() {
        let pipeline = ImagePipeline::new(None);
        assert_eq!(pipeline.process("ftp://e.com/a.jpg").await, "ftp://e.com/a.jpg");
    }

    #[tokio::test]
    async fn missing_storage_skips_network_and_keeps_original() {
        let pipeline = ImagePipeline::new(None);
        let url = "https://images.example.com/a.jpg";
        assert_eq!(pipeline.process(url).await, url);
    }

    #[tokio::test]
    async fn unreachable_url_falls_back_to_original() {
        let storage = ObjectStorage::new("test-bucket".to_string(), None).await;
        let pipeline = ImagePipeline::new(Some(storage));
        // Port 9 (discard) refuses connections immediately.
        let url = "http://127.0.0.1:9/a.jpg";
        assert_eq!(pipeline.process(url).await, url);
    }

    #[test]
    fn transform_produces_jpeg() {
        let out = transform(&png_bytes(64, 64)).unwrap();
        // JPEG magic bytes
        assert_eq!(&out[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn transform_fits_within_bounds_without_upscaling() {
        let out = transform(&png_bytes(4000, 500)).unwrap();
        let img = image::load_from_memory(&out).unwrap();
        assert!(img.width() <= 1920 && img.height() <= 1080);

        let small = transform(&png_bytes(100, 100)).unwrap();
        let img = image::load_from_memory(&small).unwrap();
        assert_eq!((img.width(), img.height()), (100, 100));
    }

    #[test]
    fn transparency_is_flattened_to_white() {
        let img = image::RgbaImage::from_pixel(8, 8, image::Rgba([0, 0, 0, 0]));
        let mut bytes = Vec::new();
        DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();

        let out = transform(&bytes).unwrap();
        let decoded = image::load_from_memory(&out).unwrap().to_rgb8();
        let pixel = decoded.get_pixel(4, 4);
        // JPEG is lossy; fully transparent input should still come out near white.
        assert!(pixel[0] > 240 && pixel[1] > 240 && pixel[2] > 240);
    }

    #[test]
    fn garbage_bytes_fail_transform() {
        assert!(transform(b"not an image").is_err());
    }
}
