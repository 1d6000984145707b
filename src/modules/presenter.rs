use std::borrow::Cow;
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use base64::Engine;
use tokio::sync::RwLock;

use crate::error::AppResult;
use crate::models::GeneratedImage;

#[derive(Default)]
struct PresenterState {
    image: Option<GeneratedImage>,
    /// The single user-visible error slot
    message: Option<String>,
    /// Passive notice, e.g. a usage write that did not go through
    notice: Option<String>,
    last_export_ms: i64,
}

/// Holds what the user currently sees: the latest image and messages
#[derive(Default)]
pub struct ResultPresenter {
    state: RwLock<PresenterState>,
}

impl ResultPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the held image and clear any error
    pub async fn show(&self, image: GeneratedImage) {
        let mut state = self.state.write().await;
        state.image = Some(image);
        state.message = None;
    }

    /// A failed attempt drops the image it superseded
    pub async fn fail(&self, message: impl Into<String>) {
        let mut state = self.state.write().await;
        state.image = None;
        state.message = Some(message.into());
    }

    /// Report an error without touching the image
    pub async fn report(&self, message: impl Into<String>) {
        self.state.write().await.message = Some(message.into());
    }

    pub async fn notice(&self, message: impl Into<String>) {
        self.state.write().await.notice = Some(message.into());
    }

    pub async fn clear_messages(&self) {
        let mut state = self.state.write().await;
        state.message = None;
        state.notice = None;
    }

    pub async fn has_image(&self) -> bool {
        self.state.read().await.image.is_some()
    }

    pub async fn message(&self) -> Option<String> {
        self.state.read().await.message.clone()
    }

    pub async fn notice_text(&self) -> Option<String> {
        self.state.read().await.notice.clone()
    }

    /// `data:` URL of the held image, for display surfaces
    pub async fn data_url(&self) -> Option<String> {
        self.state.read().await.image.as_ref().map(|img| {
            format!(
                "data:{};base64,{}",
                img.mime_type,
                base64::engine::general_purpose::STANDARD.encode(&img.data)
            )
        })
    }

    /// Write the held image to `dir` as `generated-<millis>.png`. The stamp
    /// is strictly increasing per presenter and skips existing files, so
    /// repeated exports never overwrite each other. `None` without an image.
    pub async fn export(&self, dir: &Path) -> AppResult<Option<PathBuf>> {
        let mut state = self.state.write().await;
        let Some(image) = state.image.as_ref() else {
            return Ok(None);
        };

        let png = encode_png(image)?;
        fs::create_dir_all(dir)?;

        let mut stamp = chrono::Utc::now()
            .timestamp_millis()
            .max(state.last_export_ms + 1);
        let path = loop {
            let candidate = dir.join(export_file_name(stamp));
            if !candidate.exists() {
                break candidate;
            }
            stamp += 1;
        };

        fs::write(&path, png.as_ref())?;
        state.last_export_ms = stamp;
        tracing::info!("Exported image to {}", path.display());
        Ok(Some(path))
    }
}

pub fn export_file_name(stamp_ms: i64) -> String {
    format!("generated-{}.png", stamp_ms)
}

fn encode_png(image: &GeneratedImage) -> AppResult<Cow<'_, [u8]>> {
    if image.is_png() {
        return Ok(Cow::Borrowed(&image.data));
    }
    let decoded = image::load_from_memory(&image.data)?;
    let mut buf = Cursor::new(Vec::new());
    decoded.write_to(&mut buf, image::ImageFormat::Png)?;
    Ok(Cow::Owned(buf.into_inner()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_image() -> GeneratedImage {
        GeneratedImage {
            mime_type: "image/png".to_string(),
            data: b"\x89PNG\r\n\x1a\nfake".to_vec(),
        }
    }

    #[tokio::test]
    async fn test_export_without_image_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let presenter = ResultPresenter::new();
        assert!(presenter.export(dir.path()).await.unwrap().is_none());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_repeated_exports_get_distinct_names() {
        let dir = tempfile::tempdir().unwrap();
        let presenter = ResultPresenter::new();
        presenter.show(png_image()).await;

        let first = presenter.export(dir.path()).await.unwrap().unwrap();
        let second = presenter.export(dir.path()).await.unwrap().unwrap();
        assert_ne!(first, second);
        assert_eq!(fs::read(&first).unwrap(), png_image().data);
        assert_eq!(fs::read(&second).unwrap(), png_image().data);

        let name = first.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("generated-") && name.ends_with(".png"));
    }

    #[tokio::test]
    async fn test_existing_file_is_not_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let presenter = ResultPresenter::new();
        presenter.show(png_image()).await;

        // Occupy a window of upcoming names
        let now = chrono::Utc::now().timestamp_millis();
        for stamp in now..now + 50 {
            fs::write(dir.path().join(export_file_name(stamp)), b"taken").unwrap();
        }

        let path = presenter.export(dir.path()).await.unwrap().unwrap();
        assert_eq!(fs::read(path).unwrap(), png_image().data);
    }

    #[tokio::test]
    async fn test_non_png_is_reencoded() {
        let mut jpeg = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(image::RgbImage::new(4, 4))
            .write_to(&mut jpeg, image::ImageFormat::Jpeg)
            .unwrap();

        let presenter = ResultPresenter::new();
        presenter
            .show(GeneratedImage {
                mime_type: "image/jpeg".to_string(),
                data: jpeg.into_inner(),
            })
            .await;

        let dir = tempfile::tempdir().unwrap();
        let path = presenter.export(dir.path()).await.unwrap().unwrap();
        let written = fs::read(path).unwrap();
        assert_eq!(
            image::guess_format(&written).unwrap(),
            image::ImageFormat::Png
        );
    }

    #[tokio::test]
    async fn test_messages_and_image() {
        let presenter = ResultPresenter::new();
        presenter.show(png_image()).await;
        presenter.report("quota reached").await;
        assert!(presenter.has_image().await);
        assert_eq!(presenter.message().await.as_deref(), Some("quota reached"));

        presenter.fail("no image").await;
        assert!(!presenter.has_image().await);

        presenter.show(png_image()).await;
        assert!(presenter.message().await.is_none());
        assert!(presenter
            .data_url()
            .await
            .unwrap()
            .starts_with("data:image/png;base64,"));
    }
}
