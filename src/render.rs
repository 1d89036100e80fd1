// src/render.rs

use crate::error::ReceiptError;
use async_trait::async_trait;
use lopdf::Document;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tokio::process::Command;
use tracing::info;

/// First page of a receipt, rasterised to PNG.
#[derive(Debug)]
pub struct RenderedPage {
    pub source: PathBuf,
    pub image: PathBuf,
    pub width: u32,
    pub height: u32,
    /// Keeps the rasterised image alive until the page is dropped.
    _scratch: Option<TempDir>,
}

impl RenderedPage {
    pub fn new(source: PathBuf, image: PathBuf, width: u32, height: u32) -> Self {
        Self {
            source,
            image,
            width,
            height,
            _scratch: None,
        }
    }

    fn with_scratch(mut self, dir: TempDir) -> Self {
        self._scratch = Some(dir);
        self
    }
}

#[async_trait]
pub trait PdfRenderer: Send + Sync {
    async fn render(&self, pdf: &Path) -> Result<RenderedPage, ReceiptError>;
}

/// Renders page one with Poppler's `pdftoppm`.
pub struct PdftoppmRenderer {
    dpi: u32,
}

impl PdftoppmRenderer {
    pub fn new(dpi: u32) -> Self {
        Self { dpi }
    }
}

#[async_trait]
impl PdfRenderer for PdftoppmRenderer {
    async fn render(&self, pdf: &Path) -> Result<RenderedPage, ReceiptError> {
        let bytes = tokio::fs::read(pdf).await?;
        let pages = count_pages(&bytes)?;
        info!(pages, "PDF structure ok");

        let scratch = TempDir::new()?;
        let prefix = scratch.path().join("page");
        let dpi = self.dpi.to_string();

        let status = Command::new("pdftoppm")
            .args(["-png", "-r", &dpi, "-f", "1", "-l", "1", "-singlefile"])
            .arg(pdf)
            .arg(&prefix)
            .status()
            .await;

        match status {
            Ok(s) if s.success() => {}
            Ok(s) => {
                return Err(ReceiptError::Conversion(format!(
                    "pdftoppm exited with {s} for {}",
                    pdf.display()
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ReceiptError::Conversion(
                    "pdftoppm not found (install poppler-utils)".to_string(),
                ));
            }
            Err(e) => return Err(ReceiptError::Io(e)),
        }

        // -singlefile writes exactly <prefix>.png
        let image = prefix.with_extension("png");
        let (width, height) = image::image_dimensions(&image)
            .map_err(|e| ReceiptError::Conversion(format!("unreadable page image: {e}")))?;
        if width == 0 || height == 0 {
            return Err(ReceiptError::Conversion("page image has no area".to_string()));
        }

        info!(width, height, "Rendered first page");
        Ok(RenderedPage::new(pdf.to_path_buf(), image, width, height).with_scratch(scratch))
    }
}

/// Structural check before handing the file to the rasteriser.
pub fn count_pages(pdf_bytes: &[u8]) -> Result<usize, ReceiptError> {
    let doc = Document::load_mem(pdf_bytes)
        .map_err(|e| ReceiptError::Conversion(format!("Failed to parse PDF: {e}")))?;
    let pages = doc.get_pages().len();
    if pages == 0 {
        return Err(ReceiptError::Conversion("PDF has no pages".to_string()));
    }
    Ok(pages)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_garbage_bytes() {
        let result = count_pages(b"this is not a pdf");
        assert!(matches!(result, Err(ReceiptError::Conversion(_))));
    }

    #[tokio::test]
    async fn test_render_rejects_non_pdf() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.pdf");
        std::fs::write(&path, b"%PDF-nope").unwrap();

        let err = PdftoppmRenderer::new(72).render(&path).await.unwrap_err();
        assert!(matches!(err, ReceiptError::Conversion(_)));
    }

    #[tokio::test]
    async fn test_render_missing_file_is_io() {
        let err = PdftoppmRenderer::new(72)
            .render(Path::new("/definitely/not/here.pdf"))
            .await
            .unwrap_err();
        assert!(matches!(err, ReceiptError::Io(_)));
    }
}
