// src/ocr.rs

use crate::error::ReceiptError;
use crate::render::RenderedPage;
use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

/// Columnar OCR output, one entry per recognised token.
///
/// Entries may have empty text (Tesseract emits block/line rows too);
/// `layout_words` drops those.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OcrData {
    pub text: Vec<String>,
    pub left: Vec<u32>,
    pub top: Vec<u32>,
    pub width: Vec<u32>,
    pub height: Vec<u32>,
}

/// A recognised word with its box on the 0..=1000 scale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordBox {
    pub word: String,
    pub bbox: [u32; 4],
}

#[async_trait]
pub trait OcrEngine: Send + Sync {
    async fn recognize(&self, page: &RenderedPage) -> Result<OcrData, ReceiptError>;
}

/// Tesseract via its command-line TSV output.
pub struct TesseractEngine {
    language: String,
    extra_args: Vec<String>,
}

impl TesseractEngine {
    pub fn new(language: impl Into<String>, extra_args: Vec<String>) -> Self {
        Self {
            language: language.into(),
            extra_args,
        }
    }
}

#[async_trait]
impl OcrEngine for TesseractEngine {
    async fn recognize(&self, page: &RenderedPage) -> Result<OcrData, ReceiptError> {
        let output = Command::new("tesseract")
            .arg(&page.image)
            .arg("stdout")
            .args(["-l", &self.language])
            .args(&self.extra_args)
            .arg("tsv")
            .output()
            .await;

        let output = match output {
            Ok(o) if o.status.success() => o,
            Ok(o) => {
                let stderr = String::from_utf8_lossy(&o.stderr);
                return Err(ReceiptError::Ocr(format!("tesseract failed: {stderr}")));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ReceiptError::Ocr(
                    "tesseract not found (install tesseract-ocr)".to_string(),
                ));
            }
            Err(e) => return Err(ReceiptError::Io(e)),
        };

        let data = parse_tsv(&String::from_utf8_lossy(&output.stdout))?;
        info!(tokens = data.text.len(), "OCR complete");
        Ok(data)
    }
}

/// Parse `tesseract ... tsv` output.
///
/// Columns: level page_num block_num par_num line_num word_num
/// left top width height conf text
pub fn parse_tsv(tsv: &str) -> Result<OcrData, ReceiptError> {
    let mut data = OcrData::default();

    for (lineno, line) in tsv.lines().enumerate() {
        if line.trim().is_empty() || line.starts_with("level") {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 11 {
            return Err(ReceiptError::Ocr(format!(
                "line {}: expected at least 11 columns, got {}",
                lineno + 1,
                fields.len()
            )));
        }

        let num = |i: usize| -> Result<u32, ReceiptError> {
            fields[i].trim().parse::<u32>().map_err(|e| {
                ReceiptError::Ocr(format!("line {}: column {i}: {e}", lineno + 1))
            })
        };

        data.left.push(num(6)?);
        data.top.push(num(7)?);
        data.width.push(num(8)?);
        data.height.push(num(9)?);
        data.text.push(fields.get(11).copied().unwrap_or("").to_string());
    }

    Ok(data)
}

/// Scale one pixel box to 0..=1000 relative to the image size.
pub fn normalize_box(bbox: [u32; 4], width: u32, height: u32) -> [u32; 4] {
    let scale = |coord: u32, dim: u32| -> u32 {
        let v = (1000.0 * f64::from(coord) / f64::from(dim)).round();
        v.clamp(0.0, 1000.0) as u32
    };
    [
        scale(bbox[0], width),
        scale(bbox[1], height),
        scale(bbox[2], width),
        scale(bbox[3], height),
    ]
}

/// Drop blank tokens, build `[left, top, right, bottom]` boxes and
/// normalise them.
pub fn layout_words(
    data: &OcrData,
    width: u32,
    height: u32,
) -> Result<Vec<WordBox>, ReceiptError> {
    if width == 0 || height == 0 {
        return Err(ReceiptError::Conversion("page image has no area".to_string()));
    }

    let keep = |idx: &usize| data.text.get(*idx).is_some_and(|w| !w.trim().is_empty());

    let words: Vec<&String> = data.text.iter().filter(|w| !w.trim().is_empty()).collect();
    let left = filtered(&data.left, keep);
    let top = filtered(&data.top, keep);
    let w = filtered(&data.width, keep);
    let h = filtered(&data.height, keep);

    let boxes: Vec<[u32; 4]> = left
        .iter()
        .zip(&top)
        .zip(&w)
        .zip(&h)
        .map(|(((x, y), w), h)| {
            normalize_box([*x, *y, x.saturating_add(*w), y.saturating_add(*h)], width, height)
        })
        .collect();

    if words.len() != boxes.len() {
        return Err(ReceiptError::OcrMismatch {
            words: words.len(),
            boxes: boxes.len(),
        });
    }

    debug!(words = words.len(), dropped = data.text.len() - words.len(), "Layout built");

    Ok(words
        .into_iter()
        .zip(boxes)
        .map(|(word, bbox)| WordBox {
            word: word.clone(),
            bbox,
        })
        .collect())
}

fn filtered(column: &[u32], keep: impl Fn(&usize) -> bool) -> Vec<u32> {
    column
        .iter()
        .enumerate()
        .filter(|(idx, _)| keep(idx))
        .map(|(_, v)| *v)
        .collect()
}

/// OCR text as a single line, the classifier's text input.
pub fn joined_text(words: &[WordBox]) -> String {
    words
        .iter()
        .map(|wb| wb.word.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}
