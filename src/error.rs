use thiserror::Error;

/// Everything that can abort a receipt run.
#[derive(Debug, Error)]
pub enum ReceiptError {
    #[error("PDF conversion failed: {0}")]
    Conversion(String),

    #[error("OCR failed: {0}")]
    Ocr(String),

    #[error("Not as many words as there are bounding boxes ({words} words, {boxes} boxes)")]
    OcrMismatch { words: usize, boxes: usize },

    #[error("Model inference failed: {0}")]
    Inference(String),

    #[error("Could not parse model answer: {0}")]
    AnswerParse(String),

    #[error("Classification failed: {0}")]
    Classification(String),

    #[error("Spreadsheet error: {0}")]
    Spreadsheet(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
