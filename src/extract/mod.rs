// src/extract/mod.rs

mod answers;

pub use answers::{format_sheet_date, parse_amount, parse_date};

use crate::error::ReceiptError;
use crate::inference::{InferenceClient, encode_image};
use crate::ocr::WordBox;
use crate::render::RenderedPage;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::path::PathBuf;
use time::Date;

pub const TOTAL_QUESTION: &str = "What is the total amount?";
pub const DATE_QUESTION: &str = "What is the date?";

/// Everything we keep about one receipt until it is written out.
#[derive(Debug, Clone, PartialEq)]
pub struct ReceiptRecord {
    pub source_path: PathBuf,
    pub date: Date,
    pub total_amount: f64,
    pub category: String,
}

impl ReceiptRecord {
    /// The three cells written to columns A..C.
    pub fn cells(&self) -> Vec<Value> {
        vec![
            json!(format_sheet_date(self.date)),
            json!(self.total_amount),
            json!(self.category),
        ]
    }
}

/// One ranked answer from the document-QA model.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct QaAnswer {
    pub answer: String,
    #[serde(default)]
    pub score: f64,
}

#[async_trait]
pub trait DocumentQa: Send + Sync {
    async fn ask(
        &self,
        page: &RenderedPage,
        question: &str,
        word_boxes: Option<&[WordBox]>,
    ) -> Result<Vec<QaAnswer>, ReceiptError>;
}

/// Highest-scoring answer text.
pub fn top_answer(answers: &[QaAnswer]) -> Result<&str, ReceiptError> {
    answers
        .iter()
        .max_by(|a, b| a.score.total_cmp(&b.score))
        .map(|a| a.answer.as_str())
        .ok_or_else(|| ReceiptError::AnswerParse("model returned no answer".to_string()))
}

#[derive(Serialize)]
struct QaRequest<'a> {
    inputs: QaInputs<'a>,
    parameters: QaParameters,
}

#[derive(Serialize)]
struct QaInputs<'a> {
    image: String,
    question: &'a str,
}

#[derive(Serialize)]
struct QaParameters {
    top_k: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    word_boxes: Option<Vec<(String, [u32; 4])>>,
}

/// Document QA served by a LayoutLM-style model behind an inference endpoint.
pub struct HostedDocumentQa {
    client: InferenceClient,
    model: String,
}

impl HostedDocumentQa {
    pub fn new(client: InferenceClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }
}

#[async_trait]
impl DocumentQa for HostedDocumentQa {
    async fn ask(
        &self,
        page: &RenderedPage,
        question: &str,
        word_boxes: Option<&[WordBox]>,
    ) -> Result<Vec<QaAnswer>, ReceiptError> {
        let request = QaRequest {
            inputs: QaInputs {
                image: encode_image(&page.image).await?,
                question,
            },
            parameters: QaParameters {
                top_k: 1,
                word_boxes: word_boxes.map(|wb| {
                    wb.iter().map(|w| (w.word.clone(), w.bbox)).collect()
                }),
            },
        };

        self.client
            .post(&self.model, &request)
            .await
            .map_err(ReceiptError::Inference)
    }
}
