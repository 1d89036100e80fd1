// src/classify.rs

use crate::error::ReceiptError;
use crate::inference::{InferenceClient, encode_image};
use crate::render::RenderedPage;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// What the classifier looks at.
pub enum ClassifierInput<'a> {
    Text(&'a str),
    Image(&'a RenderedPage),
}

#[async_trait]
pub trait Classifier: Send + Sync {
    /// Pick one of `labels` for the receipt.
    async fn classify(
        &self,
        input: ClassifierInput<'_>,
        labels: &[String],
    ) -> Result<String, ReceiptError>;
}

#[derive(Serialize)]
struct ZeroShotRequest<'a> {
    inputs: String,
    parameters: ZeroShotParameters<'a>,
}

#[derive(Serialize)]
struct ZeroShotParameters<'a> {
    candidate_labels: &'a [String],
}

/// Text pipelines answer with parallel lists, image pipelines with pairs.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ZeroShotResponse {
    Ranked { labels: Vec<String>, scores: Vec<f64> },
    Pairs(Vec<LabelScore>),
}

#[derive(Debug, Deserialize)]
struct LabelScore {
    label: String,
    score: f64,
}

impl ZeroShotResponse {
    fn best(self) -> Option<(String, f64)> {
        let pairs: Vec<(String, f64)> = match self {
            ZeroShotResponse::Ranked { labels, scores } => labels.into_iter().zip(scores).collect(),
            ZeroShotResponse::Pairs(pairs) => pairs.into_iter().map(|p| (p.label, p.score)).collect(),
        };
        pairs.into_iter().max_by(|a, b| a.1.total_cmp(&b.1))
    }
}

/// Zero-shot classification over text (NLI model) or image (CLIP-style model).
pub struct ZeroShotClassifier {
    client: InferenceClient,
    text_model: String,
    image_model: String,
}

impl ZeroShotClassifier {
    pub fn new(
        client: InferenceClient,
        text_model: impl Into<String>,
        image_model: impl Into<String>,
    ) -> Self {
        Self {
            client,
            text_model: text_model.into(),
            image_model: image_model.into(),
        }
    }
}

#[async_trait]
impl Classifier for ZeroShotClassifier {
    async fn classify(
        &self,
        input: ClassifierInput<'_>,
        labels: &[String],
    ) -> Result<String, ReceiptError> {
        let (model, inputs) = match input {
            ClassifierInput::Text(text) => (&self.text_model, text.to_string()),
            ClassifierInput::Image(page) => (&self.image_model, encode_image(&page.image).await?),
        };

        let request = ZeroShotRequest {
            inputs,
            parameters: ZeroShotParameters {
                candidate_labels: labels,
            },
        };

        let response: ZeroShotResponse = self
            .client
            .post(model, &request)
            .await
            .map_err(ReceiptError::Classification)?;

        pick_label(response, labels)
    }
}

fn pick_label(response: ZeroShotResponse, labels: &[String]) -> Result<String, ReceiptError> {
    let (label, score) = response
        .best()
        .ok_or_else(|| ReceiptError::Classification("classifier returned no labels".to_string()))?;

    if !labels.contains(&label) {
        return Err(ReceiptError::Classification(format!(
            "classifier answered {label:?}, not one of {labels:?}"
        )));
    }
    debug!(label = %label, score, "Classified");
    Ok(label)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels() -> Vec<String> {
        vec!["Grocery".to_string(), "Restaurant".to_string()]
    }

    #[test]
    fn test_text_pipeline_response() {
        let r: ZeroShotResponse = serde_json::from_str(
            r#"{"sequence":"Total $42.50","labels":["Restaurant","Grocery"],"scores":[0.81,0.19]}"#,
        )
        .unwrap();
        assert_eq!(pick_label(r, &labels()).unwrap(), "Restaurant");
    }

    #[test]
    fn test_image_pipeline_response() {
        let r: ZeroShotResponse = serde_json::from_str(
            r#"[{"label":"Restaurant","score":0.3},{"label":"Grocery","score":0.7}]"#,
        )
        .unwrap();
        assert_eq!(pick_label(r, &labels()).unwrap(), "Grocery");
    }

    #[test]
    fn test_empty_and_unknown_labels_fail() {
        let empty: ZeroShotResponse = serde_json::from_str("[]").unwrap();
        assert!(matches!(pick_label(empty, &labels()), Err(ReceiptError::Classification(_))));

        let odd: ZeroShotResponse =
            serde_json::from_str(r#"[{"label":"Fuel","score":0.99}]"#).unwrap();
        assert!(matches!(pick_label(odd, &labels()), Err(ReceiptError::Classification(_))));
    }

    #[test]
    fn test_request_shape() {
        let labels = labels();
        let req = ZeroShotRequest {
            inputs: "Total $42.50".to_string(),
            parameters: ZeroShotParameters { candidate_labels: &labels },
        };
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(v["parameters"]["candidate_labels"][1], "Restaurant");
    }
}
