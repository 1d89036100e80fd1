use crate::error::ReceiptError;
use serde::Deserialize;
use std::{fs, path::Path, path::PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "receipts.toml";
pub const ENV_FILE: &str = "config.env";
pub const SHEET_ID_VAR: &str = "SHEET_ID";

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default = "default_receipts_dir")]
    pub receipts_dir: PathBuf,
    /// Fallback when `SHEET_ID` is not in the environment.
    #[serde(default)]
    pub sheet_id: Option<String>,
    #[serde(default)]
    pub sheets: SheetsConfig,
    #[serde(default)]
    pub ocr: OcrConfig,
    #[serde(default)]
    pub models: ModelsConfig,
}

fn default_receipts_dir() -> PathBuf {
    PathBuf::from(".")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    #[default]
    ServiceAccount,
    Installed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WriteMode {
    #[default]
    Batch,
    PerRow,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SheetsConfig {
    pub credentials: PathBuf,
    pub auth: AuthMode,
    /// Where the installed flow keeps its tokens.
    pub token_cache: PathBuf,
    /// Worksheet title; the first sheet when unset.
    pub worksheet: Option<String>,
    pub value_input_option: String,
    pub write_mode: WriteMode,
}

impl Default for SheetsConfig {
    fn default() -> Self {
        Self {
            credentials: PathBuf::from("credentials.json"),
            auth: AuthMode::ServiceAccount,
            token_cache: PathBuf::from(".config/sheets_tokens.json"),
            worksheet: None,
            value_input_option: "RAW".to_string(),
            write_mode: WriteMode::Batch,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    pub language: String,
    pub extra_args: Vec<String>,
    pub dpi: u32,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            language: "eng".to_string(),
            extra_args: Vec::new(),
            dpi: 200,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ClassifyFrom {
    #[default]
    Text,
    Image,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    pub base_url: String,
    pub qa_model: String,
    pub text_classifier: String,
    pub image_classifier: String,
    pub labels: Vec<String>,
    pub classify_from: ClassifyFrom,
    /// Send OCR words and boxes along with the image to the QA model.
    pub word_boxes: bool,
    pub timeout_secs: u64,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api-inference.huggingface.co".to_string(),
            qa_model: "impira/layoutlm-document-qa".to_string(),
            text_classifier: "facebook/bart-large-mnli".to_string(),
            image_classifier: "openai/clip-vit-large-patch14".to_string(),
            labels: vec!["Grocery".to_string(), "Restaurant".to_string()],
            classify_from: ClassifyFrom::Text,
            word_boxes: true,
            timeout_secs: 120,
        }
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ReceiptError> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Like `load`, but a missing file yields the defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ReceiptError> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Self::parse("")
        }
    }

    pub fn parse(content: &str) -> Result<Self, ReceiptError> {
        let cfg: Config =
            toml::from_str(content).map_err(|e| ReceiptError::Config(e.to_string()))?;
        if cfg.models.labels.is_empty() {
            return Err(ReceiptError::Config("models.labels must not be empty".into()));
        }
        Ok(cfg)
    }

    /// Resolve the target spreadsheet: environment first, then the config file.
    pub fn sheet_id(&self, from_env: Option<String>) -> Result<String, ReceiptError> {
        from_env
            .or_else(|| self.sheet_id.clone())
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| {
                ReceiptError::Config(format!("{SHEET_ID_VAR} is not set (checked env and {ENV_FILE})"))
            })
    }
}
