use crate::config::{AuthMode, SheetsConfig};
use crate::error::ReceiptError;
use async_trait::async_trait;
use google_sheets4::Sheets;
use google_sheets4::api::{BatchUpdateValuesRequest, Scope, ValueRange};
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::connect::HttpConnector;
use serde_json::Value;
use tracing::info;
use yup_oauth2::{InstalledFlowAuthenticator, InstalledFlowReturnMethod, ServiceAccountAuthenticator};

pub type SheetsHub = Sheets<HttpsConnector<HttpConnector>>;

/// Three cells destined for `A{row}:C{row}`.
#[derive(Debug, Clone, PartialEq)]
pub struct RowUpdate {
    pub row: u32,
    pub values: Vec<Value>,
}

#[async_trait]
pub trait Spreadsheet: Send + Sync {
    /// Column A of the target worksheet, up to its last non-empty cell.
    async fn column_a(&self) -> Result<Vec<String>, ReceiptError>;

    /// Write every row in one request.
    async fn update_rows(&self, rows: Vec<RowUpdate>) -> Result<(), ReceiptError>;
}

/// The row right after the last populated cell of column A.
pub fn first_empty_row(column_a: &[String]) -> u32 {
    column_a.len() as u32 + 1
}

/// Qualify an A1 range with the worksheet title, if one is configured.
pub fn a1_range(worksheet: Option<&str>, range: &str) -> String {
    match worksheet {
        Some(title) => format!("'{}'!{}", title.replace('\'', "''"), range),
        None => range.to_string(),
    }
}

pub fn row_range(worksheet: Option<&str>, row: u32) -> String {
    a1_range(worksheet, &format!("A{row}:C{row}"))
}

pub async fn create_hub(cfg: &SheetsConfig) -> Result<SheetsHub, Box<dyn std::error::Error>> {
    let client = hyper_util::client::legacy::Client::builder(hyper_util::rt::TokioExecutor::new())
        .build(
            hyper_rustls::HttpsConnectorBuilder::new()
                .with_webpki_roots()
                .https_or_http()
                .enable_http1()
                .build(),
        );

    match cfg.auth {
        AuthMode::ServiceAccount => {
            info!(credentials = %cfg.credentials.display(), "Service account auth");
            let key = yup_oauth2::read_service_account_key(&cfg.credentials).await?;
            let auth = ServiceAccountAuthenticator::builder(key).build().await?;
            Ok(Sheets::new(client, auth))
        }
        AuthMode::Installed => {
            info!(
                credentials = %cfg.credentials.display(),
                token_cache = %cfg.token_cache.display(),
                "Installed-app auth"
            );
            let secret = yup_oauth2::read_application_secret(&cfg.credentials).await?;
            let auth =
                InstalledFlowAuthenticator::builder(secret, InstalledFlowReturnMethod::HTTPRedirect)
                    .persist_tokens_to_disk(&cfg.token_cache)
                    .build()
                    .await?;
            Ok(Sheets::new(client, auth))
        }
    }
}

/// One worksheet of a Google spreadsheet.
pub struct GoogleSheet {
    hub: SheetsHub,
    spreadsheet_id: String,
    worksheet: Option<String>,
    value_input_option: String,
}

impl GoogleSheet {
    pub fn new(hub: SheetsHub, spreadsheet_id: String, cfg: &SheetsConfig) -> Self {
        Self {
            hub,
            spreadsheet_id,
            worksheet: cfg.worksheet.clone(),
            value_input_option: cfg.value_input_option.clone(),
        }
    }
}

#[async_trait]
impl Spreadsheet for GoogleSheet {
    async fn column_a(&self) -> Result<Vec<String>, ReceiptError> {
        let range = a1_range(self.worksheet.as_deref(), "A:A");
        info!(sheet = %self.spreadsheet_id, range = %range, "Reading column");

        let (_, values) = self
            .hub
            .spreadsheets()
            .values_get(&self.spreadsheet_id, &range)
            .major_dimension("COLUMNS")
            .add_scope(Scope::Spreadsheet)
            .doit()
            .await
            .map_err(|e| ReceiptError::Spreadsheet(e.to_string()))?;

        Ok(column_values(values))
    }

    async fn update_rows(&self, rows: Vec<RowUpdate>) -> Result<(), ReceiptError> {
        if rows.is_empty() {
            return Ok(());
        }
        let count = rows.len();
        let request = batch_request(self.worksheet.as_deref(), &self.value_input_option, rows);

        let (_, response) = self
            .hub
            .spreadsheets()
            .values_batch_update(request, &self.spreadsheet_id)
            .add_scope(Scope::Spreadsheet)
            .doit()
            .await
            .map_err(|e| ReceiptError::Spreadsheet(e.to_string()))?;

        info!(
            rows = count,
            updated_cells = ?response.total_updated_cells,
            "Batch update complete"
        );
        Ok(())
    }
}

fn column_values(values: ValueRange) -> Vec<String> {
    values
        .values
        .unwrap_or_default()
        .into_iter()
        .next()
        .unwrap_or_default()
        .into_iter()
        .map(|v| match v {
            Value::String(s) => s,
            other => other.to_string(),
        })
        .collect()
}

fn batch_request(
    worksheet: Option<&str>,
    value_input_option: &str,
    rows: Vec<RowUpdate>,
) -> BatchUpdateValuesRequest {
    let data = rows
        .into_iter()
        .map(|r| ValueRange {
            range: Some(row_range(worksheet, r.row)),
            major_dimension: Some("ROWS".to_string()),
            values: Some(vec![r.values]),
        })
        .collect();

    BatchUpdateValuesRequest {
        data: Some(data),
        value_input_option: Some(value_input_option.to_string()),
        ..Default::default()
    }
}
