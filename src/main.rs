mod classify;
mod config;
mod error;
mod extract;
mod inference;
mod ocr;
mod processor;
mod render;
mod sheets;

use config::Config;
use std::env;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // init tracing
    tracing_subscriber::fmt()
        .with_target(true)
        .with_level(true)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Install crypto provider
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| "Failed to install rustls crypto provider")?;

    // take SHEET_ID and tokens from config.env
    if let Err(e) = dotenvy::from_filename(config::ENV_FILE) {
        info!(error = %e, file = config::ENV_FILE, "No env file loaded");
    }

    let cfg_path =
        env::var("RECEIPTS_CONFIG").unwrap_or_else(|_| config::DEFAULT_CONFIG_PATH.to_string());
    let cfg = Config::load_or_default(&cfg_path)?;
    let sheet_id = cfg.sheet_id(env::var(config::SHEET_ID_VAR).ok())?;

    let hub = sheets::create_hub(&cfg.sheets).await?;
    let client = inference::InferenceClient::new(
        &cfg.models.base_url,
        env::var(inference::TOKEN_VAR).ok(),
        Duration::from_secs(cfg.models.timeout_secs),
    )?;

    let services = processor::Services {
        renderer: Box::new(render::PdftoppmRenderer::new(cfg.ocr.dpi)),
        ocr: Box::new(ocr::TesseractEngine::new(
            cfg.ocr.language.clone(),
            cfg.ocr.extra_args.clone(),
        )),
        qa: Box::new(extract::HostedDocumentQa::new(client.clone(), cfg.models.qa_model.clone())),
        classifier: Box::new(classify::ZeroShotClassifier::new(
            client,
            cfg.models.text_classifier.clone(),
            cfg.models.image_classifier.clone(),
        )),
        sheet: Box::new(sheets::GoogleSheet::new(hub, sheet_id, &cfg.sheets)),
    };

    let processor =
        processor::ReceiptProcessor::new(services, processor::ProcessorOptions::from_config(&cfg));
    let summary = processor.run().await?;

    info!(
        written = summary.written,
        first_row = ?summary.first_row,
        deleted = summary.deleted.len(),
        "Done!"
    );

    Ok(())
}
