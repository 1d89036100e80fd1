// src/processor.rs

use crate::classify::{Classifier, ClassifierInput};
use crate::config::{ClassifyFrom, Config, WriteMode};
use crate::error::ReceiptError;
use crate::extract::{
    DATE_QUESTION, DocumentQa, ReceiptRecord, TOTAL_QUESTION, format_sheet_date, parse_amount,
    parse_date, top_answer,
};
use crate::ocr::{OcrEngine, joined_text, layout_words};
use crate::render::PdfRenderer;
use crate::sheets::{RowUpdate, Spreadsheet, first_empty_row};
use std::path::{Path, PathBuf};
use tracing::{Instrument, info, info_span};

/// The external collaborators a run talks to.
pub struct Services {
    pub renderer: Box<dyn PdfRenderer>,
    pub ocr: Box<dyn OcrEngine>,
    pub qa: Box<dyn DocumentQa>,
    pub classifier: Box<dyn Classifier>,
    pub sheet: Box<dyn Spreadsheet>,
}

#[derive(Debug, Clone)]
pub struct ProcessorOptions {
    pub receipts_dir: PathBuf,
    pub labels: Vec<String>,
    pub classify_from: ClassifyFrom,
    pub word_boxes: bool,
    pub write_mode: WriteMode,
}

impl ProcessorOptions {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            receipts_dir: cfg.receipts_dir.clone(),
            labels: cfg.models.labels.clone(),
            classify_from: cfg.models.classify_from,
            word_boxes: cfg.models.word_boxes,
            write_mode: cfg.sheets.write_mode,
        }
    }
}

/// What a finished run did.
#[derive(Debug, Default, PartialEq)]
pub struct RunSummary {
    pub written: usize,
    pub first_row: Option<u32>,
    pub deleted: Vec<PathBuf>,
}

pub struct ReceiptProcessor {
    services: Services,
    options: ProcessorOptions,
}

impl ReceiptProcessor {
    pub fn new(services: Services, options: ProcessorOptions) -> Self {
        Self { services, options }
    }

    /// Process every PDF in the receipts directory, append the results to
    /// the sheet in date order, then delete the PDFs.
    ///
    /// Any error aborts the run before the cleanup phase.
    pub async fn run(&self) -> Result<RunSummary, ReceiptError> {
        let pdfs = find_pdfs(&self.options.receipts_dir)?;
        info!(
            dir = %self.options.receipts_dir.display(),
            count = pdfs.len(),
            "Receipts found"
        );
        if pdfs.is_empty() {
            return Ok(RunSummary::default());
        }

        let first_row = first_empty_row(&self.services.sheet.column_a().await?);
        info!(row = first_row, "First empty row");

        let mut records = Vec::with_capacity(pdfs.len());
        for pdf in &pdfs {
            let span = info_span!("receipt", file = %pdf.display());
            let record = self.process_file(pdf).instrument(span).await?;
            records.push(record);
        }

        // stable: equal dates keep file order
        records.sort_by_key(|r| r.date);

        self.write_records(&records, first_row).await?;

        let mut deleted = Vec::with_capacity(records.len());
        for record in &records {
            std::fs::remove_file(&record.source_path)?;
            deleted.push(record.source_path.clone());
        }
        info!(deleted = deleted.len(), "Removed processed receipts");

        Ok(RunSummary {
            written: records.len(),
            first_row: Some(first_row),
            deleted,
        })
    }

    /// Render, OCR, query and classify one receipt.
    pub async fn process_file(&self, pdf: &Path) -> Result<ReceiptRecord, ReceiptError> {
        let page = self.services.renderer.render(pdf).await?;
        let data = self.services.ocr.recognize(&page).await?;
        let words = layout_words(&data, page.width, page.height)?;
        info!(words = words.len(), "Layout ready");

        let hints = self.options.word_boxes.then_some(words.as_slice());

        let answers = self.services.qa.ask(&page, TOTAL_QUESTION, hints).await?;
        let total_amount = parse_amount(top_answer(&answers)?)?;

        let answers = self.services.qa.ask(&page, DATE_QUESTION, hints).await?;
        let date = parse_date(top_answer(&answers)?)?;

        let text = joined_text(&words);
        let input = match self.options.classify_from {
            ClassifyFrom::Text => ClassifierInput::Text(&text),
            ClassifyFrom::Image => ClassifierInput::Image(&page),
        };
        let category = self
            .services
            .classifier
            .classify(input, &self.options.labels)
            .await?;

        info!(
            total = total_amount,
            date = %format_sheet_date(date),
            category = %category,
            "Receipt parsed"
        );

        Ok(ReceiptRecord {
            source_path: pdf.to_path_buf(),
            date,
            total_amount,
            category,
        })
    }

    async fn write_records(&self, records: &[ReceiptRecord], first_row: u32) -> Result<(), ReceiptError> {
        let mut row = first_row;
        let mut updates = Vec::with_capacity(records.len());
        for record in records {
            updates.push(RowUpdate {
                row,
                values: record.cells(),
            });
            row += 1;
        }

        match self.options.write_mode {
            WriteMode::Batch => self.services.sheet.update_rows(updates).await?,
            WriteMode::PerRow => {
                for update in updates {
                    info!(row = update.row, "Writing row");
                    self.services.sheet.update_rows(vec![update]).await?;
                }
            }
        }
        Ok(())
    }
}

/// Regular files with a `.pdf` extension, in name order.
pub fn find_pdfs(dir: &Path) -> Result<Vec<PathBuf>, ReceiptError> {
    let mut pdfs = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let path = entry.path();
        let is_pdf = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
        if is_pdf {
            pdfs.push(path);
        }
    }
    pdfs.sort();
    Ok(pdfs)
}
