use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::warn;

use crate::config::ResolvedConfig;
use crate::domain::{Column, Record};
use crate::download::{AssetDownloader, DownloadOutcome};
use crate::error::CatalogError;
use crate::naming::asset_filename;
use crate::render::{extract_fields, render_document};
use crate::seatable::SeatableClient;
use crate::store::OutputLayout;

#[derive(Debug, Clone, Serialize)]
pub struct CatalogResult {
    pub table: String,
    pub view: Option<String>,
    pub image_column: String,
    pub rows: usize,
    pub downloaded: usize,
    pub cached: usize,
    pub skipped_without_image: usize,
    pub cards: usize,
    pub failures: Vec<AssetFailure>,
    pub document: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AssetFailure {
    pub row: usize,
    pub reference: String,
    pub error: String,
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

fn emit(sink: &dyn ProgressSink, message: String) {
    sink.event(ProgressEvent {
        message,
        elapsed: None,
    });
}

pub struct App<C: SeatableClient> {
    config: ResolvedConfig,
    layout: OutputLayout,
    client: C,
}

impl<C: SeatableClient> App<C> {
    pub fn new(config: ResolvedConfig, client: C) -> Self {
        let layout = OutputLayout::new(config.output_dir.clone());
        Self {
            config,
            layout,
            client,
        }
    }

    pub fn layout(&self) -> &OutputLayout {
        &self.layout
    }

    /// Runs the whole pipeline. Authentication, schema and row failures abort;
    /// a failed asset is recorded and the run continues.
    pub fn build(&self, sink: &dyn ProgressSink) -> Result<CatalogResult, CatalogError> {
        let started = Instant::now();
        self.layout.ensure_dirs()?;

        emit(sink, "phase=Auth; authenticating with SeaTable".to_string());
        let session = self.client.authenticate()?;
        emit(
            sink,
            format!("phase=Auth; connected to base {}...", session.base_prefix()),
        );

        emit(sink, "phase=Schema; loading base structure".to_string());
        let schema = self.client.fetch_metadata(&session)?;
        let table_name = self.config.table_name.as_deref();
        let table = schema.select_table(table_name).ok_or_else(|| match table_name {
            Some(name) => CatalogError::TableNotFound(name.to_string()),
            None => CatalogError::NoTables,
        })?;
        emit(sink, format!("phase=Schema; using table {}", table.name));
        let image_column = table
            .image_column()
            .ok_or_else(|| CatalogError::NoImageColumn(table.name.clone()))?
            .name
            .clone();
        emit(sink, format!("phase=Schema; image column {image_column}"));
        let display_columns = table.display_columns();

        emit(
            sink,
            format!(
                "phase=Rows; loading rows from view {}",
                self.config.view_name.as_deref().unwrap_or("(default)")
            ),
        );
        let rows = self.client.fetch_rows(
            &session,
            &table.name,
            self.config.view_name.as_deref(),
        )?;
        emit(sink, format!("phase=Rows; found {} rows", rows.len()));

        emit(
            sink,
            format!("phase=Assets; downloading images to {}", self.layout.images_dir()),
        );
        let tally = self.download_assets(&rows, &image_column, &display_columns, sink);

        let document_path = self.layout.document_path();
        emit(sink, format!("phase=Render; generating {document_path}"));
        let document = render_document(
            &self.config.title,
            &rows,
            &image_column,
            &display_columns,
        );
        let written = self.layout.write_document(&document.html)?;
        sink.event(ProgressEvent {
            message: format!("phase=Render; catalog with {} cards written", document.cards),
            elapsed: Some(started.elapsed()),
        });

        Ok(CatalogResult {
            table: table.name.clone(),
            view: self.config.view_name.clone(),
            image_column,
            rows: rows.len(),
            downloaded: tally.downloaded,
            cached: tally.cached,
            skipped_without_image: tally.skipped,
            cards: document.cards,
            failures: tally.failures,
            document: written.to_string(),
        })
    }

    fn download_assets(
        &self,
        rows: &[Record],
        image_column: &str,
        display_columns: &[Column],
        sink: &dyn ProgressSink,
    ) -> AssetTally {
        let downloader = AssetDownloader::new(&self.client);
        let mut tally = AssetTally::default();
        let total = rows.len();

        for (idx, row) in rows.iter().enumerate() {
            let position = idx + 1;
            let Some(reference) = row.first_asset(image_column) else {
                tally.skipped += 1;
                continue;
            };
            let fields = extract_fields(row, display_columns);
            emit(
                sink,
                format!(
                    "phase=Assets; [{position}/{total}] {}",
                    fields.title_or_default()
                ),
            );

            let filename = asset_filename(&reference);
            let target = self.layout.image_path(&filename);
            match downloader.download(&reference, &target) {
                Ok(DownloadOutcome::Cached) => {
                    tally.cached += 1;
                    emit(sink, format!("phase=Assets; already exists: {filename}"));
                }
                Ok(DownloadOutcome::Downloaded { .. }) => {
                    tally.downloaded += 1;
                    emit(sink, format!("phase=Assets; downloaded: {filename}"));
                }
                Err(err) => {
                    warn!(row = position, %reference, error = %err, "asset download failed");
                    emit(sink, format!("phase=Assets; failed: {filename} ({err})"));
                    tally.failures.push(AssetFailure {
                        row: position,
                        reference: reference.to_string(),
                        error: err.to_string(),
                    });
                }
            }
        }

        tally
    }
}

#[derive(Debug, Default)]
struct AssetTally {
    downloaded: usize,
    cached: usize,
    skipped: usize,
    failures: Vec<AssetFailure>,
}
