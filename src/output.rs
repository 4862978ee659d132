use std::io::{self, Write};

use serde::Serialize;

use crate::app::{CatalogResult, ProgressEvent, ProgressSink};

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Console,
    Json,
}

/// Machine-readable summary; progress is swallowed so stdout stays valid JSON.
pub struct JsonOutput;

impl JsonOutput {
    pub fn print_result(result: &CatalogResult) -> io::Result<()> {
        Self::print_json(result)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

impl ProgressSink for JsonOutput {
    fn event(&self, _event: ProgressEvent) {}
}

pub struct ConsoleOutput;

impl ConsoleOutput {
    pub fn print_summary(result: &CatalogResult) {
        println!();
        println!("Catalog complete: {}", result.document);
        println!(
            "  table: {} (view: {})",
            result.table,
            result.view.as_deref().unwrap_or("default")
        );
        println!(
            "  rows: {}, cards: {}, without image: {}",
            result.rows, result.cards, result.skipped_without_image
        );
        println!(
            "  images downloaded: {}, already present: {}, failed: {}",
            result.downloaded,
            result.cached,
            result.failures.len()
        );
        for failure in &result.failures {
            println!("  ! row {}: {}", failure.row, failure.error);
        }
    }
}

impl ProgressSink for ConsoleOutput {
    fn event(&self, event: ProgressEvent) {
        let message = event
            .message
            .split_once("; ")
            .map(|(_, text)| text)
            .unwrap_or(&event.message);
        match event.elapsed {
            Some(elapsed) => println!("  {message} ({:.1}s)", elapsed.as_secs_f64()),
            None => println!("  {message}"),
        }
    }
}
