//! CSV output and run reporting.

use anyhow::Context;
use reelharvest_core::{Record, ScrapeResult};
use reelharvest_scanner::{is_item_url, ScrapeEvent};
use std::fs::File;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{info, warn};

/// Streams successful records to a CSV file as they complete.
pub struct CsvSink {
    writer: csv::Writer<File>,
    path: PathBuf,
    rows: usize,
}

impl CsvSink {
    /// Create the file and write the header row.
    pub fn create(path: &Path) -> anyhow::Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }

        let mut writer = csv::Writer::from_path(path)
            .with_context(|| format!("creating {}", path.display()))?;
        writer.write_record(Record::COLUMNS)?;
        writer.flush()?;

        Ok(Self {
            writer,
            path: path.to_path_buf(),
            rows: 0,
        })
    }

    /// Append one record and flush it to disk.
    pub fn write(&mut self, record: &Record) -> anyhow::Result<()> {
        self.writer.write_record(record.to_row())?;
        self.writer.flush()?;
        self.rows += 1;
        Ok(())
    }

    /// Drain the event channel until every sender is gone. Returns the
    /// number of rows written.
    ///
    /// Blocks on file I/O; run it under `spawn_blocking`.
    pub fn consume(mut self, mut events: UnboundedReceiver<ScrapeEvent>) -> anyhow::Result<usize> {
        while let Some(event) = events.blocking_recv() {
            match event {
                ScrapeEvent::Retrying { url, attempt, proxy } => {
                    info!(url = %url, attempt, proxy = %proxy, "retrying on new proxy");
                }
                ScrapeEvent::Completed(ScrapeResult::Success {
                    url,
                    proxy_used,
                    retry_count,
                    record,
                }) => {
                    self.write(&record)?;
                    info!(url = %url, proxy = %proxy_used, retries = retry_count, "saved");
                }
                ScrapeEvent::Completed(ScrapeResult::Failure {
                    url,
                    proxy_used,
                    retry_count,
                    error,
                }) => {
                    warn!(url = %url, proxy = %proxy_used, retries = retry_count, error = %error, "failed");
                }
            }
        }

        self.writer.flush()?;
        info!(path = %self.path.display(), rows = self.rows, "results written");
        Ok(self.rows)
    }
}

/// Write one URL per line.
pub fn write_url_list(path: &Path, urls: &[String]) -> anyhow::Result<()> {
    let mut contents = urls.join("\n");
    contents.push('\n');
    std::fs::write(path, contents).with_context(|| format!("writing {}", path.display()))
}

/// `<prefix>_<YYYYmmdd_HHMMSS>.<ext>` in the working directory.
pub fn timestamped_path(prefix: &str, ext: &str) -> PathBuf {
    let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    PathBuf::from(format!("{prefix}_{stamp}.{ext}"))
}

/// Worker count when none is given.
pub fn auto_concurrency(url_count: usize) -> usize {
    match url_count {
        0..=10 => 5,
        11..=30 => 10,
        31..=100 => 15,
        _ => 20,
    }
}

/// Worker count: the command-line flag, then the configured value, then a
/// count derived from the number of URLs.
pub fn resolve_concurrency(flag: Option<usize>, configured: Option<usize>, url_count: usize) -> usize {
    flag.or(configured)
        .unwrap_or_else(|| auto_concurrency(url_count))
        .max(1)
}

/// Count item URLs and profile URLs.
pub fn classify_urls(urls: &[String]) -> (usize, usize) {
    let items = urls.iter().filter(|u| is_item_url(u)).count();
    let profiles = urls
        .iter()
        .filter(|u| !is_item_url(u) && u.contains('@'))
        .count();
    (items, profiles)
}
