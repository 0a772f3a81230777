//! Ingest command
//!
//! Usage: datapipe ingest <PATH> [--db <PATH>] [--subscriber <ID>]
//!        [--repository <NAME>] [--quarantine skip|abort]
//!
//! Each non-blank line of the input is one JSON data point. Shape changes are
//! printed as they happen, followed by a summary line.

use clap::Args;
use datapipe_core::diff::ShapeInfo;
use datapipe_core::errors::{ExError, ExErrorKind};
use datapipe_core::model::DataPoint;
use datapipe_core::plugin::{PluginContext, Subscriber};
use datapipe_engine::{Ingestor, QuarantinePolicy};
use datapipe_store::SqliteShapeStore;
use std::fs::File;
use std::io::{BufRead, BufReader, Lines, Write};
use std::path::{Path, PathBuf};

use crate::config::Config;

#[derive(Debug, Args)]
pub struct IngestArgs {
    /// NDJSON file of data points
    pub path: PathBuf,

    /// Shape database (created and migrated if missing)
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// Subscriber whose shapes are tracked
    #[arg(long = "subscriber")]
    pub subscriber_id: Option<String>,

    /// Repository name for the ingest context
    #[arg(long)]
    pub repository: Option<String>,

    /// What to do with records that can never be processed
    #[arg(long, value_parser = parse_quarantine)]
    pub quarantine: Option<QuarantinePolicy>,
}

fn parse_quarantine(s: &str) -> Result<QuarantinePolicy, String> {
    match s.to_ascii_lowercase().as_str() {
        "skip" => Ok(QuarantinePolicy::Skip),
        "abort" => Ok(QuarantinePolicy::Abort),
        other => Err(format!("expected skip or abort, got {}", other)),
    }
}

/// Subscriber that reports shape changes to a writer
pub struct PrintingSubscriber<W> {
    out: W,
}

impl<W: Write> PrintingSubscriber<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Subscriber for PrintingSubscriber<W> {
    fn receive(
        &mut self,
        _ctx: &PluginContext,
        info: &ShapeInfo,
        data_point: &DataPoint,
    ) -> Result<(), ExError> {
        if !info.has_changes() {
            return Ok(());
        }

        let line = if info.is_new {
            format!(
                "new shape: {} [{}]",
                data_point.entity,
                info.shape.properties.join(", ")
            )
        } else {
            let added: Vec<String> = info
                .new_properties
                .iter()
                .map(|(name, ty)| format!("{}:{}", name, ty))
                .collect();
            let mut line = format!("shape changed: {}", data_point.entity);
            if !added.is_empty() {
                line.push_str(&format!(" +[{}]", added.join(", ")));
            }
            if info.has_key_changes {
                line.push_str(&format!(" keys=[{}]", info.new_keys.join(", ")));
            }
            line
        };

        writeln!(self.out, "{}", line).map_err(|e| {
            ExError::new(ExErrorKind::Io)
                .with_op("receive")
                .with_message(e.to_string())
        })
    }
}

/// Lazy NDJSON source: one data point per non-blank line
///
/// A line that does not decode yields `MalformedRecord` and reading carries on
/// with the next line; read failures yield `Io`.
pub struct NdjsonSource<R> {
    lines: Lines<R>,
    line_no: usize,
}

impl<R: BufRead> NdjsonSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_no: 0,
        }
    }
}

impl<R: BufRead> Iterator for NdjsonSource<R> {
    type Item = Result<DataPoint, ExError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = self.lines.next()?;
            self.line_no += 1;
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    return Some(Err(ExError::new(ExErrorKind::Io)
                        .with_op("read_data_points")
                        .with_message(format!("line {}: {}", self.line_no, e))))
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            return Some(serde_json::from_str(&line).map_err(|e| {
                ExError::new(ExErrorKind::MalformedRecord)
                    .with_op("read_data_points")
                    .with_message(format!("line {}: {}", self.line_no, e))
            }));
        }
    }
}

/// Open `path` as an [`NdjsonSource`]
pub fn read_data_points(path: &Path) -> Result<NdjsonSource<BufReader<File>>, ExError> {
    let file = File::open(path).map_err(|e| {
        ExError::new(ExErrorKind::Io)
            .with_op("read_data_points")
            .with_message(format!("{}: {}", path.display(), e))
    })?;
    Ok(NdjsonSource::new(BufReader::new(file)))
}

pub fn execute(args: IngestArgs, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let db_path = config.db_path(args.db);
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let source = read_data_points(&args.path)?;
    let conn = datapipe_store::db::open_and_migrate(&db_path)?;
    let mut store = SqliteShapeStore::new(&conn, config.subscriber_id(args.subscriber_id));
    let ctx = PluginContext::new(config.repository(args.repository), "cli");

    let stdout = std::io::stdout();
    let mut printer = PrintingSubscriber::new(stdout.lock());
    let mut ingestor = Ingestor::new(&ctx, &mut store, &mut printer)
        .with_policy(config.quarantine(args.quarantine));
    let stats = ingestor.ingest_results(source)?;

    for record in ingestor.quarantine() {
        eprintln!(
            "quarantined: {} {}: {}",
            record.data_point.as_ref().map_or("-", |dp| dp.entity.as_str()),
            record.error.code(),
            record.error.message()
        );
    }

    println!(
        "Ingested: received={} delivered={} shape_changes={} quarantined={}",
        stats.received, stats.delivered, stats.shape_changes, stats.quarantined
    );
    Ok(())
}
