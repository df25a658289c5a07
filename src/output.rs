use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::{ExtractError, ExtractResult};
use crate::model::{EventMetadata, LapRecord};
use crate::parser::metadata::slugify;

pub const HEADER: [&str; 4] = ["Car", "Driver", "Lap", "T (Time)"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Csv,
    Json,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Json => "json",
        }
    }
}

pub fn output_path(dir: &Path, metadata: &EventMetadata, format: OutputFormat) -> PathBuf {
    dir.join(format!("{}.{}", metadata.table_stem(), format.extension()))
}

/// Hands out table paths for one batch so no two documents share a file.
///
/// The first document for an event gets the plain event name. Later ones get
/// the source file stem appended, then a counter if that is taken too.
#[derive(Debug)]
pub struct TablePaths {
    dir: PathBuf,
    format: OutputFormat,
    claimed: HashSet<PathBuf>,
}

impl TablePaths {
    pub fn new(dir: &Path, format: OutputFormat) -> Self {
        TablePaths {
            dir: dir.to_path_buf(),
            format,
            claimed: HashSet::new(),
        }
    }

    pub fn claim(&mut self, metadata: &EventMetadata, source: &Path) -> PathBuf {
        let plain = output_path(&self.dir, metadata, self.format);
        if self.claimed.insert(plain.clone()) {
            return plain;
        }

        let source_stem = source
            .file_stem()
            .map(|s| slugify(&s.to_string_lossy()))
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "document".to_string());
        let base = format!("{}-{}", metadata.table_stem(), source_stem);
        let mut n = 1;
        loop {
            let stem = if n == 1 {
                base.clone()
            } else {
                format!("{base}-{n}")
            };
            let path = self.dir.join(format!("{stem}.{}", self.format.extension()));
            if self.claimed.insert(path.clone()) {
                return path;
            }
            n += 1;
        }
    }
}

pub fn write_csv_rows<W: Write>(writer: W, records: &[LapRecord]) -> csv::Result<()> {
    let mut w = csv::Writer::from_writer(writer);
    w.write_record(HEADER)?;
    for r in records {
        let lap = r.lap_number.to_string();
        let time = r.lap_time.to_string();
        w.write_record([
            r.participant_id.as_str(),
            r.participant_name.as_str(),
            lap.as_str(),
            time.as_str(),
        ])?;
    }
    w.flush()?;
    Ok(())
}

#[derive(Serialize)]
struct JsonTable<'a> {
    event: &'a EventMetadata,
    laps: &'a [LapRecord],
}

/// Write one lap table to `path`, creating its directory if needed.
pub fn write_table(
    path: &Path,
    metadata: &EventMetadata,
    records: &[LapRecord],
    format: OutputFormat,
) -> ExtractResult<()> {
    let fail = |message: String| ExtractError::Output {
        path: path.to_path_buf(),
        message,
    };

    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|e| fail(e.to_string()))?;
    }
    let file = std::fs::File::create(path).map_err(|e| fail(e.to_string()))?;
    match format {
        OutputFormat::Csv => write_csv_rows(file, records).map_err(|e| fail(e.to_string()))?,
        OutputFormat::Json => {
            let table = JsonTable {
                event: metadata,
                laps: records,
            };
            serde_json::to_writer_pretty(file, &table).map_err(|e| fail(e.to_string()))?
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<LapRecord> {
        vec![
            LapRecord {
                participant_id: "5".into(),
                participant_name: "O'Ward, Pato".into(),
                lap_number: 12,
                lap_time: 71.23,
            },
            LapRecord {
                participant_id: "5".into(),
                participant_name: "O'Ward, Pato".into(),
                lap_number: 13,
                lap_time: 70.0,
            },
        ]
    }

    #[test]
    fn csv_rows_quote_names() {
        let mut buf = Vec::new();
        write_csv_rows(&mut buf, &sample()).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(
            text,
            "Car,Driver,Lap,T (Time)\n5,\"O'Ward, Pato\",12,71.23\n5,\"O'Ward, Pato\",13,70\n"
        );
    }

    #[test]
    fn csv_header_only_when_empty() {
        let mut buf = Vec::new();
        write_csv_rows(&mut buf, &[]).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "Car,Driver,Lap,T (Time)\n");
    }

    #[test]
    fn table_named_after_event() {
        let dir = tempfile::TempDir::new().unwrap();
        let out_dir = dir.path().join("out");
        let meta = EventMetadata {
            name: "long-beach".into(),
            date: "2025-04-13".into(),
        };
        let path = output_path(&out_dir, &meta, OutputFormat::Csv);
        write_table(&path, &meta, &sample(), OutputFormat::Csv).unwrap();
        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            "indycar-long-beach-2025-04-13-laptimes.csv"
        );
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 3);
    }

    #[test]
    fn json_table_has_event_and_laps() {
        let dir = tempfile::TempDir::new().unwrap();
        let meta = EventMetadata::default();
        let path = output_path(dir.path(), &meta, OutputFormat::Json);
        write_table(&path, &meta, &sample(), OutputFormat::Json).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["event"]["name"], "unknown-event");
        assert_eq!(value["laps"][0]["T (Time)"], 71.23);
        assert_eq!(value["laps"][1]["Lap"], 13);
    }

    #[test]
    fn colliding_events_get_distinct_paths() {
        let mut paths = TablePaths::new(Path::new("out"), OutputFormat::Csv);
        let unknown = EventMetadata::default();
        let first = paths.claim(&unknown, Path::new("in/a.txt"));
        let second = paths.claim(&unknown, Path::new("in/b.txt"));
        let third = paths.claim(&unknown, Path::new("other/b.pdf"));
        assert_eq!(first, Path::new("out/indycar-unknown-event-unknown-date-laptimes.csv"));
        assert_eq!(second, Path::new("out/indycar-unknown-event-unknown-date-laptimes-b.csv"));
        assert_eq!(third, Path::new("out/indycar-unknown-event-unknown-date-laptimes-b-2.csv"));
    }
}
