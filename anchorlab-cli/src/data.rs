//! CSV bar loader.
//!
//! A header row is required. Column names are trimmed and lower-cased. The
//! timestamp comes from a `date` or `timestamp` column, else the first
//! column. `close` is required; `open`, `high`, `low` and `volume` are
//! optional and empty cells read as missing. Rows are returned in timestamp
//! order.

use std::io::Read;
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use anchorlab_core::{Bar, Timestamp};

/// Load bars from a CSV file.
pub fn load_bars(path: &Path) -> Result<Vec<Bar>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("cannot open bar file {}", path.display()))?;
    read_bars(file).with_context(|| format!("cannot read bars from {}", path.display()))
}

/// Read bars from any CSV source.
pub fn read_bars<R: Read>(reader: R) -> Result<Vec<Bar>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = rdr
        .headers()
        .context("missing header row")?
        .iter()
        .map(|h| h.trim().to_lowercase())
        .collect();
    if headers.is_empty() {
        bail!("missing header row");
    }

    let find = |name: &str| headers.iter().position(|h| h == name);
    let time_col = find("date").or_else(|| find("timestamp")).unwrap_or(0);
    let close_col = find("close").ok_or_else(|| anyhow!("required column 'close' not found"))?;
    let open_col = find("open");
    let high_col = find("high");
    let low_col = find("low");
    let volume_col = find("volume");

    let mut bars = Vec::new();
    for (row, record) in rdr.records().enumerate() {
        let record = record.with_context(|| format!("malformed row {}", row + 1))?;
        let cell = |col: usize| record.get(col).unwrap_or("");
        let optional = |col: Option<usize>, name: &str| -> Result<Option<f64>> {
            match col.map(cell) {
                None | Some("") => Ok(None),
                Some(raw) => raw
                    .parse::<f64>()
                    .map(Some)
                    .with_context(|| format!("row {}: bad {name} value '{raw}'", row + 1)),
            }
        };

        let timestamp = parse_timestamp(cell(time_col))
            .with_context(|| format!("row {}: bad timestamp", row + 1))?;
        // An empty close is kept as NaN so the engine reports the exact bar.
        let close = match cell(close_col) {
            "" => f64::NAN,
            raw => raw
                .parse::<f64>()
                .with_context(|| format!("row {}: bad close value '{raw}'", row + 1))?,
        };

        bars.push(Bar {
            timestamp,
            open: optional(open_col, "open")?,
            high: optional(high_col, "high")?,
            low: optional(low_col, "low")?,
            close,
            volume: optional(volume_col, "volume")?,
        });
    }

    bars.sort_by_key(|b| b.timestamp);
    Ok(bars)
}

/// RFC 3339, `%Y-%m-%d %H:%M:%S` or `%Y-%m-%d` (midnight UTC).
pub fn parse_timestamp(raw: &str) -> Result<Timestamp> {
    if let Ok(t) = DateTime::parse_from_rfc3339(raw) {
        return Ok(t.with_timezone(&Utc));
    }
    if let Ok(t) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Ok(t.and_utc());
    }
    if let Ok(d) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        if let Some(t) = d.and_hms_opt(0, 0, 0) {
            return Ok(t.and_utc());
        }
    }
    bail!("unrecognized timestamp '{raw}'")
}
