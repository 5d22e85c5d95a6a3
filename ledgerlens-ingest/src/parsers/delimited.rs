//! Delimited statement export parser.
//!
//! Expected layout (`;`-separated, header row first, column order free):
//!   date;description;type;amount
//!   2024-01-03;TRSF E-BANKING CR 0301/FTSCY/WS95051 PT MAJU JAYA;CR;1500000.00
//!   2024-01-04;BIAYA ADM;DB;15000

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use csv::{ByteRecord, ReaderBuilder, StringRecord, Trim};
use std::borrow::Cow;
use std::io::Read;
use std::path::Path;
use tracing::{debug, warn};

use crate::error::{ParseError, Result};
use crate::types::{Direction, Record};

/// Date layouts tried in order. `%Y` happily reads `24` as year 24, so
/// two-digit years come first and implausible years are rejected afterwards.
/// Layouts with a time part keep only the date.
pub const DEFAULT_DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%d/%m/%y",
    "%d/%m/%Y",
    "%Y/%m/%d",
    "%d-%m-%Y",
    "%d %b %Y",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
];

const MIN_STATEMENT_YEAR: i32 = 1900;

#[derive(Debug, Clone)]
pub struct NormalizeOptions {
    pub delimiter: u8,
    pub date_formats: Vec<String>,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            delimiter: b';',
            date_formats: DEFAULT_DATE_FORMATS.iter().map(|f| f.to_string()).collect(),
        }
    }
}

/// Valid records in file order plus how many data rows were dropped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizeReport {
    pub records: Vec<Record>,
    pub skipped_rows: usize,
    /// Skipped rows whose date was present but matched no known layout.
    pub unparsed_dates: usize,
}

impl NormalizeReport {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

struct Columns {
    date: usize,
    description: usize,
    kind: usize,
    amount: usize,
}

impl Columns {
    fn locate(headers: &StringRecord) -> Result<Self> {
        let find = |name: &'static str| {
            headers
                .iter()
                .position(|h| h.trim_start_matches('\u{feff}').trim().eq_ignore_ascii_case(name))
                .ok_or(ParseError::MissingColumn(name))
        };
        Ok(Self {
            date: find("date")?,
            description: find("description")?,
            kind: find("type")?,
            amount: find("amount")?,
        })
    }
}

/// Why a data row was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rejection {
    MissingDate,
    UnparsedDate,
    Amount,
    Kind,
}

fn parse_date(s: &str, formats: &[String]) -> Option<NaiveDate> {
    formats
        .iter()
        .filter_map(|f| {
            if f.contains("%H") {
                NaiveDateTime::parse_from_str(s, f).ok().map(|dt| dt.date())
            } else {
                NaiveDate::parse_from_str(s, f).ok()
            }
        })
        .find(|d| d.year() >= MIN_STATEMENT_YEAR)
}

fn parse_amount(s: &str) -> Option<f64> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Field text with invalid UTF-8 replaced by U+FFFD.
fn field(row: &ByteRecord, i: usize) -> Cow<'_, str> {
    row.get(i).map(String::from_utf8_lossy).unwrap_or(Cow::Borrowed(""))
}

fn is_blank(row: &ByteRecord) -> bool {
    row.iter().all(|f| f.trim_ascii().is_empty())
}

fn normalize_row(
    row: &ByteRecord,
    cols: &Columns,
    opts: &NormalizeOptions,
) -> std::result::Result<Record, Rejection> {
    let raw_date = field(row, cols.date);
    let raw_date = raw_date.trim();
    if raw_date.is_empty() {
        return Err(Rejection::MissingDate);
    }
    let date = parse_date(raw_date, &opts.date_formats).ok_or(Rejection::UnparsedDate)?;
    let amount = parse_amount(&field(row, cols.amount)).ok_or(Rejection::Amount)?;
    let direction = Direction::from_code(&field(row, cols.kind)).ok_or(Rejection::Kind)?;
    let description = field(row, cols.description);
    Ok(Record::new(date, description.trim(), direction, amount))
}

/// Normalize a delimited statement from any reader.
///
/// Rows without a usable date, amount or `CR`/`DB` type are dropped and counted.
/// Undecodable bytes inside a data row are replaced, not fatal. Only structural
/// problems fail: an unreadable header, a header without the required columns,
/// or data under a blank header. Input with no content at all is an empty report.
pub fn normalize_reader<R: Read>(reader: R, opts: &NormalizeOptions) -> Result<NormalizeReport> {
    let mut rdr = ReaderBuilder::new()
        .delimiter(opts.delimiter)
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    if headers.iter().all(|h| h.trim().is_empty()) {
        for row in rdr.byte_records() {
            if !is_blank(&row?) {
                return Err(ParseError::MissingHeader);
            }
        }
        debug!("statement has no content");
        return Ok(NormalizeReport::default());
    }
    let cols = Columns::locate(&headers)?;

    let mut report = NormalizeReport::default();
    let mut blank_rows = 0;
    for (i, result) in rdr.byte_records().enumerate() {
        let row = result?;
        if is_blank(&row) {
            blank_rows += 1;
            report.skipped_rows += 1;
            continue;
        }
        match normalize_row(&row, &cols, opts) {
            Ok(record) => report.records.push(record),
            Err(reason) => {
                // +2: one for the header, one for 1-based numbering
                debug!(row = i + 2, ?reason, "skipping statement row");
                if reason == Rejection::UnparsedDate {
                    report.unparsed_dates += 1;
                }
                report.skipped_rows += 1;
            }
        }
    }

    let dated_rejections = report.skipped_rows - blank_rows - report.unparsed_dates;
    let all_undated = report.unparsed_dates > 0 && dated_rejections == 0;
    if report.records.is_empty() && all_undated {
        warn!(rows = report.unparsed_dates, "no statement row has a recognized date layout");
    }

    Ok(report)
}

pub fn normalize_str(text: &str, opts: &NormalizeOptions) -> Result<NormalizeReport> {
    normalize_reader(text.as_bytes(), opts)
}

pub fn normalize_path(path: impl AsRef<Path>, opts: &NormalizeOptions) -> Result<NormalizeReport> {
    let file = std::fs::File::open(path.as_ref())?;
    normalize_reader(file, opts)
}
