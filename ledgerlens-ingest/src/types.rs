use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Money flow of a statement row, taken verbatim from the `type` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Money received (`CR`).
    #[serde(rename = "CR")]
    In,
    /// Money spent (`DB`).
    #[serde(rename = "DB")]
    Out,
}

impl Direction {
    /// Parse a statement `type` cell. Accepts `CR`/`DB` in any case.
    pub fn from_code(code: &str) -> Option<Self> {
        let code = code.trim();
        if code.eq_ignore_ascii_case("CR") {
            Some(Direction::In)
        } else if code.eq_ignore_ascii_case("DB") {
            Some(Direction::Out)
        } else {
            None
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Direction::In => "CR",
            Direction::Out => "DB",
        }
    }
}

/// One normalized statement row.
///
/// Serializes with the statement's own column names (`type` carries `CR`/`DB`)
/// so the record can be embedded in analysis prompts as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub date: NaiveDate,
    pub description: String,
    #[serde(rename = "type")]
    pub direction: Direction,
    /// Always non-negative; the sign lives in `direction`.
    pub amount: f64,
}

impl Record {
    pub fn new(
        date: NaiveDate,
        description: impl Into<String>,
        direction: Direction,
        amount: f64,
    ) -> Self {
        Self {
            date,
            description: description.into(),
            direction,
            amount: amount.abs(),
        }
    }
}
