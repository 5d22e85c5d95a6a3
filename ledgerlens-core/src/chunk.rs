//! Chronological windows over a statement's records.

use chrono::NaiveDate;
use ledgerlens_ingest::{Direction, Record};
use serde::Serialize;
use std::num::NonZeroUsize;

/// Records per chunk unless configured otherwise. A prompt-size heuristic,
/// not a token count.
pub const DEFAULT_WINDOW: NonZeroUsize = NonZeroUsize::new(75).unwrap();

/// A non-empty, date-ordered run of records with its period and totals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chunk {
    records: Vec<Record>,
    period_start: NaiveDate,
    period_end: NaiveDate,
    total_in: f64,
    total_out: f64,
}

impl Chunk {
    /// Build a chunk from records that are already in date order.
    /// Returns `None` for an empty window.
    pub fn from_records(records: Vec<Record>) -> Option<Self> {
        let period_start = records.first()?.date;
        let period_end = records.last()?.date;
        let total_in = sum_direction(&records, Direction::In);
        let total_out = sum_direction(&records, Direction::Out);
        Some(Self {
            records,
            period_start,
            period_end,
            total_in,
            total_out,
        })
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn period_start(&self) -> NaiveDate {
        self.period_start
    }

    pub fn period_end(&self) -> NaiveDate {
        self.period_end
    }

    /// Sum of `CR` amounts.
    pub fn total_in(&self) -> f64 {
        self.total_in
    }

    /// Sum of `DB` amounts.
    pub fn total_out(&self) -> f64 {
        self.total_out
    }

    pub fn into_records(self) -> Vec<Record> {
        self.records
    }
}

fn sum_direction(records: &[Record], direction: Direction) -> f64 {
    records
        .iter()
        .filter(|r| r.direction == direction)
        .map(|r| r.amount)
        .sum()
}

/// Sort records by date (stable, so same-day rows keep input order) and cut
/// them into consecutive windows of at most `window` records.
///
/// Only the last chunk can be shorter than `window`. No records means no chunks.
pub fn build_chunks(mut records: Vec<Record>, window: NonZeroUsize) -> Vec<Chunk> {
    records.sort_by_key(|r| r.date);

    let window = window.get();
    let mut chunks = Vec::with_capacity(records.len().div_ceil(window));
    let mut it = records.into_iter().peekable();
    while it.peek().is_some() {
        let slice: Vec<Record> = it.by_ref().take(window).collect();
        chunks.extend(Chunk::from_records(slice));
    }
    chunks
}
