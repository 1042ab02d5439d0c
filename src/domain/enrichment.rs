// Batch enrichment domain models
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Maps a source column holding tag names to a target column that
/// receives resolved point identifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMapping {
    pub source: String,
    pub target: String,
}

impl ColumnMapping {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

/// Min/max and per-exact-instant occurrence counts over a batch of
/// discovery timestamps. Repeated identical instants across tags are a
/// correctness signal for the upstream data, so exact duplicates are
/// counted rather than collapsed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimestampAggregate {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub occurrences: BTreeMap<DateTime<Utc>, usize>,
}

impl TimestampAggregate {
    pub fn record(&mut self, timestamp: DateTime<Utc>) {
        if self.start.is_none_or(|start| timestamp < start) {
            self.start = Some(timestamp);
        }
        if self.end.is_none_or(|end| timestamp > end) {
            self.end = Some(timestamp);
        }
        *self.occurrences.entry(timestamp).or_insert(0) += 1;
    }

    pub fn total(&self) -> usize {
        self.occurrences.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.occurrences.is_empty()
    }
}

/// Row-oriented tabular dataset owned by the batch pipeline. Columns are
/// addressed by header name; rows are padded when columns are added.
#[derive(Debug, Clone, Default)]
pub struct TagTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl TagTable {
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn push_row(&mut self, mut row: Vec<String>) {
        row.resize(self.headers.len(), String::new());
        self.rows.push(row);
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Index of the named column, appending it (and padding every row)
    /// when it does not exist yet.
    pub fn ensure_column(&mut self, name: &str) -> usize {
        if let Some(idx) = self.column(name) {
            return idx;
        }
        self.headers.push(name.to_string());
        let width = self.headers.len();
        for row in &mut self.rows {
            row.resize(width, String::new());
        }
        width - 1
    }

    pub fn value(&self, row: usize, column: usize) -> &str {
        self.rows[row].get(column).map_or("", String::as_str)
    }

    pub fn set(&mut self, row: usize, column: usize, value: String) {
        self.rows[row][column] = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn test_aggregate_min_max_and_duplicate_counts() {
        let t1 = ts(100);
        let t2 = ts(200);

        let mut agg = TimestampAggregate::default();
        agg.record(t1);
        agg.record(t1);
        agg.record(t2);

        assert_eq!(agg.start, Some(t1));
        assert_eq!(agg.end, Some(t2));
        assert_eq!(agg.occurrences.get(&t1), Some(&2));
        assert_eq!(agg.occurrences.get(&t2), Some(&1));
        assert_eq!(agg.total(), 3);
    }

    #[test]
    fn test_empty_aggregate() {
        let agg = TimestampAggregate::default();
        assert!(agg.is_empty());
        assert_eq!(agg.start, None);
        assert_eq!(agg.end, None);
    }

    #[test]
    fn test_ensure_column_pads_existing_rows() {
        let mut table = TagTable::new(vec!["Tag".to_string()]);
        table.push_row(vec!["WF1.T01.GenSpeed".to_string()]);

        let idx = table.ensure_column("new tep_id");
        assert_eq!(idx, 1);
        assert_eq!(table.value(0, idx), "");

        // Second call resolves to the same column.
        assert_eq!(table.ensure_column("new tep_id"), 1);
    }

    #[test]
    fn test_push_row_pads_to_header_width() {
        let mut table = TagTable::new(vec!["a".to_string(), "b".to_string()]);
        table.push_row(vec!["1".to_string()]);
        assert_eq!(table.value(0, 1), "");
    }
}
