// Batch enrichment pipeline over tabular tag data
use crate::application::metadata_fetcher::MetadataFetcher;
use crate::application::metadata_repository::first_tep_id;
use crate::domain::enrichment::{ColumnMapping, TagTable, TimestampAggregate};
use crate::domain::timestamp::parse_discovery_timestamp;
use std::fmt::Write as _;
use std::sync::Arc;

/// Column that receives the discovery timestamp of each row's tag.
pub const DISCOVERY_COLUMN: &str = "createdTimeNewTag";

/// Annotates a tabular dataset with resolved point identifiers and
/// discovery timestamps. Every tag appears at most once per run, so this
/// deliberately bypasses the resolution cache and calls the fetcher
/// directly.
pub struct EnrichmentService {
    fetcher: Arc<MetadataFetcher>,
}

impl EnrichmentService {
    pub fn new(fetcher: Arc<MetadataFetcher>) -> Self {
        Self { fetcher }
    }

    /// Writes the first resolved point identifier per row into each
    /// mapping's target column. Rows whose tag yields nothing keep an
    /// empty target cell.
    pub async fn enrich_tep_ids(
        &self,
        table: &mut TagTable,
        mappings: &[ColumnMapping],
    ) -> anyhow::Result<()> {
        for mapping in mappings {
            let source = table.column(&mapping.source).ok_or_else(|| {
                anyhow::anyhow!("source column {:?} not found in input", mapping.source)
            })?;
            let target = table.ensure_column(&mapping.target);

            for row in 0..table.row_count() {
                let tag = table.value(row, source).trim().to_string();
                if tag.is_empty() {
                    continue;
                }
                tracing::debug!(tag, "querying point identifier");
                let outcome = self.fetcher.fetch(&tag).await;
                match first_tep_id(&outcome.records) {
                    Some(tep_id) => table.set(row, target, tep_id.to_string()),
                    None => tracing::debug!(tag, "no tep id found"),
                }
            }
        }
        Ok(())
    }

    /// Fetches discovery timestamps for the tags in `source_column`,
    /// writes them into [`DISCOVERY_COLUMN`] (the last parseable record
    /// per row wins the cell) and aggregates min/max plus per-instant
    /// occurrence counts over every timestamp fetched. Parse failures
    /// are logged and skipped without aborting the row.
    pub async fn enrich_timestamps(
        &self,
        table: &mut TagTable,
        source_column: &str,
    ) -> anyhow::Result<TimestampAggregate> {
        let source = table.column(source_column).ok_or_else(|| {
            anyhow::anyhow!("timestamp source column {source_column:?} not found in input")
        })?;
        let target = table.ensure_column(DISCOVERY_COLUMN);

        let mut aggregate = TimestampAggregate::default();
        for row in 0..table.row_count() {
            let tag = table.value(row, source).trim().to_string();
            if tag.is_empty() {
                continue;
            }
            tracing::debug!(tag, "querying discovery timestamps");
            let outcome = self.fetcher.fetch(&tag).await;

            for record in &outcome.records {
                let Some(raw) = record.discovery_timestamp() else {
                    continue;
                };
                let Some(timestamp) = parse_discovery_timestamp(raw) else {
                    tracing::warn!(tag, raw, "skipping unparseable discovery timestamp");
                    continue;
                };
                aggregate.record(timestamp);
                table.set(row, target, timestamp.to_rfc3339());
            }
        }
        Ok(aggregate)
    }
}

/// Plain-text aggregate report for one output column, listing start/end
/// timestamps and per-timestamp occurrence counts.
pub fn render_report(column: &str, aggregate: &TimestampAggregate) -> String {
    let mut report = String::new();
    let _ = writeln!(report, "Results for column '{column}':");
    let _ = writeln!(
        report,
        "Start Time (Oldest Timestamp): {}",
        aggregate
            .start
            .map_or_else(|| "none".to_string(), |t| t.to_rfc3339())
    );
    let _ = writeln!(
        report,
        "End Time (Latest Timestamp): {}",
        aggregate
            .end
            .map_or_else(|| "none".to_string(), |t| t.to_rfc3339())
    );
    let _ = writeln!(report, "Number of timestamps: {}", aggregate.total());
    for (timestamp, count) in &aggregate.occurrences {
        let _ = writeln!(report, "{}: {count}", timestamp.to_rfc3339());
    }
    report
}
