// Batch enrichment CLI - annotates a tag CSV with tep ids and timestamps
use anyhow::Context;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use scada_signal_resolver::application::enrichment_service::{
    render_report, EnrichmentService, DISCOVERY_COLUMN,
};
use scada_signal_resolver::application::metadata_fetcher::MetadataFetcher;
use scada_signal_resolver::domain::enrichment::{ColumnMapping, TagTable};
use scada_signal_resolver::infrastructure::az_credentials::AzCliCredentialProvider;
use scada_signal_resolver::infrastructure::dgraph_client::DgraphMetadataClient;

/// Resolves tag names in a CSV against the graph-metadata service and
/// writes back point identifiers, discovery timestamps and an aggregate
/// report.
#[derive(Parser, Debug)]
#[command(name = "tepid-enrich", version)]
struct Args {
    /// Input CSV with a header row
    #[arg(long)]
    input: PathBuf,

    /// Output CSV for the enriched rows
    #[arg(long)]
    output: PathBuf,

    /// Plain-text timestamp aggregate report
    #[arg(long)]
    report: Option<PathBuf>,

    /// Graph-metadata GraphQL endpoint
    #[arg(long, env = "RESOLVER_ENDPOINT")]
    endpoint: String,

    /// Credential scope for the endpoint
    #[arg(long, env = "RESOLVER_SCOPE")]
    scope: String,

    /// Column mapping "source:target"; repeatable
    #[arg(long = "map", value_parser = parse_mapping)]
    mappings: Vec<ColumnMapping>,

    /// Column whose tags also get discovery timestamps fetched
    #[arg(long)]
    timestamp_source: Option<String>,

    #[arg(long, default_value_t = 5)]
    max_attempts: u32,

    #[arg(long, default_value_t = 2)]
    backoff_secs: u64,

    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,
}

fn parse_mapping(raw: &str) -> Result<ColumnMapping, String> {
    let (source, target) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected \"source:target\", got {raw:?}"))?;
    if source.is_empty() || target.is_empty() {
        return Err(format!("expected \"source:target\", got {raw:?}"));
    }
    Ok(ColumnMapping::new(source, target))
}

fn read_table(path: &Path) -> anyhow::Result<TagTable> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open input {}", path.display()))?;
    let headers = reader.headers()?.iter().map(str::to_string).collect();
    let mut table = TagTable::new(headers);
    for record in reader.records() {
        let record = record?;
        table.push_row(record.iter().map(str::to_string).collect());
    }
    Ok(table)
}

fn write_table(path: &Path, table: &TagTable) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create output {}", path.display()))?;
    writer.write_record(table.headers())?;
    for row in table.rows() {
        writer.write_record(row)?;
    }
    writer.flush()?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    if args.mappings.is_empty() && args.timestamp_source.is_none() {
        anyhow::bail!("nothing to do: pass at least one --map or --timestamp-source");
    }

    let mut table = read_table(&args.input)?;
    tracing::info!(rows = table.row_count(), "loaded input table");

    let fetcher = Arc::new(MetadataFetcher::new(
        Arc::new(AzCliCredentialProvider),
        Arc::new(DgraphMetadataClient::new(
            args.endpoint.clone(),
            Duration::from_secs(args.timeout_secs),
        )?),
        args.scope.clone(),
        args.max_attempts,
        Duration::from_secs(args.backoff_secs),
    ));
    let service = EnrichmentService::new(fetcher);

    if let Some(source) = &args.timestamp_source {
        let aggregate = service.enrich_timestamps(&mut table, source).await?;
        tracing::info!(
            timestamps = aggregate.total(),
            distinct = aggregate.occurrences.len(),
            "discovery timestamps fetched"
        );
        if let Some(report_path) = &args.report {
            let report = render_report(DISCOVERY_COLUMN, &aggregate);
            std::fs::write(report_path, report)
                .with_context(|| format!("failed to write report {}", report_path.display()))?;
            tracing::info!("timestamp report saved to {}", report_path.display());
        }
    }

    service.enrich_tep_ids(&mut table, &args.mappings).await?;

    write_table(&args.output, &table)?;
    tracing::info!("enriched table saved to {}", args.output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mapping() {
        let mapping = parse_mapping("New Name:new tep_id").unwrap();
        assert_eq!(mapping.source, "New Name");
        assert_eq!(mapping.target, "new tep_id");

        assert!(parse_mapping("no-separator").is_err());
        assert!(parse_mapping(":target").is_err());
    }

    #[test]
    fn test_table_round_trip() {
        let dir = std::env::temp_dir().join("tepid-enrich-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("round_trip.csv");
        std::fs::write(&path, "New Name,Dgraph Name\nWF1.a,WF1.b\n").unwrap();

        let mut table = read_table(&path).unwrap();
        assert_eq!(table.row_count(), 1);
        let idx = table.ensure_column("new tep_id");
        table.set(0, idx, "tep-42".to_string());

        let out = dir.join("round_trip_out.csv");
        write_table(&out, &table).unwrap();
        let written = std::fs::read_to_string(&out).unwrap();
        assert!(written.starts_with("New Name,Dgraph Name,new tep_id"));
        assert!(written.contains("tep-42"));
    }
}
