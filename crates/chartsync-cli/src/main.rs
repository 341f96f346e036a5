//! Command-line entry point for scheduled and manual runs.

use anyhow::{bail, Context};
use chrono::{Local, NaiveDate};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use chartsync_core::{
    dates, run::RunContext, KnownPatientStore, NoopUploader, Orchestrator, OutboxUploader,
    Settings, SqliteSource, TextRenderer, UploadMode,
};

/// Incremental clinical-records synchronization.
#[derive(Parser, Debug)]
#[command(name = "chartsync", version, about)]
struct Args {
    /// Single date to process (default: today)
    #[arg(long, conflicts_with_all = ["start", "end"])]
    date: Option<String>,

    /// First date of a range (inclusive)
    #[arg(long, requires = "end")]
    start: Option<String>,

    /// Last date of a range (inclusive)
    #[arg(long, requires = "start")]
    end: Option<String>,

    /// Comma-separated pcodes to process instead of the normal candidate set
    #[arg(long, value_delimiter = ',')]
    pcode: Vec<String>,
}

fn parse_date(raw: &str) -> anyhow::Result<NaiveDate> {
    dates::parse_flexible(raw).with_context(|| format!("unrecognized date: {raw:?}"))
}

fn build_context(args: &Args) -> anyhow::Result<RunContext> {
    let ctx = match (&args.date, &args.start, &args.end) {
        (Some(date), _, _) => RunContext::for_date(parse_date(date)?),
        (None, Some(start), Some(end)) => {
            RunContext::for_range(parse_date(start)?, parse_date(end)?)?
        }
        _ => RunContext::for_date(Local::now().date_naive()),
    };
    Ok(ctx.with_filter(
        args.pcode
            .iter()
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect(),
    ))
}

fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();

    let settings = Settings::from_env()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(settings.log_filter.clone())),
        )
        .init();

    let ctx = build_context(&args)?;
    info!(
        db = %settings.db_path.display(),
        registry = %settings.registry_path.display(),
        "starting"
    );

    // a missing source database is the one truly fatal condition
    let source = SqliteSource::open(&settings.db_path)
        .with_context(|| format!("cannot open clinical database {}", settings.db_path.display()))?;
    let store = KnownPatientStore::new(&settings.registry_path);
    let renderer = TextRenderer;

    let summary = match settings.upload_mode {
        UploadMode::Outbox => {
            let uploader = OutboxUploader::new(&settings.outbox_dir);
            Orchestrator::new(&source, &renderer, &uploader, &store, &settings).run(&ctx)
        }
        UploadMode::None => {
            let uploader = NoopUploader;
            Orchestrator::new(&source, &renderer, &uploader, &store, &settings).run(&ctx)
        }
    };

    println!(
        "dates: {}  evaluated: {}  regenerated: {}  skipped: {}  missing: {}  failed: {}  exported: {}",
        summary.dates,
        summary.evaluated,
        summary.regenerated,
        summary.skipped,
        summary.missing,
        summary.failed,
        summary.exported_rows,
    );

    if summary.failed > 0 {
        bail!("{} patient(s) failed, see log", summary.failed);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_range_context() {
        let args = Args::parse_from(["chartsync", "--start", "2024-01-10", "--end", "12.01.2024"]);
        let ctx = build_context(&args).unwrap();
        assert_eq!(ctx.dates.len(), 3);
        assert!(ctx.filter.is_empty());
    }

    #[test]
    fn test_pcode_filter_splits_and_trims() {
        let args = Args::parse_from(["chartsync", "--date", "2024-01-10", "--pcode", "P1, P2,"]);
        let ctx = build_context(&args).unwrap();
        assert_eq!(ctx.filter, vec!["P1".to_string(), "P2".to_string()]);
    }

    #[test]
    fn test_inverted_range_is_an_error() {
        let args = Args::parse_from(["chartsync", "--start", "2024-01-12", "--end", "2024-01-10"]);
        assert!(build_context(&args).is_err());
    }
}
