//! URL Metrics CLI
//!
//! Groups a batch of URL Metrics by viewport width and prints the collection record.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Parser;
use std::fs;
use std::path::PathBuf;
use std::rc::Rc;

use urlmetrics_lib::utils::init_logging;
use urlmetrics_lib::{
    log_debug, log_error, log_info, log_warn, CollectionSettings, UrlMetric, UrlMetricAdded,
    UrlMetricGroupCollection, UrlMetricObserver,
};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

#[derive(Parser)]
#[command(name = "urlmetrics")]
#[command(author, version, about = "Group URL Metrics by viewport width", long_about = None)]
struct Cli {
    /// JSON file holding an array of URL Metrics
    #[arg(value_name = "FILE")]
    url_metrics: PathBuf,

    /// Settings file (breakpoints, sample size, freshness TTL)
    #[arg(short, long, default_value = "urlmetrics.json")]
    settings: PathBuf,

    /// Instant freshness is measured against (RFC 3339), defaults to the current time
    #[arg(long)]
    now: Option<DateTime<Utc>>,

    /// Log every insertion and dump the collection record
    #[arg(short, long)]
    verbose: bool,
}

struct InsertionLogger;

impl UrlMetricObserver for InsertionLogger {
    fn on_url_metric_added(&self, event: &UrlMetricAdded<'_>) {
        log_debug!(
            "[{}] {} now holds {}/{} URL Metrics for widths {}..={}",
            event.id,
            event.url_metric.url,
            event.group.len(),
            event.group.sample_size(),
            event.group.minimum_viewport_width(),
            event.group.maximum_viewport_width()
        );
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(err) = run(&cli) {
        log_error!("{err:?}");
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let settings = CollectionSettings::load(&cli.settings)?;
    let contents = fs::read_to_string(&cli.url_metrics).with_context(|| {
        format!("Failed to read URL Metrics from {}", cli.url_metrics.display())
    })?;
    let url_metrics: Vec<UrlMetric> = serde_json::from_str(&contents).with_context(|| {
        format!("Failed to parse URL Metrics in {}", cli.url_metrics.display())
    })?;

    let now = cli.now.unwrap_or_else(Utc::now);
    let mut collection = UrlMetricGroupCollection::new(Vec::<Rc<UrlMetric>>::new(), &settings, now)
        .context("invalid collection settings")?;
    collection.subscribe(InsertionLogger);

    let total = url_metrics.len();
    for url_metric in url_metrics {
        collection.add_url_metric(url_metric)?;
    }
    if !collection.is_any_group_populated() {
        log_warn!("no URL Metrics in {}", cli.url_metrics.display());
    }
    log_info!(
        "grouped {total} URL Metrics into {} groups (complete: {})",
        collection.len(),
        collection.is_every_group_complete()
    );

    let record = collection.to_record();
    let serialized = serde_json::to_string_pretty(&record)?;
    log_debug!("collection record: {serialized}");
    println!("{serialized}");
    Ok(())
}
