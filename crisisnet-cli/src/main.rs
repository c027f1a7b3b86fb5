//! CrisisNet CLI
//!
//! Cross-validated disaster signal fusion from social media streams.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use crisisnet_core::{ClusterStatus, Message};
use crisisnet_feeds::{OpenMeteoFeed, ReplaySource};
use crisisnet_ports::{FileSignalBundle, GazetteerGeocoder, HazardFeed, StaticHazardFeed};
use crisisnet_runtime::{AnalysisPipeline, AnalysisSession, Broadcaster, LiveAggregator, LivePoller};

#[derive(Parser)]
#[command(name = "crisisnet")]
#[command(author, version, about = "CrisisNet: cross-validated disaster signal fusion", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbosity level (0-3)
    #[arg(short, long, default_value = "1")]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a full batch analysis over a message corpus
    Analyze {
        /// JSON array of messages
        #[arg(short, long)]
        messages: PathBuf,

        /// JSON bundle of externally computed signals (similarity,
        /// centrality, communities, topics, sentiments)
        #[arg(short, long)]
        signals: PathBuf,

        /// JSON array of hazard alerts to validate against
        #[arg(long, conflicts_with = "weather")]
        hazards: Option<PathBuf>,

        /// Derive hazard alerts from Open-Meteo forecasts for the corpus locations
        #[arg(long)]
        weather: bool,

        /// Similarity threshold for graph edges
        #[arg(short, long, default_value = "0.3")]
        threshold: f64,

        /// Output file for the report (default: report_<timestamp>.json)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Stream recorded events through the live aggregator
    Live {
        /// JSON-lines file of live events
        #[arg(short, long)]
        events: PathBuf,

        /// Poll interval in milliseconds
        #[arg(long, default_value = "500")]
        interval_ms: u64,

        /// Events delivered per poll
        #[arg(long, default_value = "10")]
        batch_size: usize,

        /// Maximum run duration in seconds
        #[arg(long, default_value = "60")]
        duration_secs: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = match cli.verbose {
        0 => Level::ERROR,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .init();

    match cli.command {
        Commands::Analyze {
            messages,
            signals,
            hazards,
            weather,
            threshold,
            output,
        } => {
            run_analyze(messages, signals, hazards, weather, threshold, output).await?;
        }
        Commands::Live {
            events,
            interval_ms,
            batch_size,
            duration_secs,
        } => {
            run_live(events, interval_ms, batch_size, duration_secs).await?;
        }
    }

    Ok(())
}

async fn run_analyze(
    messages_path: PathBuf,
    signals_path: PathBuf,
    hazards_path: Option<PathBuf>,
    use_weather: bool,
    threshold: f64,
    output: Option<PathBuf>,
) -> Result<()> {
    println!("🌐 CrisisNet - Disaster Signal Fusion\n");

    let raw = fs::read_to_string(&messages_path)
        .with_context(|| format!("reading {}", messages_path.display()))?;
    let messages: Vec<Message> =
        serde_json::from_str(&raw).with_context(|| format!("parsing {}", messages_path.display()))?;

    let signals = Arc::new(
        FileSignalBundle::from_path(&signals_path)
            .with_context(|| format!("loading {}", signals_path.display()))?,
    );
    let geocoder = Arc::new(GazetteerGeocoder::default());

    let hazard_feed: Arc<dyn HazardFeed> = if use_weather {
        let locations: Vec<String> = messages
            .iter()
            .filter_map(|m| m.location.clone())
            .collect();
        println!("⛅ Hazard source: Open-Meteo forecasts");
        Arc::new(OpenMeteoFeed::new(geocoder.clone(), locations))
    } else if let Some(path) = hazards_path {
        println!("📋 Hazard source: {}", path.display());
        Arc::new(StaticHazardFeed::from_path(&path).with_context(|| format!("loading {}", path.display()))?)
    } else {
        println!("📋 Hazard source: none (cross-validation will report no matches)");
        Arc::new(StaticHazardFeed::default())
    };

    println!("📨 Messages: {}", messages.len());
    println!("🔗 Similarity threshold: {threshold}\n");

    let pipeline = AnalysisPipeline::new(
        signals.clone(),
        signals.clone(),
        signals.clone(),
        signals,
        hazard_feed,
        geocoder,
    )
    .with_threshold(threshold);

    println!("🚀 Running analysis...");
    let session = pipeline.run(messages).await?;

    print_session(&session);

    let output_path = output.unwrap_or_else(|| {
        let timestamp = chrono::Utc::now().format("%Y-%m-%d_%H-%M-%S");
        PathBuf::from(format!("report_{}.json", timestamp))
    });
    fs::write(&output_path, serde_json::to_string_pretty(&session)?)?;
    println!("\n📄 Report saved to: {}", output_path.display());

    Ok(())
}

fn print_session(session: &AnalysisSession) {
    println!("\n✅ Analysis complete (run {})", session.run_id);

    let stats = &session.graph_stats;
    println!(
        "🕸️  Graph: {} nodes, {} edges ({} similarity, {} keyword, {} location)",
        stats.nodes,
        stats.edges,
        stats.similarity_edges,
        stats.shared_keyword_edges,
        stats.shared_location_edges
    );

    let summary = &session.alerts.summary;
    println!(
        "🚨 Alerts: avg score {:.3} | {} critical, {} high, {} elevated",
        summary.average_alert_score,
        summary.critical_alerts,
        summary.high_alerts,
        summary.elevated_alerts
    );

    let xval = &session.cross_validation.summary;
    println!(
        "🔎 Cross-validation: {} aligned, {} contradicted, {} no-match of {} clusters",
        xval.aligned_clusters, xval.contradicted_clusters, xval.no_match_clusters, xval.total_clusters
    );
    for (community, verdict) in &session.cross_validation.cross_validation {
        let marker = match verdict.status {
            ClusterStatus::Aligned => "✅",
            ClusterStatus::Contradicted => "❌",
            ClusterStatus::Neutral => "➖",
            ClusterStatus::NoMatch => "❓",
        };
        println!(
            "   {marker} cluster {community} @ {} ({} messages, score {:+.2})",
            verdict.location, verdict.cluster_size, verdict.alignment_score
        );
    }

    if let Some(top) = session.cross_validation.adjusted_alerts.first() {
        println!(
            "🏆 Top alert: [{}] {:.3} - {}",
            top.severity, top.alert_score, top.text
        );
    }
}

async fn run_live(
    events_path: PathBuf,
    interval_ms: u64,
    batch_size: usize,
    duration_secs: u64,
) -> Result<()> {
    println!("🌐 CrisisNet - Live Event Stream\n");

    let source = ReplaySource::from_path(&events_path, Duration::from_millis(interval_ms))
        .with_context(|| format!("loading {}", events_path.display()))?
        .with_batch_size(batch_size);
    println!("📼 Replaying {} events from {}", source.remaining(), events_path.display());

    let broadcaster = Arc::new(Broadcaster::new());
    let (_, mut updates) = broadcaster.subscribe();
    let aggregator = Arc::new(LiveAggregator::new(broadcaster));
    let mut poller = LivePoller::new(aggregator.clone());
    poller.start(Box::new(source));

    let deadline = tokio::time::Instant::now() + Duration::from_secs(duration_secs);
    // Stop once the replay has gone quiet for a few poll intervals
    let idle = Duration::from_millis(interval_ms.saturating_mul(4).max(200));

    loop {
        let wait = tokio::time::timeout_at(deadline, tokio::time::timeout(idle, updates.recv()));
        match wait.await {
            Ok(Ok(Some(update))) => {
                let event = &update.event;
                let location = event.location.as_deref().unwrap_or("unknown");
                println!(
                    "📨 [{}] {} @ {} | keywords: {} | window: {} events",
                    event.source,
                    event.id,
                    location,
                    event.keywords.join(", "),
                    update.summary.total_events
                );
            }
            Ok(Ok(None)) | Ok(Err(_)) | Err(_) => break,
        }
    }

    poller.stop().await;

    let summary = aggregator.summary();
    println!("\n📊 Final window summary:");
    println!("   Events: {}", summary.total_events);
    println!("   Avg sentiment: {:.3}", summary.avg_sentiment);
    if !summary.top_locations.is_empty() {
        let locations: Vec<String> = summary
            .top_locations
            .iter()
            .map(|l| format!("{} ({})", l.location, l.count))
            .collect();
        println!("   Top locations: {}", locations.join(", "));
    }
    if !summary.top_keywords.is_empty() {
        println!("   Top keywords: {}", summary.top_keywords.join(", "));
    }

    Ok(())
}
