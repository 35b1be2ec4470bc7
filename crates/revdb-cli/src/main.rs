mod scheduler;

use std::sync::Arc;

use clap::{Parser, Subcommand};
use revdb_analysis::{
    record_trend_query, top_categories, AnalysisService, LlmClassifier, QueueConfig, Stores,
};
use revdb_core::{AccessLogStore, AppConfig, CategoryStore, Review, ReviewStore, TrendEntry};
use revdb_db::{PgStore, PoolConfig};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "revdb")]
#[command(about = "revdb review analysis operator tool")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Apply pending database migrations
    Migrate,
    /// Run the analysis workers and the scheduled reprocess sweep until interrupted
    Worker,
    /// Queue every unanalyzed review once, wait for the pool to drain, and report
    Reprocess,
    /// Print the top categories by mean star rating
    Trends {
        /// Number of categories to show (defaults to `REVDB_TRENDS_DEFAULT_TOP`)
        #[arg(long)]
        top: Option<usize>,
    },
    /// List stored reviews with their analysis labels
    Reviews {
        /// Only show reviews in this category
        #[arg(long)]
        category: Option<i64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = revdb_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = PoolConfig::from_app_config(&config);
    let pool = revdb_db::connect_pool(&config.database_url, pool_config).await?;
    revdb_db::health_check(&pool).await?;

    match cli.command {
        Commands::Migrate => {
            let applied = revdb_db::run_migrations(&pool).await?;
            println!("applied {applied} migration(s)");
        }
        Commands::Worker => run_worker(PgStore::new(pool), &config).await?,
        Commands::Reprocess => run_reprocess(PgStore::new(pool), &config).await?,
        Commands::Trends { top } => {
            let n = top.unwrap_or(config.trends_default_top);
            let entries = trends_report(&PgStore::new(pool), n).await?;
            print!("{}", render_trends(&entries));
        }
        Commands::Reviews { category } => {
            let reviews = ReviewStore::list_by_category(&PgStore::new(pool), category).await?;
            print!("{}", render_reviews(&reviews));
        }
    }

    Ok(())
}

fn start_service(store: PgStore, config: &AppConfig) -> anyhow::Result<AnalysisService> {
    let classifier = Arc::new(LlmClassifier::from_app_config(config)?);
    Ok(AnalysisService::start(
        Stores::shared(Arc::new(store)),
        classifier,
        QueueConfig::from_app_config(config),
    ))
}

async fn run_worker(store: PgStore, config: &AppConfig) -> anyhow::Result<()> {
    let service = Arc::new(start_service(store, config)?);

    // Pick up anything left unanalyzed by a previous run without waiting
    // for the first cron tick.
    let startup_sweep = {
        let service = Arc::clone(&service);
        tokio::spawn(async move {
            if let Err(e) = service.reprocess_all().await {
                tracing::error!(error = %e, "startup reprocess sweep failed");
            }
        })
    };

    let mut scheduler =
        scheduler::build_scheduler(Arc::clone(&service), &config.reprocess_cron).await?;
    tracing::info!(
        env = %config.env,
        cron = %config.reprocess_cron,
        workers = config.analysis_workers,
        "revdb worker running"
    );

    shutdown_signal().await;
    tracing::info!("shutdown requested");

    scheduler.shutdown().await?;
    startup_sweep.abort();
    service.shutdown().await;

    let stats = service.stats();
    tracing::info!(
        analyzed = stats.analyzed,
        retried = stats.retried,
        dead_lettered = stats.dead_lettered,
        "revdb worker stopped"
    );
    Ok(())
}

async fn run_reprocess(store: PgStore, config: &AppConfig) -> anyhow::Result<()> {
    let service = start_service(store, config)?;

    let summary = service.reprocess_all().await?;
    service.wait_idle().await;
    let stats = service.stats();
    let dead_letters = service.dead_letters();
    service.shutdown().await;

    println!(
        "scanned {} unanalyzed review(s): {} submitted, {} already queued",
        summary.scanned, summary.submitted, summary.already_queued
    );
    println!(
        "analyzed {}, retried {}, dead-lettered {}, dropped {}",
        stats.analyzed, stats.retried, stats.dead_lettered, stats.dropped
    );
    for letter in &dead_letters {
        println!(
            "  dead letter: review {} after {} attempt(s): {}",
            letter.job.review_id, letter.job.attempt, letter.reason
        );
    }

    Ok(())
}

/// Rank categories straight from the store and record the query before
/// returning, so a one-shot process never exits ahead of the log write.
async fn trends_report<S>(store: &S, n: usize) -> anyhow::Result<Vec<TrendEntry>>
where
    S: ReviewStore + CategoryStore + AccessLogStore,
{
    record_trend_query(store, n).await;
    Ok(top_categories(store, store, n).await?)
}

fn render_trends(entries: &[TrendEntry]) -> String {
    if entries.is_empty() {
        return "no rated categories\n".to_owned();
    }
    entries
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            format!(
                "{:>2}. {:<24} {:>5.2} avg  {:>4} review(s)  {}\n",
                i + 1,
                entry.name,
                entry.average_rating,
                entry.review_count,
                entry.description
            )
        })
        .collect()
}

fn render_reviews(reviews: &[Review]) -> String {
    if reviews.is_empty() {
        return "no reviews\n".to_owned();
    }
    reviews
        .iter()
        .map(|review| {
            let labels = review.analysis().map_or_else(
                || "pending".to_owned(),
                |(sentiment, tone)| format!("{sentiment}/{tone}"),
            );
            let category = review
                .category_id
                .map_or_else(|| "-".to_owned(), |id| id.to_string());
            format!(
                "{:>6}  {:>2}/10  category {:<4} {:<17} {}\n",
                review.id, review.stars, category, labels, review.text
            )
        })
        .collect()
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
