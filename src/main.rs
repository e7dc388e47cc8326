use std::net::SocketAddr;
use std::sync::Arc;

use chrono::Utc;
use clap::{Parser, Subcommand};
use tower_http::trace::TraceLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use profitpilot::analytics::{
    BidStats, ForecastHorizon, InsightsService, RoiInputs, calculate_roi, forecast,
};
use profitpilot::bids::BidListLoader;
use profitpilot::config::Config;
use profitpilot::db::{Database, MemoryDatabase, PgDatabase};
use profitpilot::llm::create_generation_service;
use profitpilot::notify::LogNotifier;
use profitpilot::setup::SetupService;
use profitpilot::web::{WebState, router};

#[derive(Parser, Debug)]
#[command(name = "profitpilot", version, about = "Contractor bid pricing and proposals")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the public proposal link (default)
    Serve {
        /// Address to listen on
        #[arg(long, env = "PROFITPILOT_BIND")]
        bind: Option<SocketAddr>,

        /// Base URL for shareable proposal links
        #[arg(long, env = "PROFITPILOT_PUBLIC_URL")]
        public_url: Option<String>,
    },

    /// Apply database migrations and exit
    Migrate,

    /// Build a starter rate catalog from a business description
    Setup {
        #[arg(long, env = "PROFITPILOT_OWNER")]
        owner: String,

        /// Free-text description of the business
        description: String,
    },

    /// Print bid statistics, ROI, forecast and insights as JSON
    Report {
        #[arg(long, env = "PROFITPILOT_OWNER")]
        owner: String,

        /// Forecast horizon in months (3, 6 or 12)
        #[arg(long, default_value_t = 6)]
        months: u32,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("profitpilot=info,tower_http=info"));

    let json = std::env::var("PROFITPILOT_LOG_JSON").is_ok_and(|v| v == "1" || v == "true");
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}

async fn open_database(config: &Config) -> anyhow::Result<Arc<dyn Database>> {
    match &config.database {
        Some(db_config) => {
            let db = PgDatabase::connect(db_config).await?;
            db.run_migrations().await?;
            Ok(Arc::new(db))
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using in-memory storage");
            Ok(Arc::new(MemoryDatabase::new()))
        }
    }
}

async fn serve(config: Config) -> anyhow::Result<()> {
    let db = open_database(&config).await?;
    let state = WebState {
        db,
        notifier: Arc::new(LogNotifier),
    };
    let app = router(state).layer(TraceLayer::new_for_http());

    let addr = config.server.bind;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(
        "Proposal links served on {} (public URL {})",
        addr,
        config.server.public_url
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down");
        })
        .await?;
    Ok(())
}

async fn report(config: Config, owner: &str, months: u32) -> anyhow::Result<()> {
    let horizon = match months {
        3 => ForecastHorizon::ThreeMonths,
        12 => ForecastHorizon::TwelveMonths,
        6 => ForecastHorizon::SixMonths,
        other => anyhow::bail!("unsupported forecast horizon: {} months", other),
    };

    let db = open_database(&config).await?;
    let list = BidListLoader::new(db, config.loading.retry_policy())
        .load(owner)
        .await;
    if let Some(error) = &list.error {
        tracing::warn!("{}", error);
    }

    let now = Utc::now();
    let today = now.date_naive();
    let insights = InsightsService::new(
        create_generation_service(&config.llm),
        config.generation.retry_policy(),
    )
    .generate(&list.bids)
    .await;

    let output = serde_json::json!({
        "example": list.is_example(),
        "stats": BidStats::from_bids(&list.bids),
        "roi": calculate_roi(&list.bids, &RoiInputs::new(today), now),
        "forecast": forecast(&list.bids, today, horizon),
        "insights": insights.map(|g| g.value),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env();
    init_tracing();

    match cli.command.unwrap_or(Command::Serve {
        bind: None,
        public_url: None,
    }) {
        Command::Serve { bind, public_url } => {
            let mut config = config;
            if let Some(addr) = bind {
                config = config.with_bind(addr);
            }
            if let Some(url) = public_url {
                config = config.with_public_url(url);
            }
            serve(config).await
        }
        Command::Migrate => {
            let Some(db_config) = &config.database else {
                anyhow::bail!("DATABASE_URL must be set to run migrations");
            };
            PgDatabase::connect(db_config).await?.run_migrations().await?;
            Ok(())
        }
        Command::Setup { owner, description } => {
            let db = open_database(&config).await?;
            let service = SetupService::new(
                db,
                create_generation_service(&config.llm),
                config.generation.retry_policy(),
            );
            let report = service.run(&owner, &description).await?;
            println!(
                "{}: created {} rates ({} skipped, {} failed){}",
                if report.business_type.is_empty() {
                    "Business setup"
                } else {
                    report.business_type.as_str()
                },
                report.created.len(),
                report.skipped.len(),
                report.failed.len(),
                if report.used_fallback { " using defaults" } else { "" }
            );
            if !report.summary.is_empty() {
                println!("{}", report.summary);
            }
            Ok(())
        }
        Command::Report { owner, months } => report(config, &owner, months).await,
    }
}
