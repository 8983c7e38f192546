use clap::{Parser, Subcommand};

mod pipeline;
mod report;

#[derive(Debug, Parser)]
#[command(name = "vpgd-cli")]
#[command(about = "VPG intelligence digest command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the validate -> score -> trends pipeline once.
    Run {
        /// Print what would be processed without touching the database.
        #[arg(long)]
        dry_run: bool,
    },
    /// Apply pending database migrations.
    Migrate,
    /// Print the weekly trend report as JSON.
    Report {
        /// ISO week number; defaults to the latest week with data.
        #[arg(long, requires = "year")]
        week: Option<u32>,
        /// ISO year for --week.
        #[arg(long, requires = "week")]
        year: Option<i32>,
    },
    /// Print snapshot history for one trend key, oldest first.
    History {
        /// Normalized trend key, e.g. "competitor:kistler".
        key: String,
        #[arg(long, default_value_t = 12)]
        weeks: i64,
    },
    /// Print the validation result for one signal.
    Signal { id: i64 },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = vpgd_core::load_app_config()?;
    let pool = vpgd_db::connect_pool_from_env().await?;

    match Cli::parse().command {
        Commands::Run { dry_run } => pipeline::run_pipeline(&pool, &config, dry_run).await,
        Commands::Migrate => {
            let applied = vpgd_db::run_migrations(&pool).await?;
            println!("applied {applied} migrations");
            Ok(())
        }
        Commands::Report { week, year } => {
            report::run_trends_report(&pool, &config, week, year).await
        }
        Commands::History { key, weeks } => report::run_trend_history(&pool, &key, weeks).await,
        Commands::Signal { id } => report::run_signal_validation(&pool, id).await,
    }
}
