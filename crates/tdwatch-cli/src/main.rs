mod pipeline;
mod reports;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::pipeline::PipelineCommands;
use crate::reports::RatingsCommands;

#[derive(Debug, Parser)]
#[command(name = "tdwatch")]
#[command(about = "Score Irish political news against TDs' ratings and ideology profiles")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Database maintenance
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
    /// Run the scoring pipeline
    Pipeline {
        #[command(subcommand)]
        command: PipelineCommands,
    },
    /// Rating reports
    Ratings {
        #[command(subcommand)]
        command: RatingsCommands,
    },
    /// Party aggregate ratings
    Parties,
    /// Recent processing runs
    Runs {
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Check the database connection
    Ping,
    /// Apply pending migrations
    Migrate,
    /// Upsert the politician roster from the configured YAML file
    Seed,
}

fn init_tracing(log_level: &str) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(log_level))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();
    Ok(())
}

async fn run_db(
    pool: &sqlx::PgPool,
    config: &tdwatch_core::AppConfig,
    command: DbCommands,
) -> anyhow::Result<()> {
    match command {
        DbCommands::Ping => {
            tdwatch_db::health_check(pool).await?;
            println!("database ok");
        }
        DbCommands::Migrate => {
            let applied = tdwatch_db::run_migrations(pool).await?;
            println!("applied {applied} migration(s)");
        }
        DbCommands::Seed => {
            let roster = tdwatch_core::load_politicians(&config.politicians_path)?;
            let count = tdwatch_db::seed_politicians(pool, &roster.politicians).await?;
            println!(
                "seeded {count} politician(s) from {}",
                config.politicians_path.display()
            );
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("tdwatch: no command given; see --help");
        return Ok(());
    };

    let config = tdwatch_core::load_app_config()?;
    init_tracing(&config.log_level)?;

    let pool_config = tdwatch_db::PoolConfig::from_app_config(&config);
    let pool = tdwatch_db::connect_pool(&config.database_url, pool_config).await?;

    match command {
        Commands::Db { command } => run_db(&pool, &config, command).await,
        Commands::Pipeline { command } => pipeline::run(&pool, &config, command).await,
        Commands::Ratings { command } => reports::run_ratings(&pool, command).await,
        Commands::Parties => reports::run_parties(&pool).await,
        Commands::Runs { limit } => reports::run_runs(&pool, limit).await,
    }
}
