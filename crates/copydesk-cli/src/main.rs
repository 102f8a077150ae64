mod audiences;
mod generate;
mod wizard;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use copydesk_core::Channel;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use crate::audiences::AudienceCommands;

#[derive(Debug, Parser)]
#[command(name = "copydesk-cli")]
#[command(about = "Copydesk command line interface")]
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
    /// Inspect saved audience profiles
    Audiences {
        #[command(subcommand)]
        command: AudienceCommands,
    },
    /// Run the prompt pipeline once for a saved audience
    Generate {
        /// Owner of the audience
        #[arg(long)]
        user: Uuid,
        /// Saved audience id
        #[arg(long)]
        audience: Uuid,
        /// ad, email or social
        #[arg(long)]
        channel: Channel,
        /// What the copy should achieve
        #[arg(long)]
        goal: String,
        /// Email style or social platform
        #[arg(long)]
        option: Option<String>,
        /// Store the result as a project
        #[arg(long)]
        save: bool,
    },
    /// Walk through the interactive wizard on stdin
    Wizard {
        #[arg(long)]
        user: Uuid,
        #[arg(long)]
        channel: Channel,
        /// Resume from and save progress to this JSON file
        #[arg(long)]
        state_file: Option<PathBuf>,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Check database connectivity
    Ping,
    /// Apply pending migrations
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("copydesk-cli: run with --help for available commands");
        return Ok(());
    };

    let config = copydesk_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let pool_config = copydesk_db::PoolConfig::from_app_config(&config);
    let pool = copydesk_db::connect_pool(&config.database_url, pool_config).await?;

    match command {
        Commands::Db { command } => match command {
            DbCommands::Ping => {
                copydesk_db::health_check(&pool).await?;
                println!("database ok");
            }
            DbCommands::Migrate => {
                let applied = copydesk_db::run_migrations(&pool).await?;
                println!("applied {applied} migration(s)");
            }
        },
        Commands::Audiences { command } => audiences::run(&pool, command).await?,
        Commands::Generate {
            user,
            audience,
            channel,
            goal,
            option,
            save,
        } => {
            let pipeline = copydesk_pipeline::Pipeline::from_config(&config)?;
            let args = generate::GenerateArgs {
                user_id: user,
                audience_id: audience,
                channel,
                goal,
                option,
                save,
            };
            generate::run_generate(&pool, &pipeline, args).await?;
        }
        Commands::Wizard {
            user,
            channel,
            state_file,
        } => {
            let pipeline = copydesk_pipeline::Pipeline::from_config(&config)?;
            wizard::run_interactive(
                &pool,
                &pipeline,
                &config.pricing_url,
                user,
                channel,
                state_file.as_deref(),
            )
            .await?;
        }
    }

    Ok(())
}
