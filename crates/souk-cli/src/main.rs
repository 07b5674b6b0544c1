mod db;
mod offers;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::db::DbCommands;
use crate::offers::OffersCommands;

#[derive(Debug, Parser)]
#[command(name = "souk-cli")]
#[command(about = "Souk marketplace command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Database connectivity, migrations, and catalog seeding
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
    /// Inspect vendor offers and the buy box for a product
    Offers {
        #[command(subcommand)]
        command: OffersCommands,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("souk-cli: no command given; run with --help for usage");
        return Ok(());
    };

    let config = souk_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = souk_db::PoolConfig::from_app_config(&config);
    let pool = souk_db::connect_pool(&config.database_url, pool_config).await?;

    match command {
        Commands::Db { command } => db::run_db_command(&pool, &config, command).await,
        Commands::Offers { command } => offers::run_offers_command(&pool, command).await,
    }
}

#[cfg(test)]
mod tests;
