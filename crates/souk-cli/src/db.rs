//! `db` sub-commands: connectivity check, migrations, and catalog seeding.

use std::path::PathBuf;

use clap::Subcommand;
use souk_core::AppConfig;
use souk_db::SeedSummary;

/// Sub-commands available under `db`.
#[derive(Debug, Subcommand)]
pub enum DbCommands {
    /// Check that the database is reachable
    Ping,
    /// Apply pending migrations
    Migrate,
    /// Load the catalog seed file (brands, vendors, attribute sets, categories)
    Seed {
        /// Seed file to load; defaults to `SOUK_CATALOG_SEED_PATH`
        #[arg(long)]
        path: Option<PathBuf>,
    },
}

pub(crate) async fn run_db_command(
    pool: &sqlx::PgPool,
    config: &AppConfig,
    command: DbCommands,
) -> anyhow::Result<()> {
    match command {
        DbCommands::Ping => {
            souk_db::ping(pool).await?;
            println!("database reachable");
        }
        DbCommands::Migrate => {
            let applied = souk_db::run_migrations(pool).await?;
            println!("applied {applied} migration(s)");
        }
        DbCommands::Seed { path } => {
            let path = path.unwrap_or_else(|| config.catalog_seed_path.clone());
            let seed = souk_core::load_catalog_seed(&path)?;
            souk_db::run_migrations(pool).await?;
            let summary = souk_db::seed_catalog(pool, &seed).await?;
            tracing::info!(path = %path.display(), ?summary, "catalog seeded");
            println!("{}", format_seed_summary(&summary));
        }
    }
    Ok(())
}

/// One-line summary printed after `db seed`.
pub(crate) fn format_seed_summary(summary: &SeedSummary) -> String {
    let store = if summary.store_settings {
        ", store settings updated"
    } else {
        ""
    };
    format!(
        "seeded {} brand(s), {} vendor(s), {} attribute set(s), {} categor{}{store}",
        summary.brands,
        summary.vendors,
        summary.attribute_sets,
        summary.categories,
        if summary.categories == 1 { "y" } else { "ies" },
    )
}
