mod config;
mod recommend_cmd;
mod serve_cmd;
#[cfg(test)]
mod test_util;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use rally_db::config::DbConfig;
use rally_db::pool;

use config::RallyConfig;

#[derive(Parser)]
#[command(name = "rally", about = "Generates and stores weekly badminton training plans")]
struct Cli {
    /// Database URL (overrides RALLY_DATABASE_URL env var)
    #[arg(long, global = true)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a rally config file (no database required)
    Init {
        /// PostgreSQL connection URL
        #[arg(long, default_value = DbConfig::DEFAULT_URL)]
        db_url: String,
        /// Generative model API key (can also come from RALLY_API_KEY)
        #[arg(long)]
        api_key: Option<String>,
        /// Generative model name
        #[arg(long)]
        model: Option<String>,
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
    /// Initialize the rally database (requires config file or env vars)
    DbInit,
    /// Start the HTTP server
    Serve {
        /// Address to bind
        #[arg(long, default_value = "127.0.0.1")]
        bind: String,
        /// Port to listen on
        #[arg(long, default_value_t = 5000)]
        port: u16,
    },
    /// Generate and store training plans for a user
    Recommend {
        /// User ID
        user_id: String,
        /// Replay a captured backend response instead of calling the model
        #[arg(long)]
        response_file: Option<PathBuf>,
    },
    /// List a user's stored training plans
    Plans {
        /// User ID
        user_id: String,
    },
}

/// Execute the `rally init` command: write config file.
fn cmd_init(
    db_url: &str,
    api_key: Option<String>,
    model: Option<String>,
    force: bool,
) -> anyhow::Result<()> {
    let path = config::config_path();

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}\nUse --force to overwrite.",
            path.display()
        );
    }

    let has_key = api_key.is_some();
    let cfg = config::ConfigFile {
        database: config::DatabaseSection {
            url: db_url.to_string(),
        },
        backend: config::BackendSection {
            api_key,
            model,
            ..Default::default()
        },
        pipeline: Default::default(),
    };

    config::save_config(&cfg)?;

    println!("Config written to {}", path.display());
    println!("  database.url = {db_url}");
    if has_key {
        println!("  backend.api_key = (set)");
    } else {
        println!("  backend.api_key not set; export RALLY_API_KEY or rerun with --api-key");
    }
    println!();
    println!("Next: run `rally db-init` to create and migrate the database.");

    Ok(())
}

/// Execute the `rally db-init` command: create database and run migrations.
async fn cmd_db_init(cli_db_url: Option<&str>) -> anyhow::Result<()> {
    let resolved = RallyConfig::resolve(cli_db_url)?;

    println!("Initializing rally database...");

    // 1. Create the database if it does not exist.
    pool::ensure_database_exists(&resolved.db_config).await?;

    // 2. Connect to the target database.
    let db_pool = pool::create_pool(&resolved.db_config).await?;

    // 3. Run migrations.
    let applied = pool::run_migrations(&db_pool).await?;
    println!("Applied {applied} new migration(s).");

    // 4. Print success with table counts.
    let counts = pool::table_counts(&db_pool).await?;
    println!("Database ready. Tables:");
    for (table, count) in &counts {
        println!("  {table}: {count} rows");
    }

    db_pool.close().await;

    println!("rally db-init complete.");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init {
            db_url,
            api_key,
            model,
            force,
        } => {
            cmd_init(&db_url, api_key, model, force)?;
        }
        Commands::DbInit => {
            cmd_db_init(cli.database_url.as_deref()).await?;
        }
        Commands::Serve { bind, port } => {
            let resolved = RallyConfig::resolve(cli.database_url.as_deref())?;
            let backend = recommend_cmd::build_backend(&resolved.backend, None)?;
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let state = serve_cmd::AppState {
                pool: db_pool.clone(),
                backend,
                settings: Arc::new(resolved.pipeline),
            };
            let result = serve_cmd::run_serve(state, &bind, port).await;
            db_pool.close().await;
            result?;
        }
        Commands::Recommend {
            user_id,
            response_file,
        } => {
            let resolved = RallyConfig::resolve(cli.database_url.as_deref())?;
            let backend =
                recommend_cmd::build_backend(&resolved.backend, response_file.as_deref())?;
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let result = recommend_cmd::run_recommend(
                &db_pool,
                backend.as_ref(),
                &resolved.pipeline,
                &user_id,
            )
            .await;
            db_pool.close().await;
            result?;
        }
        Commands::Plans { user_id } => {
            let resolved = RallyConfig::resolve(cli.database_url.as_deref())?;
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let result = recommend_cmd::run_plans(&db_pool, &user_id).await;
            db_pool.close().await;
            result?;
        }
    }

    Ok(())
}
