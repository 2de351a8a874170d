use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tilescout_resolve::Config;

mod commands;

#[derive(Debug, Parser)]
#[command(name = "tilescout", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the embedding store (default: ~/.local/share/tilescout/embeddings.db)
    #[arg(long, global = true)]
    db: Option<PathBuf>,
}

#[derive(Debug, clap::Subcommand)]
enum Commands {
    /// Run the HTTP API
    ///
    /// Serves the similarity pipeline over HTTP:
    ///
    /// - GET  /similarity/text?q=<text>
    /// - GET  /similarity/point?lon=<lon>&lat=<lat>
    /// - POST /similarity/vector   {"vector": [...], "k": 12}
    /// - GET  /chips/<id>
    /// - GET  /stats
    /// - GET  /health
    ///
    /// Unless disabled, a handful of common phrases are resolved before the
    /// listener opens so the first requests are served from cache.
    Serve {
        /// Address to bind (overrides bind_address from config)
        #[arg(long)]
        bind: Option<String>,

        /// Skip the startup warmup
        #[arg(long)]
        no_warmup: bool,
    },
    /// Find tiles similar to a named place or feature
    Text {
        /// Free text, e.g. "airport" or "Ferry Building"
        query: String,
    },
    /// Find tiles similar to the tile containing a point
    Point {
        /// Longitude in degrees
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,

        /// Latitude in degrees
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
    },
    /// Show a chip's centroid
    Chip {
        /// Tile id
        chips_id: String,
    },
    /// Load chips from a newline-delimited JSON file
    ///
    /// Each line is {"chips_id": "...", "vec": [1024 floats], "polygon": [[lon, lat], ...]}.
    /// Existing ids are updated in place.
    Import {
        /// Path to the NDJSON file
        path: PathBuf,
    },
    /// Show store status
    Status,
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, clap::Subcommand)]
enum ConfigAction {
    /// Show the effective configuration
    Show,
    /// Print the config file path
    Path,
    /// Print an example config file
    Example,
    /// Create the config file with defaults if it is missing
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { bind, no_warmup } => {
            let mut config = load_config(cli.db)?;
            if let Some(bind) = bind {
                config.bind_address = bind;
            }
            if no_warmup {
                config.warmup = false;
            }
            commands::serve::run_serve(&config).await?;
        }
        Commands::Text { query } => {
            let config = load_config(cli.db)?;
            commands::query::run_text(&config, &query).await?;
        }
        Commands::Point { lon, lat } => {
            let config = load_config(cli.db)?;
            commands::query::run_point(&config, lon, lat).await?;
        }
        Commands::Chip { chips_id } => {
            let config = load_config(cli.db)?;
            commands::query::run_chip(&config, &chips_id).await?;
        }
        Commands::Import { path } => {
            let config = load_config(cli.db)?;
            commands::import::run_import(&path, &config.database_path)?;
        }
        Commands::Status => {
            let config = load_config(cli.db)?;
            commands::status::show_status(&config)?;
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config::show_config()?,
            ConfigAction::Path => commands::config::show_path()?,
            ConfigAction::Example => commands::config::show_example()?,
            ConfigAction::Init => commands::config::init_config()?,
        },
    }

    Ok(())
}

fn load_config(db: Option<PathBuf>) -> Result<Config> {
    let config = match db {
        Some(db) => Config::load_with_db_path(db)?,
        None => Config::load()?,
    };

    // Ensure database directory exists
    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_commands_need_no_store() {
        let cli = Cli::try_parse_from(["tilescout", "config", "path"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Config {
                action: ConfigAction::Path
            }
        ));
    }

    #[test]
    fn test_load_config_creates_store_directory() {
        let dir = tempfile::TempDir::new().unwrap();
        let db = dir.path().join("nested").join("embeddings.db");

        let config = load_config(Some(db.clone())).unwrap();

        assert_eq!(config.database_path, db);
        assert!(dir.path().join("nested").is_dir());
    }

    #[test]
    fn test_negative_point_arguments_parse() {
        let cli =
            Cli::try_parse_from(["tilescout", "point", "--lon", "-122.39", "--lat", "37.61"])
                .unwrap();
        assert!(matches!(cli.command, Commands::Point { lon, .. } if lon < 0.0));
    }
}
