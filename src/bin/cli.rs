//! anisync CLI
//!
//! Offline sync of seasonal anime artifacts, live catalog reads and a
//! season rollover scheduler.

use std::path::PathBuf;
use std::sync::Arc;

use anisync::{
    error::Result,
    models::{Config, DataMode, group_by_season, validate_limit},
    pipeline::{SyncScheduler, YearFetcher, YearSyncer},
    services::{AniListClient, AnimeCatalog, HttpImageSource},
    storage::{ArtifactStorage, LocalStorage},
    utils::{self, Clock, SystemClock, http, log as ui},
};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

/// anisync - seasonal anime catalog sync
#[derive(Parser, Debug)]
#[command(name = "anisync", version, about = "Seasonal anime catalog sync")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "anisync.toml")]
    config: PathBuf,

    /// Artifact directory (overrides storage.data_dir)
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Suppress progress bars and summaries
    #[arg(short, long)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch years and write artifacts, index and sync marker
    Sync {
        /// Comma separated years, e.g. 2022,2024
        #[arg(long)]
        years: Option<String>,

        /// Inclusive year range, e.g. 2020-2023
        #[arg(long, alias = "range")]
        year_range: Option<String>,

        /// Refetch years that already have an artifact
        #[arg(long)]
        force: bool,

        /// Entries per season (1-50)
        #[arg(long)]
        limit: Option<u32>,

        /// Keep remote cover URLs
        #[arg(long)]
        skip_images: bool,

        /// Parallel image downloads
        #[arg(long)]
        image_concurrency: Option<usize>,

        /// Delay after each image download in milliseconds
        #[arg(long)]
        image_spacing: Option<u64>,

        /// Keep running and resync on season rollover
        #[arg(long)]
        schedule: bool,
    },

    /// Read one year through the catalog and print it by season
    Fetch {
        year: i32,

        /// Entries per season (1-50)
        #[arg(long)]
        limit: Option<u32>,

        /// Data mode (local or remote)
        #[arg(long)]
        mode: Option<DataMode>,
    },

    /// Validate configuration
    Validate,

    /// Show synced years and the sync marker
    Info,
}

/// Initialize logging; `RUST_LOG` wins over `level`.
fn init_logging(level: &str) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let loaded = Config::load(&cli.config);
    let level = match (&loaded, cli.verbose) {
        (_, true) => "debug".to_string(),
        (Ok(config), false) => config.logging.level.clone(),
        (Err(_), false) => "info".to_string(),
    };
    init_logging(&level);
    ui::set_quiet(cli.quiet);

    let mut config = loaded.unwrap_or_else(|e| {
        log::warn!(
            "Config load failed from {}: {}. Using defaults.",
            cli.config.display(),
            e
        );
        Config::default()
    });
    config.apply_env();
    if let Some(dir) = cli.data_dir {
        config.storage.data_dir = dir;
    }

    let storage: Arc<dyn ArtifactStorage> = Arc::new(LocalStorage::new(&config.storage.data_dir));

    match cli.command {
        Command::Sync {
            years,
            year_range,
            force,
            limit,
            skip_images,
            image_concurrency,
            image_spacing,
            schedule,
        } => {
            if let Some(limit) = limit {
                config.fetch.per_season_limit = limit;
            }
            if skip_images {
                config.images.enabled = false;
            }
            if let Some(n) = image_concurrency {
                config.images.concurrency = n;
            }
            if let Some(ms) = image_spacing {
                config.images.spacing_ms = ms;
            }
            config.validate()?;

            let (current_year, _) = SystemClock.current_season();
            let targets = utils::resolve_target_years(
                year_range.as_deref(),
                years.as_deref(),
                current_year,
            );

            let client = http::create_async_client(&config.client)?;
            let source = Arc::new(AniListClient::with_client(client.clone(), &config.client));
            let syncer = YearSyncer::new(
                YearFetcher::new(source, &config.fetch),
                Arc::clone(&storage),
                Arc::new(HttpImageSource::new(client)),
                &config.images,
                config.fetch.per_season_limit,
            );

            let summary = syncer.bootstrap(&targets, force).await?;
            log::info!(
                "Synced {:?}, skipped {:?}",
                summary.synced.iter().map(|r| r.year).collect::<Vec<_>>(),
                summary.skipped
            );

            if schedule {
                let token = CancellationToken::new();
                let stop = token.clone();
                tokio::spawn(async move {
                    if tokio::signal::ctrl_c().await.is_ok() {
                        log::info!("Ctrl+C received, stopping scheduler");
                        stop.cancel();
                    }
                });
                SyncScheduler::new(&syncer, config.scheduler.interval())
                    .run(token)
                    .await;
            }
        }

        Command::Fetch { year, limit, mode } => {
            let limit = limit.unwrap_or(config.fetch.per_season_limit);
            validate_limit(limit)?;
            let mode = mode.unwrap_or(config.catalog.mode);

            let source = Arc::new(AniListClient::new(&config.client)?);
            let catalog = AnimeCatalog::new(
                mode,
                YearFetcher::new(source, &config.fetch),
                Arc::clone(&storage),
            );

            let list = catalog.fetch_anime_by_year(year, limit).await?;
            if list.is_empty() {
                log::warn!("No data found for {}", year);
            }
            for (season, entries) in group_by_season(&list) {
                ui::header(&format!("{} {} ({})", season.label(), year, entries.len()));
                for anime in entries {
                    ui::sub_item(&format!(
                        "{:>8}  {}  {}",
                        anime.popularity_rank(),
                        anime.display_title(),
                        anime.subtitle()
                    ));
                }
            }

            let stats = catalog.stats();
            ui::summary(
                &format!("{} mode", mode),
                &[
                    ("Entries", list.len().to_string()),
                    ("Local fallbacks", stats.local_fallbacks.to_string()),
                ],
            );
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!("✓ Config OK");
        }

        Command::Info => {
            log::info!("Data directory: {}", config.storage.data_dir.display());

            match storage.load_index().await? {
                Some(index) => {
                    let mut items = vec![
                        ("Years", format!("{:?}", index.years)),
                        ("Limit per season", index.limit_per_season.to_string()),
                        ("Generated", index.generated_at.to_rfc3339()),
                    ];
                    for (year, seasons) in &index.incomplete {
                        items.push(("Incomplete", format!("{} {:?}", year, seasons)));
                    }
                    ui::summary("Index", &items);
                }
                None => log::info!("No index found yet."),
            }

            match storage.load_sync_meta().await? {
                Some(meta) => {
                    let (year, season) = SystemClock.current_season();
                    log::info!(
                        "Last sync: {} {} at {}{}",
                        meta.last_season,
                        meta.last_year,
                        meta.updated_at.to_rfc3339(),
                        if meta.is_stale(year, season) {
                            " (stale)"
                        } else {
                            ""
                        }
                    );
                }
                None => log::info!("No sync marker found yet."),
            }
        }
    }

    log::info!("Done!");

    Ok(())
}
