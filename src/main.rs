use fightgraph::cli::{Cli, Commands, ConfigAction};
use fightgraph::config::{Config, ConfigValidator};
use fightgraph::error::{FightgraphError, Result};
use fightgraph::ratelimit::{AdaptiveRateLimiter, RateLimiter, Throttle};
use fightgraph::source::{CachedSource, DirectorySource, ProfileSource};
use fightgraph::store::EntityStore;
use fightgraph::{DiscoveryEngine, DiscoveryOptions, DiscoveryResult};
use std::path::{Path, PathBuf};

/// What a traversal command asks the engine to do
enum Job {
    Discover(Vec<String>),
    Expand,
}

fn main() -> Result<()> {
    let cli = Cli::parse_args();

    // Initialize logging
    init_logging(cli.verbose);

    match cli.command {
        Commands::Discover {
            ids,
            depth,
            per_depth,
            json,
        } => {
            let config =
                load_config(cli.config)?.with_discovery_overrides(depth, per_depth, None)?;
            cmd_traverse(&config, Job::Discover(ids), json)?;
        }
        Commands::Expand {
            depth,
            per_depth,
            sample,
            json,
        } => {
            let config =
                load_config(cli.config)?.with_discovery_overrides(depth, per_depth, sample)?;
            cmd_traverse(&config, Job::Expand, json)?;
        }
        Commands::Search { query, limit, json } => {
            cmd_search(cli.config, &query, limit, json)?;
        }
        Commands::Stats => {
            cmd_stats(cli.config)?;
        }
        Commands::Config { action } => {
            cmd_config(cli.config, action)?;
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = if verbose {
        "fightgraph=debug"
    } else {
        "fightgraph=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    fmt().with_env_filter(filter).with_target(false).init();
}

fn cmd_traverse(config: &Config, job: Job, json: bool) -> Result<()> {
    let options = DiscoveryOptions::from_config(&config.discovery);
    let store = open_store(config)?;
    let source = DirectorySource::new(expand_path(&config.source.profiles_dir)?);
    tracing::debug!("Reading profiles from {}", source.root().display());

    let rt = tokio::runtime::Runtime::new().map_err(|e| FightgraphError::Io {
        source: e,
        context: "Failed to create tokio runtime".to_string(),
    })?;

    let cache = &config.cache;
    let limits = &config.rate_limit;
    let result = rt.block_on(async {
        match (cache.enabled, limits.adaptive) {
            (true, true) => {
                let source = CachedSource::new(source, cache.ttl(), cache.max_entries);
                let throttle = AdaptiveRateLimiter::from_config(limits);
                run_job(source, throttle, store, job, &options).await
            }
            (true, false) => {
                let source = CachedSource::new(source, cache.ttl(), cache.max_entries);
                let throttle = RateLimiter::new(limits.min_interval());
                run_job(source, throttle, store, job, &options).await
            }
            (false, true) => {
                let throttle = AdaptiveRateLimiter::from_config(limits);
                run_job(source, throttle, store, job, &options).await
            }
            (false, false) => {
                let throttle = RateLimiter::new(limits.min_interval());
                run_job(source, throttle, store, job, &options).await
            }
        }
    })?;

    print_result(&result, json)
}

async fn run_job<S, T>(
    source: S,
    throttle: T,
    store: EntityStore,
    job: Job,
    options: &DiscoveryOptions,
) -> Result<DiscoveryResult>
where
    S: ProfileSource,
    T: Throttle,
{
    let mut engine = DiscoveryEngine::new(source, throttle, store);
    let result = match job {
        Job::Discover(ids) => engine.discover_from_many(ids.as_slice(), options).await?,
        Job::Expand => engine.expand(options).await?,
    };

    if !engine.frontier().is_empty() {
        tracing::info!(
            "{} queued fighters were not processed",
            engine.frontier().len()
        );
    }
    Ok(result)
}

fn print_result(result: &DiscoveryResult, json: bool) -> Result<()> {
    if json {
        let output = serde_json::to_string_pretty(result).map_err(|e| FightgraphError::Json {
            source: e,
            context: "Failed to serialize discovery result".to_string(),
        })?;
        println!("{}", output);
        return Ok(());
    }

    println!(
        "✓ Discovered {} new fighters ({} processed, depth {})",
        result.new_entities.len(),
        result.total_processed,
        result.depth_reached
    );
    for (depth, ids) in &result.entities_by_depth {
        println!("  Depth {}: {}", depth, ids.join(", "));
    }

    if !result.errors.is_empty() {
        println!("\n⚠ {} fighters could not be fetched:", result.errors.len());
        for error in &result.errors {
            println!("  - {}", error);
        }
    }

    Ok(())
}

fn cmd_search(config_path: Option<PathBuf>, query: &str, limit: usize, json: bool) -> Result<()> {
    let config = load_config(config_path)?;
    let store = open_store(&config)?;
    let matches = store.search(query, limit);

    if json {
        let output = serde_json::to_string_pretty(&matches).map_err(|e| FightgraphError::Json {
            source: e,
            context: "Failed to serialize search results".to_string(),
        })?;
        println!("{}", output);
        return Ok(());
    }

    if matches.is_empty() {
        println!("No fighters match '{}'", query);
        return Ok(());
    }

    for entity in &matches {
        match &entity.nickname {
            Some(nickname) => println!(
                "{}  \"{}\"  ({})",
                entity.canonical_name, nickname, entity.id
            ),
            None => println!("{}  ({})", entity.canonical_name, entity.id),
        }
    }

    Ok(())
}

fn cmd_stats(config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config(config_path)?;
    let store = open_store(&config)?;
    let stats = store.stats();

    println!("Fightgraph Index");
    println!("================");
    println!("\nStore: {}", store.path().display());
    println!("Fighters: {}", stats.count);
    if let Some(last_updated) = stats.last_updated {
        println!("Last updated: {}", last_updated.format("%Y-%m-%d %H:%M:%S"));
    }

    Ok(())
}

fn cmd_config(config_path: Option<PathBuf>, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = load_config(config_path)?;
            let json = serde_json::to_string_pretty(&config).map_err(|e| FightgraphError::Json {
                source: e,
                context: "Failed to serialize config".to_string(),
            })?;
            println!("{}", json);
        }
        ConfigAction::Validate { file } => {
            let path = match file.or(config_path) {
                Some(path) => path,
                None => Config::default_path()?,
            };
            let config = Config::load(&path)?;
            println!("✓ Configuration is valid");
            println!("  Schema version: {}", config.meta.schema_version);
        }
        ConfigAction::Init { force } => {
            let path = match config_path {
                Some(path) => path,
                None => Config::default_path()?,
            };

            if path.exists() && !force {
                println!("Configuration file already exists at: {}", path.display());
                println!("Use --force to overwrite");
                return Ok(());
            }

            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| FightgraphError::Io {
                    source: e,
                    context: format!("Failed to create config directory: {:?}", parent),
                })?;
            }

            Config::default().save(&path)?;

            println!("✓ Configuration initialized at: {}", path.display());
        }
    }

    Ok(())
}

fn load_config(config_path: Option<PathBuf>) -> Result<Config> {
    let path = match config_path {
        Some(path) => path,
        None => Config::default_path()?,
    };

    if !path.exists() {
        tracing::warn!(
            "Config file not found, using defaults. Run 'fightgraph config init' to create one."
        );
        let mut config = Config::default();
        config.apply_env_overrides();
        ConfigValidator::validate(&config)?;
        return Ok(config);
    }

    Config::load(&path)
}

fn open_store(config: &Config) -> Result<EntityStore> {
    let path = expand_path(&config.storage.store_path())?;
    EntityStore::open(path)
}

fn expand_path(path: &Path) -> Result<PathBuf> {
    let path_str = path
        .to_str()
        .ok_or_else(|| FightgraphError::Config("Invalid path encoding".to_string()))?;

    if let Some(stripped) = path_str.strip_prefix("~/") {
        let home = dirs::home_dir().ok_or_else(|| {
            FightgraphError::Config("Cannot determine home directory".to_string())
        })?;
        Ok(home.join(stripped))
    } else {
        Ok(path.to_path_buf())
    }
}
