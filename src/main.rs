use crowdtemp::aggregator::Aggregator;
use crowdtemp::config::Config;
use crowdtemp::services::dashboard::{Broadcast, Dashboard};
use crowdtemp::services::{seed, simulate};
use crowdtemp::store::{FacilityRepository, FeedbackStore, MemoryStore, PgStore, ReadingStore};
use log::{error, info};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug)]
struct LoadedEnvFile {
    path: PathBuf,
    explicit: bool,
}

fn emit(message: &Broadcast) -> Result<(), String> {
    let line = serde_json::to_string(message).map_err(|e| format!("serializing broadcast failed: {}", e))?;
    println!("{}", line);
    Ok(())
}

fn serve<S>(store: S, cfg: &Config) -> Result<(), String>
where
    S: ReadingStore + FeedbackStore + FacilityRepository,
{
    let dashboard = Dashboard::new(Aggregator::new(store)).with_recent_readings_limit(cfg.recent_readings_limit);

    if cfg.seed_default_data && seed::run(&dashboard)? {
        info!("Default facilities created");
    }

    let views = dashboard
        .facility_views()
        .map_err(|e| format!("building facility views failed: {}", e))?;
    for view in &views {
        let history = dashboard
            .history(view.facility.id, cfg.history_hours)
            .map_err(|e| format!("history for facility {} failed: {}", view.facility.id, e))?;
        info!(
            "{}: showing {:.1}°C ({}), {} history point(s) in the last {}h, satisfaction {}%",
            view.facility.name,
            view.display_temp_c,
            if view.weighted { "crowd estimate" } else { "raw" },
            history.len(),
            cfg.history_hours,
            view.satisfaction_percent
        );
    }
    emit(&Broadcast::FacilitiesUpdate(views))?;
    let feedback = dashboard
        .recent_feedback(5)
        .map_err(|e| format!("listing recent feedback failed: {}", e))?;
    emit(&Broadcast::RecentFeedbacks(feedback))?;

    if cfg.simulation_enabled {
        info!(
            "Starting simulation loop: interval={}s",
            cfg.simulation_interval.as_secs()
        );
        let mut rng = SmallRng::from_os_rng();
        simulate::run_loop(&dashboard, cfg.simulation_interval, &mut rng, emit)?;
    } else {
        info!("Simulation disabled via SIMULATION_ENABLED");
    }

    Ok(())
}

fn run() -> Result<(), String> {
    // 1) Load config
    let cfg = Config::from_env()?;
    info!(
        "Config loaded (store={}, simulation_enabled={}, simulation_interval={}s, seed_default_data={}, recent_readings_limit={})",
        if cfg.database_url.is_some() { "postgres" } else { "memory" },
        cfg.simulation_enabled,
        cfg.simulation_interval.as_secs(),
        cfg.seed_default_data,
        cfg.recent_readings_limit
    );

    // 2) Pick the store and go
    match cfg.database_url.as_deref() {
        Some(url) => serve(Arc::new(PgStore::connect(url)?), &cfg),
        None => serve(Arc::new(MemoryStore::new()), &cfg),
    }
}

fn configure_env_from_cli() -> Result<Option<LoadedEnvFile>, String> {
    let mut args = std::env::args_os();
    args.next(); // skip program name

    let mut env_file: Option<PathBuf> = None;
    while let Some(arg) = args.next() {
        let path = match arg.to_str() {
            Some("--env-file") => args
                .next()
                .map(PathBuf::from)
                .ok_or_else(|| "`--env-file` requires a path argument".to_string())?,
            Some(s) if s.starts_with("--env-file=") => {
                let value = &s["--env-file=".len()..];
                if value.is_empty() {
                    return Err("`--env-file` requires a path argument".to_string());
                }
                PathBuf::from(value)
            }
            Some("--") => break,
            Some(other) => return Err(format!("unrecognised argument: {}", other)),
            None => return Err("argument contains invalid UTF-8".to_string()),
        };
        if env_file.replace(path).is_some() {
            return Err("`--env-file` provided more than once".to_string());
        }
    }

    // dotenvy never overrides variables already present in the process environment.
    if let Some(path) = env_file {
        if !path.is_file() {
            return Err(format!("env file not found: {}", path.display()));
        }
        dotenvy::from_path(&path).map_err(|e| format!("failed to load {}: {}", path.display(), e))?;
        return Ok(Some(LoadedEnvFile { path, explicit: true }));
    }

    let cwd = std::env::current_dir().map_err(|e| format!("unable to read current directory: {}", e))?;
    let default_path = cwd.join(".env");
    if !default_path.is_file() {
        return Ok(None);
    }
    dotenvy::from_path(&default_path).map_err(|e| format!("failed to load {}: {}", default_path.display(), e))?;
    Ok(Some(LoadedEnvFile {
        path: default_path,
        explicit: false,
    }))
}

fn main() {
    let loaded_env = match configure_env_from_cli() {
        Ok(info) => info,
        Err(err) => {
            eprintln!("fatal: {}", err);
            std::process::exit(1);
        }
    };

    // Init logging after environment so RUST_LOG from .env is respected.
    let default_filter = env_logger::Env::default().default_filter_or("info");
    env_logger::Builder::from_env(default_filter)
        .format_timestamp_secs()
        .init();

    if let Some(info) = loaded_env.as_ref() {
        let origin = if info.explicit { "CLI-specified" } else { "default" };
        info!("Environment loaded from {} .env file: {}", origin, info.path.display());
    }

    info!(
        "crowdtemp {} (git {}) starting",
        env!("CARGO_PKG_VERSION"),
        env!("BUILD_TIME_GIT_HASH")
    );
    if let Err(e) = run() {
        error!("fatal: {}", e);
        std::process::exit(1);
    }
}
