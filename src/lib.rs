pub mod agent_core;
pub mod commands;
pub mod inference;

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use agent_core::{AgentError, CoachDatabase, Orchestrator, Stores};
use commands::settings::{AppSettings, SETTINGS_FILE};
use inference::config::{find_seed_path, load_provider_seed};
use inference::{ProviderConfigStore, ProviderRouter};

/// Environment variable overriding the database location.
pub const DB_PATH_ENV: &str = "GOALCOACH_DB";

/// Return the platform-standard data directory for goalcoach.
///
/// - macOS: `~/Library/Application Support/goalcoach/`
/// - Windows: `{FOLDERID_RoamingAppData}\goalcoach\`
/// - Linux: `$XDG_DATA_HOME/goalcoach/` (fallback `~/.local/share/goalcoach/`)
///
/// Falls back to `~/.goalcoach/` only if none of the above can be resolved.
pub fn data_dir() -> PathBuf {
    if let Some(dir) = dirs::data_dir() {
        return dir.join("goalcoach");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".goalcoach")
}

/// Initialize the tracing subscriber, writing structured logs to the data directory.
///
/// Rotates existing logs (coach.log → coach.log.1 → .2 → .3) and opens a
/// fresh coach.log through a line-flushing writer.
pub fn init_tracing() -> std::io::Result<PathBuf> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = data_dir();
    std::fs::create_dir_all(&log_dir)?;

    let log_path = log_dir.join("coach.log");
    rotate_log_file(&log_path, 3);

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("goalcoach=info,warn"));

    fmt::fmt()
        .with_env_filter(filter)
        .with_writer(FlushingWriter::new(log_file))
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .init();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        data_dir = %log_dir.display(),
        log_file = %log_path.display(),
        pid = std::process::id(),
        "=== goalcoach starting ==="
    );
    Ok(log_path)
}

/// `coach.log` with generation `n` appended: `coach.log.1`, `coach.log.2`, ...
fn log_generation(base: &Path, n: u32) -> PathBuf {
    let mut name = base.as_os_str().to_owned();
    name.push(format!(".{n}"));
    PathBuf::from(name)
}

/// Shift previous runs' logs up one generation, keeping `keep` of them.
///
/// Runs before the subscriber exists, so failures are ignored: a log that
/// cannot be moved is appended to instead.
fn rotate_log_file(base_path: &Path, keep: u32) {
    if keep == 0 {
        return;
    }
    let _ = std::fs::remove_file(log_generation(base_path, keep));
    for n in (1..keep).rev() {
        let _ = std::fs::rename(log_generation(base_path, n), log_generation(base_path, n + 1));
    }
    if base_path.exists() {
        let _ = std::fs::rename(base_path, log_generation(base_path, 1));
    }
}

/// Log sink for `coach.log` that flushes after every write, so a session
/// that is killed mid-chat still leaves its last lines on disk.
#[derive(Clone)]
struct FlushingWriter {
    file: Arc<Mutex<std::fs::File>>,
}

impl FlushingWriter {
    fn new(file: std::fs::File) -> Self {
        Self {
            file: Arc::new(Mutex::new(file)),
        }
    }

    fn lock(&self) -> std::io::Result<std::sync::MutexGuard<'_, std::fs::File>> {
        self.file
            .lock()
            .map_err(|e| std::io::Error::other(format!("log file lock poisoned: {e}")))
    }
}

impl Write for FlushingWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut file = self.lock()?;
        let written = file.write(buf)?;
        file.flush()?;
        Ok(written)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.lock()?.flush()
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for FlushingWriter {
    type Writer = FlushingWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Resolve the path for the SQLite database.
///
/// `GOALCOACH_DB` wins; otherwise `coach.db` in the data directory (created
/// if needed).
fn resolve_db_path(data_dir: &Path) -> String {
    if let Ok(explicit) = std::env::var(DB_PATH_ENV) {
        if !explicit.trim().is_empty() {
            return explicit;
        }
    }
    if !data_dir.exists() {
        let _ = std::fs::create_dir_all(data_dir);
    }
    data_dir.join("coach.db").to_string_lossy().into_owned()
}

/// Import the provider seed file when no provider is configured yet.
///
/// Returns how many configs were imported. Invalid entries are skipped.
fn seed_providers(db: &CoachDatabase, data_dir: &Path) -> usize {
    match db.list_provider_configs() {
        Ok(existing) if existing.is_empty() => {}
        Ok(_) => return 0,
        Err(e) => {
            tracing::warn!(error = %e, "could not read provider configs, skipping seed");
            return 0;
        }
    }

    let Some(path) = find_seed_path(data_dir) else {
        tracing::info!("no provider seed file found");
        return 0;
    };

    let configs = match load_provider_seed(&path) {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to load provider seed");
            return 0;
        }
    };

    let mut imported = 0;
    for config in &configs {
        match db.insert_provider_config(config) {
            Ok(saved) => {
                imported += 1;
                tracing::info!(id = saved.id, provider = %saved.name, "seeded provider config");
            }
            Err(e) => {
                tracing::warn!(
                    provider = %config.name,
                    error = %e,
                    "failed to seed provider config"
                );
            }
        }
    }
    tracing::info!(path = %path.display(), imported, "provider seed imported");
    imported
}

// ─── App State ──────────────────────────────────────────────────────────────

/// Everything the commands need, shared for the lifetime of the process.
pub struct AppState {
    pub db: Arc<CoachDatabase>,
    pub router: Arc<ProviderRouter>,
    orchestrator: RwLock<Arc<Orchestrator>>,
    settings: Mutex<AppSettings>,
    settings_path: PathBuf,
}

impl AppState {
    /// Open the database, seed providers and load settings from the
    /// platform data directory.
    pub fn initialize() -> Result<Self, AgentError> {
        let dir = data_dir();
        let db_path = resolve_db_path(&dir);
        tracing::info!(path = %db_path, "opening database");
        Self::open(&db_path, &dir)
    }

    /// Like [`AppState::initialize`] with explicit locations.
    pub fn open(db_path: &str, data_dir: &Path) -> Result<Self, AgentError> {
        let db = Arc::new(CoachDatabase::open(db_path)?);
        seed_providers(&db, data_dir);
        let router = Arc::new(ProviderRouter::new(db.clone())?);
        Ok(Self::from_parts(db, router, data_dir.join(SETTINGS_FILE)))
    }

    /// Assemble state from an opened database and router.
    pub fn from_parts(
        db: Arc<CoachDatabase>,
        router: Arc<ProviderRouter>,
        settings_path: PathBuf,
    ) -> Self {
        let settings = AppSettings::load_or_default(&settings_path);
        let orchestrator = build_orchestrator(&db, &router, &settings);
        Self {
            db,
            router,
            orchestrator: RwLock::new(orchestrator),
            settings: Mutex::new(settings),
            settings_path,
        }
    }

    /// The current orchestrator. Settings changes swap in a new one; calls
    /// already running keep the one they started with.
    pub fn orchestrator(&self) -> Arc<Orchestrator> {
        self.orchestrator
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn settings(&self) -> AppSettings {
        *self.settings.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Persist `settings`, then rebuild the orchestrator with them.
    pub fn apply_settings(&self, settings: AppSettings) -> std::io::Result<()> {
        let mut current = self.settings.lock().unwrap_or_else(PoisonError::into_inner);
        settings.save(&self.settings_path)?;
        *current = settings;

        let rebuilt = build_orchestrator(&self.db, &self.router, &settings);
        *self
            .orchestrator
            .write()
            .unwrap_or_else(PoisonError::into_inner) = rebuilt;
        Ok(())
    }
}

fn build_orchestrator(
    db: &Arc<CoachDatabase>,
    router: &Arc<ProviderRouter>,
    settings: &AppSettings,
) -> Arc<Orchestrator> {
    Arc::new(Orchestrator::new(
        Stores::from_database(db.clone()),
        router.clone(),
        settings.limits(),
    ))
}
