//! One-shot resolution of the magic database directory.
//!
//! Tiers run strictly in order and stop at the first hit:
//!
//! 1. `TREE_MAGIC_DIR`
//! 2. the default directory under the user's data home
//! 3. `mime/` under each shared-data root
//! 4. download and extraction into 1 (if set) or 2
//!
//! The run happens at most once per [`MagicDb`]. Concurrent callers of
//! [`MagicDb::initialize`] wait on the same run and all observe its outcome.
//! Download or extraction failures never surface as errors; they leave the
//! database [`Resolution::Unresolved`] and the engine fails on first use.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::OnceCell;

use crate::archive::{extract, ArchiveIndex};
use crate::config::MagicDbConfig;
use crate::download::Downloader;
use crate::http::{Fetch, HttpClient, HttpClientConfig, HttpError};
use crate::search::{find_shared_dirs, SharedHit};
use crate::validate::is_valid_magic_dir;
use crate::Result;

/// Environment variable the engine reads its database directory from
pub const MAGIC_DIR_ENV: &str = "TREE_MAGIC_DIR";

/// Where a resolved database came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    Override,
    DefaultDataDir,
    /// Every shared-data database found, in search order
    SharedData { dirs: Vec<PathBuf> },
    Downloaded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MagicDir {
    pub path: PathBuf,
    pub origin: Origin,
    engine_dir: Option<PathBuf>,
}

impl MagicDir {
    /// Directory to hand to the engine explicitly.
    ///
    /// `None` when the engine's own shared-data search already finds `path`.
    pub fn engine_dir(&self) -> Option<&Path> {
        self.engine_dir.as_deref()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Resolved(MagicDir),
    Unresolved,
}

impl Resolution {
    pub fn is_resolved(&self) -> bool {
        matches!(self, Resolution::Resolved(_))
    }

    pub fn magic_dir(&self) -> Option<&MagicDir> {
        match self {
            Resolution::Resolved(dir) => Some(dir),
            Resolution::Unresolved => None,
        }
    }

    pub fn engine_dir(&self) -> Option<&Path> {
        self.magic_dir().and_then(MagicDir::engine_dir)
    }

    /// Publish [`Self::engine_dir`] as `TREE_MAGIC_DIR`, for engines that
    /// only read their database location from the environment.
    ///
    /// Must be called before other threads read the environment.
    pub fn export_env(&self) {
        if let Some(dir) = self.engine_dir() {
            std::env::set_var(MAGIC_DIR_ENV, dir);
        }
    }
}

/// Magic database resolver. Holds the outcome of its single run.
pub struct MagicDb {
    config: MagicDbConfig,
    fetcher: Option<Arc<dyn Fetch>>,
    resolution: OnceCell<Resolution>,
}

impl MagicDb {
    /// Resolver that downloads over HTTP when needed
    pub fn new(config: MagicDbConfig) -> Self {
        Self {
            config,
            fetcher: None,
            resolution: OnceCell::new(),
        }
    }

    pub fn with_fetcher(config: MagicDbConfig, fetcher: Arc<dyn Fetch>) -> Self {
        Self {
            config,
            fetcher: Some(fetcher),
            resolution: OnceCell::new(),
        }
    }

    /// Run resolution once; later and concurrent calls share the result
    pub async fn initialize(&self) -> &Resolution {
        self.resolution.get_or_init(|| self.resolve()).await
    }

    /// Outcome of a finished run, without starting one
    pub fn get(&self) -> Option<&Resolution> {
        self.resolution.get()
    }

    async fn resolve(&self) -> Resolution {
        match self.run().await {
            Ok(resolution) => resolution,
            Err(e) => {
                log::error!("Failed to install magic database: {}", e);
                Resolution::Unresolved
            }
        }
    }

    async fn run(&self) -> Result<Resolution> {
        if let Some(dir) = &self.config.magic_dir_override {
            if is_valid_magic_dir(dir).await {
                log::debug!("Using {} from {}", dir.display(), MAGIC_DIR_ENV);
                return Ok(resolved(dir.clone(), Origin::Override));
            }
            log::debug!("{} does not hold a valid magic database", dir.display());
        }

        let default_dir = &self.config.default_magic_dir;
        if is_valid_magic_dir(default_dir).await {
            log::debug!("Using default magic directory {}", default_dir.display());
            return Ok(resolved(default_dir.clone(), Origin::DefaultDataDir));
        }

        let hits = find_shared_dirs(&self.config.search_roots).await;
        if !hits.is_empty() {
            log::info!("Using shared-mime-info database from the following directories: ");
            for hit in &hits {
                log::info!("{}", hit.dir.display());
            }
            return Ok(Resolution::Resolved(shared_data_dir(hits)));
        }

        self.download_and_install().await
    }

    async fn download_and_install(&self) -> Result<Resolution> {
        let url = &self.config.download_url;
        log::warn!(
            "No valid paths for mime database found, start downloading from: {}",
            url
        );

        let downloader = Downloader::new(
            self.fetcher()?,
            self.config.download_attempts,
            self.config.attempt_timeout,
        );

        let Some(download) = downloader.fetch(url).await else {
            log::error!("Failed to download shared-mime-info from: {}", url);
            log::error!(
                "Check your internet connection or supply your own URL to TREE_MAGIC_URL environment variable."
            );
            return Ok(Resolution::Unresolved);
        };

        let dest = self.config.extraction_dir();
        if self.config.magic_dir_override.is_some() {
            log::info!("Unzipping to {}: {}", MAGIC_DIR_ENV, dest.display());
        } else {
            log::info!(
                "{} not provided, unzipping to default location: {}",
                MAGIC_DIR_ENV,
                dest.display()
            );
        }

        let index = ArchiveIndex::new(download.bytes)?;
        if index.base_dir().is_none() {
            return Ok(Resolution::Unresolved);
        }

        extract(&index, dest, self.config.extract_concurrency).await?;

        if !is_valid_magic_dir(dest).await {
            log::error!(
                "Extracted archive at {} is missing required magic files",
                dest.display()
            );
            return Ok(Resolution::Unresolved);
        }

        Ok(resolved(dest.to_path_buf(), Origin::Downloaded))
    }

    fn fetcher(&self) -> Result<Arc<dyn Fetch>> {
        match &self.fetcher {
            Some(fetcher) => Ok(fetcher.clone()),
            None => {
                let client = HttpClient::with_config(http_config(&self.config))
                    .map_err(HttpError::from)?;
                Ok(Arc::new(client))
            }
        }
    }
}

/// Connecting may not outlast the attempt it belongs to
fn http_config(config: &MagicDbConfig) -> HttpClientConfig {
    HttpClientConfig::new()
        .with_user_agent(config.user_agent.clone())
        .with_connect_timeout(config.attempt_timeout)
}

/// A directory the engine must be pointed at explicitly
fn resolved(path: PathBuf, origin: Origin) -> Resolution {
    Resolution::Resolved(MagicDir {
        engine_dir: Some(path.clone()),
        path,
        origin,
    })
}

/// The engine searches shared-data roots itself, except the MSYS2 toolchain
/// root, which must be handed over explicitly.
fn shared_data_dir(hits: Vec<SharedHit>) -> MagicDir {
    let engine_dir = hits
        .iter()
        .find(|hit| MagicDbConfig::is_toolchain_root(&hit.root))
        .map(|hit| hit.dir.clone());
    let path = engine_dir
        .clone()
        .unwrap_or_else(|| hits[0].dir.clone());

    MagicDir {
        path,
        origin: Origin::SharedData {
            dirs: hits.into_iter().map(|hit| hit.dir).collect(),
        },
        engine_dir,
    }
}

static GLOBAL: OnceCell<Resolution> = OnceCell::const_new();

/// Resolve the process-wide database from the environment, at most once per
/// process. Every caller, concurrent or later, gets the same outcome.
pub async fn initialize() -> &'static Resolution {
    GLOBAL
        .get_or_init(|| async { MagicDb::new(MagicDbConfig::from_env()).resolve().await })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::MIME_SUBDIR;
    use crate::testing::{database_zip, zip_fixture, ScriptedFetch, Step};
    use crate::validate::REQUIRED_FILES;
    use std::time::Duration;
    use tempfile::TempDir;

    fn install(dir: &Path) {
        std::fs::create_dir_all(dir).unwrap();
        for name in REQUIRED_FILES {
            std::fs::write(dir.join(name), name).unwrap();
        }
    }

    fn config(temp: &TempDir) -> MagicDbConfig {
        MagicDbConfig::from_lookup(|_| None)
            .with_default_magic_dir(temp.path().join("data").join("tree_magic_db"))
            .with_search_roots(vec![temp.path().join("share")])
            .with_download_url("https://example.com/mime-database.zip".to_string())
            .with_attempt_timeout(Duration::from_millis(100))
    }

    fn db(config: MagicDbConfig, steps: Vec<Step>) -> (MagicDb, Arc<ScriptedFetch>) {
        let fetch = Arc::new(ScriptedFetch::new(steps));
        (MagicDb::with_fetcher(config, fetch.clone()), fetch)
    }

    #[tokio::test]
    async fn test_valid_override_wins() {
        let temp = TempDir::new().unwrap();
        let override_dir = temp.path().join("override");
        install(&override_dir);
        install(&config(&temp).default_magic_dir);

        let (db, fetch) = db(config(&temp).with_magic_dir_override(override_dir.clone()), vec![]);
        let resolution = db.initialize().await;

        let dir = resolution.magic_dir().unwrap();
        assert_eq!(dir.origin, Origin::Override);
        assert_eq!(dir.path, override_dir);
        assert_eq!(resolution.engine_dir(), Some(override_dir.as_path()));
        assert_eq!(fetch.calls(), 0);
    }

    #[tokio::test]
    async fn test_incomplete_override_falls_through() {
        let temp = TempDir::new().unwrap();
        let override_dir = temp.path().join("override");
        install(&override_dir);
        std::fs::remove_file(override_dir.join("subclasses")).unwrap();
        let default_dir = config(&temp).default_magic_dir;
        install(&default_dir);

        let (db, _) = db(config(&temp).with_magic_dir_override(override_dir), vec![]);
        let dir = db.initialize().await.magic_dir().unwrap();

        assert_eq!(dir.origin, Origin::DefaultDataDir);
        assert_eq!(dir.engine_dir(), Some(default_dir.as_path()));
    }

    #[tokio::test]
    async fn test_shared_data_is_not_published() {
        let temp = TempDir::new().unwrap();
        let shared = temp.path().join("share").join(MIME_SUBDIR);
        install(&shared);

        let (db, fetch) = db(config(&temp), vec![]);
        let resolution = db.initialize().await;

        let dir = resolution.magic_dir().unwrap();
        assert_eq!(dir.path, shared);
        assert_eq!(dir.origin, Origin::SharedData { dirs: vec![shared.clone()] });
        assert_eq!(resolution.engine_dir(), None);
        assert_eq!(fetch.calls(), 0);
    }

    #[test]
    fn test_toolchain_hit_is_published() {
        let toolchain = PathBuf::from(r"C:\msys64\mingw64");
        let hits = vec![
            SharedHit { root: PathBuf::from("/usr/share"), dir: PathBuf::from("/usr/share/mime") },
            SharedHit { root: toolchain.clone(), dir: toolchain.join("mime") },
        ];

        let dir = shared_data_dir(hits);

        assert_eq!(dir.engine_dir(), Some(toolchain.join("mime").as_path()));
        assert_eq!(dir.path, toolchain.join("mime"));
    }

    #[tokio::test]
    async fn test_download_into_default_dir() {
        let temp = TempDir::new().unwrap();
        let (db, fetch) = db(config(&temp), vec![Step::Body(database_zip("data/mime/"))]);

        let dir = db.initialize().await.magic_dir().unwrap();
        let default_dir = temp.path().join("data").join("tree_magic_db");

        assert_eq!(dir.origin, Origin::Downloaded);
        assert_eq!(dir.path, default_dir);
        assert_eq!(dir.engine_dir(), Some(default_dir.as_path()));
        assert_eq!(std::fs::read(default_dir.join("magic")).unwrap(), b"data/mime/magic");
        assert!(default_dir.join("packages").join("freedesktop.org.xml").is_file());
        assert_eq!(fetch.calls(), 1);
    }

    #[tokio::test]
    async fn test_download_into_invalid_override() {
        let temp = TempDir::new().unwrap();
        let override_dir = temp.path().join("override");

        let (db, _) = db(
            config(&temp).with_magic_dir_override(override_dir.clone()),
            vec![Step::Fail, Step::Body(database_zip("mime/"))],
        );
        let dir = db.initialize().await.magic_dir().unwrap();

        assert_eq!(dir.path, override_dir);
        assert!(is_valid_magic_dir(&override_dir).await);
        assert!(!temp.path().join("data").exists());
    }

    #[tokio::test]
    async fn test_download_exhausted() {
        let temp = TempDir::new().unwrap();
        let (db, fetch) = db(config(&temp), vec![Step::Fail, Step::Hang, Step::Empty]);

        assert_eq!(db.initialize().await, &Resolution::Unresolved);
        assert_eq!(fetch.calls(), 3);
        assert!(!temp.path().join("data").exists());
    }

    #[tokio::test]
    async fn test_archive_without_database() {
        let temp = TempDir::new().unwrap();
        let bytes = zip_fixture(&[("docs/readme", b"no magic")]);
        let (db, _) = db(config(&temp), vec![Step::Body(bytes)]);

        assert_eq!(db.initialize().await, &Resolution::Unresolved);
        assert!(!temp.path().join("data").exists());
    }

    #[tokio::test]
    async fn test_corrupt_archive() {
        let temp = TempDir::new().unwrap();
        let (db, _) = db(config(&temp), vec![Step::Body(b"<html>not found</html>".to_vec())]);

        assert_eq!(db.initialize().await, &Resolution::Unresolved);
    }

    #[tokio::test]
    async fn test_incomplete_single_candidate_is_unresolved() {
        let temp = TempDir::new().unwrap();
        let bytes = zip_fixture(&[("mime/magic", b"m"), ("mime/aliases", b"a")]);
        let (db, _) = db(config(&temp), vec![Step::Body(bytes)]);

        assert_eq!(db.initialize().await, &Resolution::Unresolved);
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_run() {
        let temp = TempDir::new().unwrap();
        let (db, fetch) = db(config(&temp), vec![Step::Fail, Step::Fail, Step::Fail]);

        let (first, second) = tokio::join!(db.initialize(), db.initialize());

        assert!(std::ptr::eq(first, second));
        assert_eq!(first, &Resolution::Unresolved);
        assert_eq!(fetch.calls(), 3);

        assert_eq!(db.initialize().await, &Resolution::Unresolved);
        assert_eq!(fetch.calls(), 3);
    }

    #[test]
    fn test_http_config_follows_resolver_config() {
        let config = MagicDbConfig::from_lookup(|_| None)
            .with_user_agent("magic-test/1.0".to_string())
            .with_attempt_timeout(Duration::from_secs(2));

        let http = http_config(&config);

        assert_eq!(http.user_agent, "magic-test/1.0");
        assert_eq!(http.connect_timeout, Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_get_before_and_after() {
        let temp = TempDir::new().unwrap();
        install(&config(&temp).default_magic_dir);
        let (db, _) = db(config(&temp), vec![]);

        assert!(db.get().is_none());
        db.initialize().await;
        assert!(db.get().is_some_and(Resolution::is_resolved));
    }
}
