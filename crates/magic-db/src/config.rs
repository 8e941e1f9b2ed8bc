//! Configuration for magic database resolution.
//!
//! All values come from environment variables, read once at construction:
//!
//! - `TREE_MAGIC_DIR`: explicit database directory, checked first and used as
//!   the extraction target when a download is needed
//! - `TREE_MAGIC_URL`: archive URL for the download fallback
//! - `XDG_DATA_HOME`: per-user data root (also the base of the default directory)
//! - `XDG_DATA_DIRS`: shared data roots, delimited like `PATH`
//! - `HOME`: used to derive the per-user data root when `XDG_DATA_HOME` is unset
//!   (`APPDATA` first on Windows); the running user's platform directory is
//!   only consulted when neither is supplied
//!
//! Tests build configs through [`MagicDbConfig::from_lookup`] so the process
//! environment is never touched.

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_DOWNLOAD_URL: &str =
    "https://github.com/hechang27-sprt/build-shared-mime-info/releases/download/db-20251031/mime-database.zip";

/// Subfolder of the data home holding a downloaded database
pub const DEFAULT_DIR_NAME: &str = "tree_magic_db";

const DEFAULT_DATA_DIRS: &str = "/usr/local/share/:/usr/share/";
const MACOS_DATA_DIR: &str = "/opt/homebrew/share/";
const MINGW_DATA_DIR: &str = r"C:\msys64\mingw64";

const DEFAULT_USER_AGENT: &str = concat!("magic-db/", env!("CARGO_PKG_VERSION"));
const DEFAULT_DOWNLOAD_ATTEMPTS: u32 = 3;
const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_EXTRACT_CONCURRENCY: usize = 8;

#[derive(Debug, Clone)]
pub struct MagicDbConfig {
    pub magic_dir_override: Option<PathBuf>,
    pub default_magic_dir: PathBuf,
    pub download_url: String,
    /// Shared data roots in priority order; `mime` is appended before validation
    pub search_roots: Vec<PathBuf>,
    pub download_attempts: u32,
    pub attempt_timeout: Duration,
    pub extract_concurrency: usize,
    pub user_agent: String,
}

impl MagicDbConfig {
    /// Build configuration from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|s| !s.is_empty());

        let data_home = var("XDG_DATA_HOME").map(PathBuf::from);
        let home = var("HOME").map(PathBuf::from);

        let default_magic_dir = data_home
            .clone()
            .or_else(|| home_data_dir(home.as_deref(), &var))
            .or_else(platform_data_dir)
            .unwrap_or_default()
            .join(DEFAULT_DIR_NAME);

        let data_dirs = var("XDG_DATA_DIRS").unwrap_or_else(|| DEFAULT_DATA_DIRS.to_string());
        let mut search_roots: Vec<PathBuf> = env::split_paths(&data_dirs)
            .filter(|p| !p.as_os_str().is_empty())
            .collect();

        if let Some(user_data) = data_home.or_else(|| home.map(|h| h.join(".local").join("share"))) {
            search_roots.push(user_data);
        }
        search_roots.push(PathBuf::from(MACOS_DATA_DIR));
        search_roots.push(PathBuf::from(MINGW_DATA_DIR));

        Self {
            magic_dir_override: var("TREE_MAGIC_DIR").map(PathBuf::from),
            default_magic_dir,
            download_url: var("TREE_MAGIC_URL").unwrap_or_else(|| DEFAULT_DOWNLOAD_URL.to_string()),
            search_roots,
            download_attempts: DEFAULT_DOWNLOAD_ATTEMPTS,
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
            extract_concurrency: DEFAULT_EXTRACT_CONCURRENCY,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }

    pub fn with_magic_dir_override(mut self, dir: PathBuf) -> Self {
        self.magic_dir_override = Some(dir);
        self
    }

    pub fn with_default_magic_dir(mut self, dir: PathBuf) -> Self {
        self.default_magic_dir = dir;
        self
    }

    pub fn with_download_url(mut self, url: String) -> Self {
        self.download_url = url;
        self
    }

    pub fn with_search_roots(mut self, roots: Vec<PathBuf>) -> Self {
        self.search_roots = roots;
        self
    }

    pub fn with_download_attempts(mut self, attempts: u32) -> Self {
        self.download_attempts = attempts;
        self
    }

    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    pub fn with_extract_concurrency(mut self, concurrency: usize) -> Self {
        self.extract_concurrency = concurrency.max(1);
        self
    }

    pub fn with_user_agent(mut self, user_agent: String) -> Self {
        self.user_agent = user_agent;
        self
    }

    /// Where a downloaded archive is unpacked
    pub fn extraction_dir(&self) -> &Path {
        self.magic_dir_override
            .as_deref()
            .unwrap_or(&self.default_magic_dir)
    }

    /// Whether `root` is the MSYS2 toolchain share root.
    ///
    /// The engine does not search this root on its own, so a database found
    /// there has to be handed over explicitly.
    pub fn is_toolchain_root(root: &Path) -> bool {
        root == Path::new(MINGW_DATA_DIR)
    }
}

impl Default for MagicDbConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Per-user data root derived from the supplied `HOME` (`APPDATA` on Windows)
fn home_data_dir<F>(home: Option<&Path>, var: &F) -> Option<PathBuf>
where
    F: Fn(&str) -> Option<String>,
{
    if cfg!(target_os = "macos") {
        home.map(|h| h.join("Library").join("Application Support"))
    } else if cfg!(windows) {
        var("APPDATA")
            .map(PathBuf::from)
            .or_else(|| home.map(|h| h.join("AppData").join("Roaming")))
    } else {
        home.map(|h| h.join(".local").join("share"))
    }
}

/// Platform data directory of the running user, when no `HOME` was supplied
fn platform_data_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|dirs| dirs.data_dir().to_path_buf())
}
