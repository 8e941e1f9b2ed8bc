//! Resolution and provisioning of the shared-mime-info magic database.
//!
//! The byte-sniffing engine needs a directory holding the `magic`, `aliases`
//! and `subclasses` files. This crate finds one, in priority order:
//!
//! 1. `TREE_MAGIC_DIR`
//! 2. the per-user default directory (`<data home>/tree_magic_db`)
//! 3. the shared-data roots (`XDG_DATA_DIRS`, `XDG_DATA_HOME`, Homebrew, MSYS2)
//! 4. a fresh download of the database archive, extracted into 1 or 2
//!
//! ```rust,no_run
//! # async fn example() {
//! let resolution = magic_db::initialize().await;
//! if let Some(dir) = resolution.engine_dir() {
//!     println!("magic database at {}", dir.display());
//! }
//! # }
//! ```

pub mod archive;
pub mod config;
pub mod download;
pub mod error;
pub mod http;
pub mod resolver;
pub mod search;
pub mod validate;

#[cfg(test)]
mod testing;

pub use archive::{extract, ArchiveIndex, PathTrie};
pub use config::MagicDbConfig;
pub use download::{Download, Downloader};
pub use error::{MagicDbError, Result};
pub use http::{Fetch, HttpClient, HttpClientConfig, HttpError};
pub use resolver::{initialize, MagicDb, MagicDir, Origin, Resolution, MAGIC_DIR_ENV};
pub use search::{find_shared_dirs, SharedHit};
pub use validate::{is_valid_magic_dir, REQUIRED_FILES};
