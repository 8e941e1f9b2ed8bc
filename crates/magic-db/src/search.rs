//! Shared-data search for an installed shared-mime-info database.

use std::path::{Path, PathBuf};

use futures_util::future::join_all;

use crate::validate::is_valid_magic_dir;

/// Database subdirectory under every shared-data root
pub const MIME_SUBDIR: &str = "mime";

/// An installed database found under a shared-data root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedHit {
    pub root: PathBuf,
    pub dir: PathBuf,
}

/// Check `<root>/mime` for every root, keeping root order in the result
pub async fn find_shared_dirs(roots: &[PathBuf]) -> Vec<SharedHit> {
    let checks = roots.iter().map(|root| check_root(root));

    join_all(checks).await.into_iter().flatten().collect()
}

async fn check_root(root: &Path) -> Option<SharedHit> {
    let dir = root.join(MIME_SUBDIR);
    if is_valid_magic_dir(&dir).await {
        Some(SharedHit {
            root: root.to_path_buf(),
            dir,
        })
    } else {
        None
    }
}
