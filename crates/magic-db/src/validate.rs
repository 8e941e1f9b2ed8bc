//! Magic database directory validation.

use std::path::Path;

use futures_util::future::join_all;

/// Files that must all be readable for a directory to count as a magic database
pub const REQUIRED_FILES: [&str; 3] = ["magic", "aliases", "subclasses"];

/// Check that `dir` holds every required file with read access.
///
/// A missing directory, a missing file, or a file that cannot be opened for
/// reading all yield `false`.
pub async fn is_valid_magic_dir(dir: &Path) -> bool {
    let checks = REQUIRED_FILES.iter().map(|name| {
        let path = dir.join(name);
        async move {
            match tokio::fs::File::open(&path).await {
                Ok(_) => true,
                Err(e) => {
                    log::trace!("{} is not readable: {}", path.display(), e);
                    false
                }
            }
        }
    });

    join_all(checks).await.into_iter().all(|readable| readable)
}
