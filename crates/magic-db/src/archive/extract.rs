//! Extraction of the database directory out of an indexed archive.

use std::fs::File;
use std::path::{Path, PathBuf};

use tokio::task::JoinSet;

use super::index::{ArchiveIndex, MemoryArchive};
use crate::{MagicDbError, Result};

/// Copy every file under the archive's base directory into `dest_dir`,
/// keeping paths relative to the base directory.
///
/// At most `concurrency` copies are in flight. The first failed copy aborts
/// the ones still running and is returned; files already written are left in
/// place. Returns the number of files written.
pub async fn extract(index: &ArchiveIndex, dest_dir: &Path, concurrency: usize) -> Result<usize> {
    let base_dir = index.base_dir().ok_or(MagicDbError::MissingBaseDir)?;
    let concurrency = concurrency.max(1);

    let mut pending = index
        .trie()
        .entries_under(base_dir)
        .into_iter()
        .map(|(path, &entry)| (entry, rebase(&path, base_dir, dest_dir)));

    tokio::fs::create_dir_all(dest_dir).await?;

    let mut tasks = JoinSet::new();
    let mut written = 0;

    loop {
        while tasks.len() < concurrency {
            let Some((entry, target)) = pending.next() else {
                break;
            };
            tasks.spawn(copy_entry(index.archive().clone(), entry, target));
        }

        let Some(joined) = tasks.join_next().await else {
            break;
        };

        if let Err(e) = joined.map_err(MagicDbError::from).and_then(|copied| copied) {
            tasks.abort_all();
            return Err(e);
        }
        written += 1;
    }

    log::debug!("Extracted {} files to {}", written, dest_dir.display());
    Ok(written)
}

/// Destination of archive `path` once `base_dir` is replaced by `dest_dir`.
///
/// Both are compared segment by segment, so `data//mime` and `data/mime/` match.
fn rebase(path: &str, base_dir: &str, dest_dir: &Path) -> PathBuf {
    let mut segments = path.split('/').filter(|s| !s.is_empty()).peekable();
    for base_segment in base_dir.split('/').filter(|s| !s.is_empty()) {
        if segments.next_if_eq(&base_segment).is_none() {
            break;
        }
    }
    segments.fold(dest_dir.to_path_buf(), |acc, segment| acc.join(segment))
}

async fn copy_entry(archive: MemoryArchive, entry: usize, target: PathBuf) -> Result<()> {
    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    tokio::task::spawn_blocking(move || -> Result<()> {
        let mut archive = archive;
        let mut file = archive.by_index(entry)?;
        let mut outfile = File::create(&target)?;
        std::io::copy(&mut file, &mut outfile)?;
        Ok(())
    })
    .await?
}
