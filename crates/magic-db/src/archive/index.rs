//! Indexing of a downloaded database archive.
//!
//! Release archives nest the database at an arbitrary depth (`mime/`,
//! `share/mime/`, `build-1.2/share/mime/`...). Every directory holding at
//! least one required file is a candidate base directory. A lone candidate is
//! taken as is. Otherwise the first candidate, in path order, whose direct
//! children include all required files wins.

use std::collections::BTreeSet;
use std::io::Cursor;
use std::sync::Arc;

use zip::ZipArchive;

use super::trie::PathTrie;
use crate::validate::REQUIRED_FILES;
use crate::{MagicDbError, Result};

pub(crate) type MemoryArchive = ZipArchive<Cursor<Arc<[u8]>>>;

/// A zip archive held in memory, its file entries indexed by path.
///
/// Trie values are zip entry indices; entries are only decompressed on extraction.
pub struct ArchiveIndex {
    archive: MemoryArchive,
    trie: PathTrie<usize>,
    base_dir: Option<String>,
}

impl ArchiveIndex {
    pub fn new(bytes: Vec<u8>) -> Result<Self> {
        let archive = ZipArchive::new(Cursor::new(Arc::<[u8]>::from(bytes)))?;
        Self::from_archive(archive)
    }

    fn from_archive(mut archive: MemoryArchive) -> Result<Self> {
        let mut trie = PathTrie::new();
        let mut candidates = BTreeSet::new();

        for i in 0..archive.len() {
            let entry = archive.by_index_raw(i)?;
            if entry.is_dir() {
                continue;
            }

            let name = entry.name();
            if entry.enclosed_name().is_none() {
                return Err(MagicDbError::UnsafePath {
                    path: name.to_string(),
                });
            }

            let mut segments: Vec<&str> = name.split('/').filter(|s| !s.is_empty()).collect();
            if segments.pop().is_some_and(|file_name| REQUIRED_FILES.contains(&file_name)) {
                candidates.insert(segments.join("/"));
            }

            trie.insert(name, i);
        }

        log::debug!(
            "Indexed {} archive entries, candidate base directories: {:?}",
            trie.len(),
            candidates
        );

        let base_dir = select_base_dir(&candidates, &trie);
        if base_dir.is_none() {
            log::error!("Cannot find valid magic files in downloaded archive.");
        }

        Ok(Self {
            archive,
            trie,
            base_dir,
        })
    }

    /// Archive path of the database directory, without trailing slash.
    /// The empty string is the archive root.
    pub fn base_dir(&self) -> Option<&str> {
        self.base_dir.as_deref()
    }

    pub fn trie(&self) -> &PathTrie<usize> {
        &self.trie
    }

    pub(crate) fn archive(&self) -> &MemoryArchive {
        &self.archive
    }
}

fn select_base_dir(candidates: &BTreeSet<String>, trie: &PathTrie<usize>) -> Option<String> {
    if candidates.len() == 1 {
        return candidates.first().cloned();
    }

    candidates
        .iter()
        .find(|base| {
            let children = trie.children(base);
            REQUIRED_FILES.iter().all(|name| children.contains(name))
        })
        .cloned()
}
