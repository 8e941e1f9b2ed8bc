//! Downloaded archive handling: indexing, base directory discovery and extraction.

mod extract;
mod index;
mod trie;

pub use extract::extract;
pub use index::ArchiveIndex;
pub use trie::{PathTrie, TrieNode};
