//! Prefix trie over slash-delimited archive paths.

use std::collections::BTreeMap;

/// A node in a [`PathTrie`]. Children are kept in name order.
#[derive(Debug)]
pub struct TrieNode<T> {
    value: Option<T>,
    children: BTreeMap<String, TrieNode<T>>,
}

impl<T> TrieNode<T> {
    fn new() -> Self {
        Self {
            value: None,
            children: BTreeMap::new(),
        }
    }

    pub fn value(&self) -> Option<&T> {
        self.value.as_ref()
    }

    /// Names of the direct children
    pub fn child_names(&self) -> impl Iterator<Item = &str> {
        self.children.keys().map(String::as_str)
    }

    fn collect<'a: 'p, 'p>(&'a self, path: &mut Vec<&'p str>, out: &mut Vec<(String, &'a T)>) {
        if let Some(value) = &self.value {
            out.push((path.join("/"), value));
        }
        for (name, child) in &self.children {
            path.push(name);
            child.collect(path, out);
            path.pop();
        }
    }
}

#[derive(Debug)]
pub struct PathTrie<T> {
    root: TrieNode<T>,
    len: usize,
}

impl<T> Default for PathTrie<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> PathTrie<T> {
    pub fn new() -> Self {
        Self {
            root: TrieNode::new(),
            len: 0,
        }
    }

    /// Insert `value` at `path`, replacing any previous value there
    pub fn insert(&mut self, path: &str, value: T) {
        let mut node = &mut self.root;
        for segment in segments(path) {
            node = node
                .children
                .entry(segment.to_string())
                .or_insert_with(TrieNode::new);
        }
        if node.value.replace(value).is_none() {
            self.len += 1;
        }
    }

    /// Node at `prefix`. The empty prefix is the root.
    pub fn node_at(&self, prefix: &str) -> Option<&TrieNode<T>> {
        segments(prefix).try_fold(&self.root, |node, segment| node.children.get(segment))
    }

    /// Names directly under `prefix`, files and directories alike
    pub fn children(&self, prefix: &str) -> Vec<&str> {
        self.node_at(prefix)
            .map(|node| node.child_names().collect())
            .unwrap_or_default()
    }

    /// Every value at or below `prefix`, with its full path, in name order
    pub fn entries_under(&self, prefix: &str) -> Vec<(String, &T)> {
        let mut out = Vec::new();
        if let Some(node) = self.node_at(prefix) {
            let mut path: Vec<&str> = segments(prefix).collect();
            node.collect(&mut path, &mut out);
        }
        out
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}
