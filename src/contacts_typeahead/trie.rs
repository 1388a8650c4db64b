use std::collections::BTreeMap;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("record is missing a display name")]
    MissingName,
    #[error("record display name is not a string")]
    InvalidKeyType,
}

pub trait NamedRecord {
    fn display_name(&self) -> Result<&str, ValidationError>;
}

// Lowercasing is the single normalization applied to keys; insert and
// lookup must agree on it or prefix matches silently fail.
pub fn normalize(name: &str) -> String {
    name.chars().flat_map(char::to_lowercase).collect()
}

#[derive(Debug)]
pub struct TrieNode<T> {
    children: BTreeMap<char, TrieNode<T>>,
    terminal: bool,
    payloads: Vec<T>,
}

impl<T> Default for TrieNode<T> {
    fn default() -> Self {
        TrieNode {
            children: BTreeMap::new(),
            terminal: false,
            payloads: Vec::new(),
        }
    }
}

impl<T> TrieNode<T> {
    pub fn is_terminal(&self) -> bool {
        self.terminal
    }

    pub fn records(&self) -> &[T] {
        &self.payloads
    }
}

#[derive(Debug)]
pub struct Trie<T> {
    root: TrieNode<T>,
    len: usize,
}

#[derive(Debug)]
pub struct BatchOutcome<T> {
    pub inserted: usize,
    pub rejected: Vec<(T, ValidationError)>,
}

impl<T> Trie<T> {
    pub fn new() -> Self {
        Trie {
            root: TrieNode::default(),
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn contains_exact(&self, name: &str) -> bool {
        self.node_for_prefix(name)
            .map_or(false, |node| node.is_terminal())
    }

    pub fn node_for_prefix(&self, prefix: &str) -> Option<&TrieNode<T>> {
        let mut node = &self.root;
        for ch in normalize(prefix).chars() {
            node = node.children.get(&ch)?;
        }
        Some(node)
    }

    pub fn find_with_prefix(&self, prefix: &str) -> Vec<&T> {
        let start = match self.node_for_prefix(prefix) {
            Some(node) => node,
            None => return Vec::new(),
        };

        // Explicit stack instead of recursion. Children are pushed in
        // reverse so the smallest character is expanded first, which keeps
        // results in ascending key order.
        let mut matches = Vec::new();
        let mut stack = vec![start];
        while let Some(node) = stack.pop() {
            if node.is_terminal() {
                matches.extend(node.records());
            }
            for child in node.children.values().rev() {
                stack.push(child);
            }
        }
        matches
    }

    fn insert_under_key(&mut self, key: &str, record: T) {
        let mut node = &mut self.root;
        for ch in key.chars() {
            node = node.children.entry(ch).or_default();
        }
        node.terminal = true;
        node.payloads.push(record);
        self.len += 1;
    }
}

impl<T: NamedRecord> Trie<T> {
    pub fn insert(&mut self, record: T) -> Result<(), ValidationError> {
        let key = normalize(record.display_name()?);
        self.insert_under_key(&key, record);
        Ok(())
    }

    pub fn batch_insert<I>(&mut self, records: I) -> BatchOutcome<T>
    where
        I: IntoIterator<Item = T>,
    {
        let mut outcome = BatchOutcome {
            inserted: 0,
            rejected: Vec::new(),
        };
        for record in records {
            match record.display_name() {
                Ok(name) => {
                    let key = normalize(name);
                    self.insert_under_key(&key, record);
                    outcome.inserted += 1;
                }
                Err(e) => outcome.rejected.push((record, e)),
            }
        }
        outcome
    }
}

impl<T> Default for Trie<T> {
    fn default() -> Self {
        Self::new()
    }
}
