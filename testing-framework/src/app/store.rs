// File: testing-framework/src/app/store.rs
//
// In-memory key-value store
//
// A committed layer plus a batch of pending writes. Reads see the pending
// batch first; commit folds the batch into the committed layer and hashes
// the result. Nothing touches the disk.

use blocksim_common::{
    crypto::{hash, Hash},
    AppError,
};
use serde::{de::DeserializeOwned, Serialize};
use std::collections::{btree_map::Entry, BTreeMap};

/// State of a key in the pending batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryState<T> {
    /// Written in the batch
    Stored(T),
    /// Deleted in the batch
    Deleted,
    /// Untouched by the batch; fall back on the committed layer
    Absent,
}

/// Pending writes of one block. `None` marks a deletion.
#[derive(Debug, Clone, Default)]
pub struct Changes {
    writes: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
}

impl Changes {
    pub fn insert(&mut self, key: Vec<u8>, value: Vec<u8>) -> EntryState<Vec<u8>> {
        match self.writes.insert(key, Some(value)) {
            Some(Some(prev)) => EntryState::Stored(prev),
            Some(None) => EntryState::Deleted,
            None => EntryState::Absent,
        }
    }

    pub fn remove(&mut self, key: Vec<u8>) -> EntryState<Vec<u8>> {
        match self.writes.entry(key) {
            Entry::Occupied(mut entry) => match entry.get_mut().take() {
                Some(prev) => EntryState::Stored(prev),
                None => EntryState::Deleted,
            },
            Entry::Vacant(entry) => {
                entry.insert(None);
                EntryState::Absent
            }
        }
    }

    pub fn get(&self, key: &[u8]) -> EntryState<&[u8]> {
        match self.writes.get(key) {
            Some(Some(value)) => EntryState::Stored(value.as_slice()),
            Some(None) => EntryState::Deleted,
            None => EntryState::Absent,
        }
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct MemStore {
    committed: BTreeMap<Vec<u8>, Vec<u8>>,
    changes: Changes,
    version: u64,
    root: Hash,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &[u8]) -> Option<&[u8]> {
        match self.changes.get(key) {
            EntryState::Stored(value) => Some(value),
            EntryState::Deleted => None,
            EntryState::Absent => self.committed.get(key).map(Vec::as_slice),
        }
    }

    /// Value of `key` as of the last commit, ignoring pending writes
    pub fn get_committed(&self, key: &[u8]) -> Option<&[u8]> {
        self.committed.get(key).map(Vec::as_slice)
    }

    pub fn contains(&self, key: &[u8]) -> bool {
        self.get(key).is_some()
    }

    pub fn set(&mut self, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) {
        self.changes.insert(key.into(), value.into());
    }

    pub fn delete(&mut self, key: impl Into<Vec<u8>>) {
        self.changes.remove(key.into());
    }

    pub fn get_json<T: DeserializeOwned>(&self, key: &[u8]) -> Result<Option<T>, AppError> {
        match self.get(key) {
            Some(bytes) => Ok(Some(serde_json::from_slice(bytes)?)),
            None => Ok(None),
        }
    }

    pub fn set_json<T: Serialize>(
        &mut self,
        key: impl Into<Vec<u8>>,
        value: &T,
    ) -> Result<(), AppError> {
        let bytes = serde_json::to_vec(value)?;
        self.set(key, bytes);
        Ok(())
    }

    /// Entries whose key starts with `prefix`, in key order, pending writes
    /// applied.
    pub fn scan_prefix(&self, prefix: &[u8]) -> Vec<(Vec<u8>, Vec<u8>)> {
        let mut merged: BTreeMap<&[u8], &[u8]> = self
            .committed
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.as_slice(), v.as_slice()))
            .collect();

        for (key, value) in self
            .changes
            .writes
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
        {
            match value {
                Some(value) => {
                    merged.insert(key.as_slice(), value.as_slice());
                }
                None => {
                    merged.remove(key.as_slice());
                }
            }
        }

        merged
            .into_iter()
            .map(|(k, v)| (k.to_vec(), v.to_vec()))
            .collect()
    }

    pub fn scan_prefix_json<T: DeserializeOwned>(&self, prefix: &[u8]) -> Result<Vec<T>, AppError> {
        self.scan_prefix(prefix)
            .into_iter()
            .map(|(_, v)| serde_json::from_slice(&v).map_err(AppError::from))
            .collect()
    }

    pub fn has_pending_changes(&self) -> bool {
        !self.changes.is_empty()
    }

    /// Drop every pending write.
    pub fn discard(&mut self) {
        if !self.changes.is_empty() {
            log::debug!("Discarding {} pending write(s)", self.changes.len());
        }
        self.changes = Changes::default();
    }

    /// Apply the pending batch and return the new root hash.
    pub fn commit(&mut self) -> Hash {
        let changes = std::mem::take(&mut self.changes);
        let written = changes.len();
        for (key, value) in changes.writes {
            match value {
                Some(value) => {
                    self.committed.insert(key, value);
                }
                None => {
                    self.committed.remove(&key);
                }
            }
        }
        self.version += 1;
        self.root = root_of(&self.committed);
        log::trace!(
            "Store version {} committed {} write(s), root {}",
            self.version,
            written,
            self.root
        );
        self.root
    }

    pub fn root(&self) -> Hash {
        self.root
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn len(&self) -> usize {
        self.committed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.committed.is_empty()
    }

    /// Root hash the store would have once the pending batch is committed
    pub fn preview_root(&self) -> Hash {
        if self.changes.is_empty() {
            return self.root;
        }
        let mut merged = self.committed.clone();
        for (key, value) in &self.changes.writes {
            match value {
                Some(value) => {
                    merged.insert(key.clone(), value.clone());
                }
                None => {
                    merged.remove(key);
                }
            }
        }
        root_of(&merged)
    }
}

// Length-prefixed key/value pairs in key order
fn root_of(entries: &BTreeMap<Vec<u8>, Vec<u8>>) -> Hash {
    let mut buf = Vec::new();
    for (key, value) in entries {
        buf.extend_from_slice(&(key.len() as u64).to_be_bytes());
        buf.extend_from_slice(key);
        buf.extend_from_slice(&(value.len() as u64).to_be_bytes());
        buf.extend_from_slice(value);
    }
    hash(&buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_writes_shadow_committed() {
        let mut store = MemStore::new();
        store.set(b"a".to_vec(), b"1".to_vec());
        store.commit();

        store.set(b"a".to_vec(), b"2".to_vec());
        assert_eq!(store.get(b"a"), Some(&b"2"[..]));
        assert_eq!(store.get_committed(b"a"), Some(&b"1"[..]));

        store.delete(b"a".to_vec());
        assert_eq!(store.get(b"a"), None);
        assert!(store.has_pending_changes());

        store.discard();
        assert_eq!(store.get(b"a"), Some(&b"1"[..]));
    }

    #[test]
    fn test_commit_root_depends_on_content() {
        let mut a = MemStore::new();
        let mut b = MemStore::new();
        a.set(b"k".to_vec(), b"v".to_vec());
        b.set(b"k".to_vec(), b"v".to_vec());
        assert_eq!(a.commit(), b.commit());

        b.set(b"k".to_vec(), b"w".to_vec());
        let preview = b.preview_root();
        assert_ne!(a.root(), preview);
        assert_eq!(b.commit(), preview);
        assert_eq!(b.version(), 2);
    }

    #[test]
    fn test_scan_prefix_merges_layers() {
        let mut store = MemStore::new();
        store.set(b"bal/1".to_vec(), b"a".to_vec());
        store.set(b"bal/2".to_vec(), b"b".to_vec());
        store.set(b"val/1".to_vec(), b"c".to_vec());
        store.commit();

        store.delete(b"bal/1".to_vec());
        store.set(b"bal/3".to_vec(), b"d".to_vec());

        let keys: Vec<Vec<u8>> = store.scan_prefix(b"bal/").into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec![b"bal/2".to_vec(), b"bal/3".to_vec()]);
    }

    #[test]
    fn test_changes_entry_states() {
        let mut changes = Changes::default();
        assert_eq!(changes.insert(b"k".to_vec(), b"1".to_vec()), EntryState::Absent);
        assert_eq!(
            changes.insert(b"k".to_vec(), b"2".to_vec()),
            EntryState::Stored(b"1".to_vec())
        );
        assert_eq!(changes.remove(b"k".to_vec()), EntryState::Stored(b"2".to_vec()));
        assert_eq!(changes.get(b"k"), EntryState::Deleted);
        assert_eq!(changes.remove(b"x".to_vec()), EntryState::Absent);
    }
}
