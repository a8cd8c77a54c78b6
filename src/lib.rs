//! A thread-safe bidirectional hashmap.
//!
//! Keeps a left-to-right and a right-to-left index behind a single
//! reader/writer lock, so either key of a pair can be resolved to its
//! counterpart in constant time from any thread.

use std::collections::hash_map::RandomState;
use std::collections::HashMap;
use std::hash::{BuildHasher, Hash};

use itertools::Itertools;
use log::trace;
use parking_lot::RwLock;
use thiserror::Error;

#[derive(Error, Debug, Copy, Clone, Eq, PartialEq)]
pub enum BiMapError {
    #[error("left key not found in left-to-right index")]
    LeftNotFound,
    #[error("right key not found in right-to-left index")]
    RightNotFound,
    #[error("duplicate left key in input pairs")]
    DuplicateLeft,
    #[error("duplicate right key in input pairs")]
    DuplicateRight,
}

struct BiHashMapInner<Left, Right, SL, SR> {
    left_to_right: HashMap<Left, Right, SL>,
    right_to_left: HashMap<Right, Left, SR>,
}

impl<Left: Clone + Hash + Eq, Right: Clone + Hash + Eq, SL: BuildHasher, SR: BuildHasher> BiHashMapInner<Left, Right, SL, SR> {
    fn len(&self) -> usize {
        assert_eq!(self.left_to_right.len(), self.right_to_left.len());
        self.left_to_right.len()
    }

    fn try_insert(&mut self, left: Left, right: Right) -> bool {
        if self.left_to_right.contains_key(&left) || self.right_to_left.contains_key(&right) {
            return false;
        }
        assert!(self.left_to_right.insert(left.clone(), right.clone()).is_none());
        assert!(self.right_to_left.insert(right, left).is_none());
        true
    }

    fn remove_by_left(&mut self, left: &Left) -> Option<Right> {
        let right = self.left_to_right.remove(left)?;
        assert!(self.right_to_left.remove(&right).is_some());
        Some(right)
    }

    fn remove_by_right(&mut self, right: &Right) -> Option<Left> {
        let left = self.right_to_left.remove(right)?;
        assert!(self.left_to_right.remove(&left).is_some());
        Some(left)
    }

    fn clear(&mut self) {
        self.left_to_right.clear();
        self.right_to_left.clear();
    }
}

/// A bidirectional map between two unique key spaces, shareable across
/// threads. Both indices live behind one `RwLock` and are only ever mutated
/// together, so they cannot disagree about which pairs exist.
///
/// The lock is not reentrant. Lookups clone values out of the indices rather
/// than handing out references, so no borrow can outlive a lock acquisition.
pub struct SyncBiHashMap<Left, Right, SL = RandomState, SR = RandomState> {
    inner: RwLock<BiHashMapInner<Left, Right, SL, SR>>,
}

impl<Left: Clone + Hash + Eq, Right: Clone + Hash + Eq> SyncBiHashMap<Left, Right> {
    pub fn new() -> Self {
        Self::with_hashers(RandomState::new(), RandomState::new())
    }

    /// Builds a map from arbitrary pairs, constructing the reverse index as it
    /// goes. Input repeating a key on either side yields an error rather than
    /// an index silently missing entries.
    pub fn try_from_pairs(pairs: impl IntoIterator<Item = (Left, Right)>) -> Result<Self, BiMapError> {
        let mut inner = BiHashMapInner {
            left_to_right: HashMap::new(),
            right_to_left: HashMap::new(),
        };
        for (left, right) in pairs {
            if inner.left_to_right.contains_key(&left) {
                return Err(BiMapError::DuplicateLeft);
            }
            if inner.right_to_left.contains_key(&right) {
                return Err(BiMapError::DuplicateRight);
            }
            inner.left_to_right.insert(left.clone(), right.clone());
            inner.right_to_left.insert(right, left);
        }
        Ok(Self { inner: RwLock::new(inner) })
    }
}

impl<Left: Clone + Hash + Eq, Right: Clone + Hash + Eq> Default for SyncBiHashMap<Left, Right> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Left: Clone + Hash + Eq, Right: Clone + Hash + Eq, SL: BuildHasher, SR: BuildHasher> SyncBiHashMap<Left, Right, SL, SR> {
    /// Hasher state decides key equality per side, as with
    /// `HashMap::with_hasher`.
    pub fn with_hashers(left_hasher: SL, right_hasher: SR) -> Self {
        Self {
            inner: RwLock::new(BiHashMapInner {
                left_to_right: HashMap::with_hasher(left_hasher),
                right_to_left: HashMap::with_hasher(right_hasher),
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Inserts the pair unless either key is already present, in which case
    /// nothing changes on either side and false is returned.
    pub fn try_insert(&self, left: Left, right: Right) -> bool {
        let inserted = self.inner.write().try_insert(left, right);
        if !inserted {
            trace!("insert rejected, key already present on one side");
        }
        inserted
    }

    /// Removes the pair holding this left key, returning its right
    /// counterpart.
    pub fn remove_by_left(&self, left: &Left) -> Option<Right> {
        self.inner.write().remove_by_left(left)
    }

    /// Removes the pair holding this right key, returning its left
    /// counterpart.
    pub fn remove_by_right(&self, right: &Right) -> Option<Left> {
        self.inner.write().remove_by_right(right)
    }

    pub fn clear(&self) {
        let mut guard = self.inner.write();
        let evicted = guard.len();
        guard.clear();
        trace!("cleared {} pairs", evicted);
    }

    pub fn contains_left(&self, left: &Left) -> bool {
        self.inner.read().left_to_right.contains_key(left)
    }

    pub fn contains_right(&self, right: &Right) -> bool {
        self.inner.read().right_to_left.contains_key(right)
    }

    pub fn get_by_left(&self, left: &Left) -> Result<Right, BiMapError> {
        self.try_get_by_left(left).ok_or(BiMapError::LeftNotFound)
    }

    pub fn get_by_right(&self, right: &Right) -> Result<Left, BiMapError> {
        self.try_get_by_right(right).ok_or(BiMapError::RightNotFound)
    }

    pub fn try_get_by_left(&self, left: &Left) -> Option<Right> {
        self.inner.read().left_to_right.get(left).cloned()
    }

    pub fn try_get_by_right(&self, right: &Right) -> Option<Left> {
        self.inner.read().right_to_left.get(right).cloned()
    }

    /// Point-in-time copy of the left-to-right index. Later mutations of the
    /// map are not visible through an already-taken snapshot.
    pub fn snapshot_left_to_right(&self) -> Vec<(Left, Right)> {
        let guard = self.inner.read();
        guard.left_to_right.iter().map(|(left, right)| (left.clone(), right.clone())).collect_vec()
    }

    /// Point-in-time copy of the right-to-left index.
    pub fn snapshot_right_to_left(&self) -> Vec<(Right, Left)> {
        let guard = self.inner.read();
        guard.right_to_left.iter().map(|(right, left)| (right.clone(), left.clone())).collect_vec()
    }
}

#[cfg(test)]
pub mod test {
    use crate::{BiMapError, SyncBiHashMap};

    static_assertions::assert_impl_all!(SyncBiHashMap<u64, String>: Send, Sync);

    fn assert_mirrored(map: &SyncBiHashMap<u32, String>, expected: &[(u32, &str)]) {
        assert_eq!(map.len(), expected.len());
        for (left, right) in expected {
            assert_eq!(map.get_by_left(left).unwrap(), *right);
            assert_eq!(map.get_by_right(&right.to_string()).unwrap(), *left);
        }
    }

    #[test]
    pub fn bijection_holds_after_mixed_operations() {
        let map = SyncBiHashMap::new();
        assert!(map.try_insert(1, "one".to_string()));
        assert!(map.try_insert(2, "two".to_string()));
        assert!(map.try_insert(3, "three".to_string()));
        assert_mirrored(&map, &[(1, "one"), (2, "two"), (3, "three")]);

        assert_eq!(map.remove_by_left(&2), Some("two".to_string()));
        assert_mirrored(&map, &[(1, "one"), (3, "three")]);

        assert_eq!(map.remove_by_right(&"three".to_string()), Some(3));
        assert_mirrored(&map, &[(1, "one")]);

        assert!(map.try_insert(2, "two".to_string()));
        assert_mirrored(&map, &[(1, "one"), (2, "two")]);

        map.clear();
        assert_mirrored(&map, &[]);
        assert!(map.is_empty());
    }

    #[test]
    pub fn rejected_insert_leaves_no_orphan_on_either_side() {
        let map = SyncBiHashMap::new();
        assert!(map.try_insert(1, "one".to_string()));

        assert!(!map.try_insert(1, "uno".to_string()));
        assert!(!map.contains_right(&"uno".to_string()));
        assert_mirrored(&map, &[(1, "one")]);

        assert!(!map.try_insert(2, "one".to_string()));
        assert!(!map.contains_left(&2));
        assert_mirrored(&map, &[(1, "one")]);
    }

    #[test]
    pub fn try_from_pairs_builds_mirrored_indices() {
        let map = SyncBiHashMap::try_from_pairs(vec![(1, "one".to_string()), (2, "two".to_string())]).unwrap();
        assert_mirrored(&map, &[(1, "one"), (2, "two")]);
    }

    #[test]
    pub fn try_from_pairs_rejects_duplicate_left() {
        let result = SyncBiHashMap::try_from_pairs(vec![(1, "one".to_string()), (1, "uno".to_string())]);
        assert_eq!(result.err().unwrap(), BiMapError::DuplicateLeft);
    }

    #[test]
    pub fn try_from_pairs_rejects_duplicate_right() {
        let result = SyncBiHashMap::try_from_pairs(vec![(1, "one".to_string()), (2, "one".to_string())]);
        assert_eq!(result.err().unwrap(), BiMapError::DuplicateRight);
    }
}
