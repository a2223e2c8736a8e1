//! Append-only nullifier set.
//!
//! A nullifier marks a spend without linking to the sender. Insertion of
//! an already-present nullifier is the defining double-spend condition;
//! `check_and_insert` is the atomic compare-and-insert every `Funded`
//! transition goes through. Persistence is external; this set tracks the
//! nullifiers observed by one engine instance.

use std::collections::HashSet;
use std::sync::Mutex;

use crate::error::{Error, Result};

#[derive(Debug, Default)]
pub struct NullifierSet {
    inner: Mutex<HashSet<[u8; 32]>>,
}

impl NullifierSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically insert a nullifier, rejecting reuse.
    ///
    /// The set is append-only: there is no removal, and a failed
    /// insertion changes nothing.
    pub fn check_and_insert(&self, nullifier: [u8; 32]) -> Result<()> {
        let mut set = self.inner.lock().expect("nullifier set poisoned");
        if !set.insert(nullifier) {
            tracing::warn!(nullifier = %hex::encode(nullifier), "double-spend rejected");
            return Err(Error::NullifierReuse);
        }
        Ok(())
    }

    pub fn contains(&self, nullifier: &[u8; 32]) -> bool {
        self.inner
            .lock()
            .expect("nullifier set poisoned")
            .contains(nullifier)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("nullifier set poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_then_reuse() {
        let set = NullifierSet::new();
        let n = [7u8; 32];

        set.check_and_insert(n).unwrap();
        assert!(set.contains(&n));
        assert!(matches!(
            set.check_and_insert(n),
            Err(Error::NullifierReuse)
        ));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_distinct_nullifiers_coexist() {
        let set = NullifierSet::new();
        set.check_and_insert([1u8; 32]).unwrap();
        set.check_and_insert([2u8; 32]).unwrap();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_concurrent_insertion_exactly_one_wins() {
        use std::sync::Arc;

        let set = Arc::new(NullifierSet::new());
        let n = [9u8; 32];

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let set = Arc::clone(&set);
                std::thread::spawn(move || set.check_and_insert(n).is_ok())
            })
            .collect();

        let wins: usize = handles
            .into_iter()
            .map(|h| h.join().unwrap() as usize)
            .sum();
        assert_eq!(wins, 1);
        assert_eq!(set.len(), 1);
    }
}
