//! Per-asset lock table.
//!
//! Operations claim every asset they touch in one step: either all of them
//! are free and get marked held, or the caller waits. Claiming a whole set at
//! once means there is no lock ordering to get wrong, and operations on
//! disjoint assets never wait on each other.

use nftswap_core::AssetId;
use smallvec::SmallVec;
use std::collections::HashSet;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

/// Assets claimed by one operation. Trades name two.
pub type AssetSet = SmallVec<[AssetId; 2]>;

#[derive(Debug, Default)]
pub struct AssetLocks {
    held: Mutex<HashSet<AssetId>>,
    released: Condvar,
}

impl AssetLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Blocks until none of `assets` is held, then claims all of them.
    pub fn acquire(&self, assets: &[AssetId]) -> AssetGuard<'_> {
        let wanted = normalize(assets);
        let mut held = self.held();
        while wanted.iter().any(|a| held.contains(a)) {
            tracing::trace!(assets = ?wanted, "waiting for asset locks");
            held = self
                .released
                .wait(held)
                .unwrap_or_else(PoisonError::into_inner);
        }
        held.extend(wanted.iter().copied());
        AssetGuard {
            locks: self,
            assets: wanted,
        }
    }

    fn held(&self) -> MutexGuard<'_, HashSet<AssetId>> {
        self.held.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Sorted, deduplicated copy of the requested set.
fn normalize(assets: &[AssetId]) -> AssetSet {
    let mut set: AssetSet = assets.iter().copied().collect();
    set.sort_unstable();
    set.dedup();
    set
}

/// Releases its assets on drop and wakes every waiter.
#[derive(Debug)]
pub struct AssetGuard<'a> {
    locks: &'a AssetLocks,
    assets: AssetSet,
}

impl Drop for AssetGuard<'_> {
    fn drop(&mut self) {
        let mut held = self.locks.held();
        for asset in &self.assets {
            held.remove(asset);
        }
        drop(held);
        self.locks.released.notify_all();
    }
}

#[cfg(test)]
impl AssetLocks {
    fn try_acquire(&self, assets: &[AssetId]) -> Option<AssetGuard<'_>> {
        let wanted = normalize(assets);
        let mut held = self.held();
        if wanted.iter().any(|a| held.contains(a)) {
            return None;
        }
        held.extend(wanted.iter().copied());
        Some(AssetGuard {
            locks: self,
            assets: wanted,
        })
    }

    fn is_held(&self, asset: &AssetId) -> bool {
        self.held().contains(asset)
    }

    fn held_count(&self) -> usize {
        self.held().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::U256;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn ids(xs: &[u64]) -> Vec<AssetId> {
        xs.iter().map(|x| U256::from(*x)).collect()
    }

    #[test]
    fn guard_releases_on_drop() {
        let locks = AssetLocks::new();
        {
            let guard = locks.acquire(&ids(&[3, 1]));
            assert_eq!(&guard.assets[..], &ids(&[1, 3])[..]);
            assert_eq!(locks.held_count(), 2);
            assert!(locks.is_held(&U256::from(1)));
        }
        assert_eq!(locks.held_count(), 0);
    }

    #[test]
    fn duplicate_assets_claim_once() {
        let locks = AssetLocks::new();
        let guard = locks.acquire(&ids(&[4, 4]));
        assert_eq!(guard.assets.len(), 1);
        drop(guard);
        assert_eq!(locks.held_count(), 0);
    }

    #[test]
    fn overlapping_sets_exclude_disjoint_sets_do_not() {
        let locks = AssetLocks::new();
        let _a = locks.acquire(&ids(&[0, 1]));
        assert!(locks.try_acquire(&ids(&[1, 2])).is_none());
        assert!(locks.try_acquire(&ids(&[2, 3])).is_some());
    }

    #[test]
    fn waiter_wakes_after_release() {
        let locks = Arc::new(AssetLocks::new());
        let entered = Arc::new(AtomicBool::new(false));

        let guard = locks.acquire(&ids(&[7]));
        let handle = {
            let locks = Arc::clone(&locks);
            let entered = Arc::clone(&entered);
            std::thread::spawn(move || {
                let _g = locks.acquire(&ids(&[7, 8]));
                entered.store(true, Ordering::SeqCst);
            })
        };

        std::thread::sleep(Duration::from_millis(50));
        assert!(!entered.load(Ordering::SeqCst));

        drop(guard);
        handle.join().unwrap();
        assert!(entered.load(Ordering::SeqCst));
        assert_eq!(locks.held_count(), 0);
    }
}
