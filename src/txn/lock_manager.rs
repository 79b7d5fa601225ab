//! Row-granularity lock manager implementing two-phase locking.
//!
//! The lock manager is the single arbiter of cross-transaction ordering:
//! no row store write happens without a prior exclusive grant for that row.
//! Deadlocks are prevented with the **wait-die** policy: on conflict, an
//! older transaction (smaller [`TxnId`]) waits for the holders; a younger
//! transaction is refused immediately and must abort. Because a younger
//! transaction never waits for an older one, the waits-for relation is
//! acyclic and no deadlock can form.
//!
//! Every grant and release is mirrored into the owning [`Transaction`]'s
//! held-lock sets, so operators can ask `is_shared_locked` /
//! `is_exclusive_locked` without consulting the lock table.

use std::collections::{HashMap, HashSet};

use parking_lot::{Condvar, Mutex};
use tracing::{debug, trace};

use crate::types::{RowId, TxnId};

use super::transaction::{IsolationLevel, Transaction, TransactionState};

/// The minimal locking capability the execution layer depends on.
///
/// Operators receive this as a trait object through the execution context,
/// so tests can substitute a recording fake and assert on the lock protocol
/// (e.g., that every store write is preceded by an exclusive grant).
///
/// All methods return `false` to refuse a request; for the acquisition
/// methods a refusal is a deadlock-abort signal and the transaction must
/// not proceed.
pub trait RowLockManager: Send + Sync {
    /// Acquires a shared lock on `rid` for `txn`.
    fn lock_shared(&self, txn: &Transaction, rid: RowId) -> bool;

    /// Acquires an exclusive lock on `rid` for `txn`.
    fn lock_exclusive(&self, txn: &Transaction, rid: RowId) -> bool;

    /// Upgrades `txn`'s shared lock on `rid` to exclusive.
    fn lock_upgrade(&self, txn: &Transaction, rid: RowId) -> bool;

    /// Releases `txn`'s lock on `rid`. Returns `false` if the lock was not
    /// held — an invalid lock state the caller should surface.
    fn unlock(&self, txn: &Transaction, rid: RowId) -> bool;

    /// Releases every lock held by `txn` (commit/abort shrink phase).
    fn unlock_all(&self, txn: &Transaction);
}

/// The holders of one row's lock.
#[derive(Debug, Default)]
struct LockState {
    /// Transactions holding the lock in shared mode.
    sharers: HashSet<TxnId>,
    /// The transaction holding the lock in exclusive mode, if any.
    exclusive: Option<TxnId>,
    /// A sharer waiting to upgrade; at most one at a time.
    upgrading: Option<TxnId>,
}

impl LockState {
    fn is_free(&self) -> bool {
        self.sharers.is_empty() && self.exclusive.is_none() && self.upgrading.is_none()
    }

    /// Ids of every transaction other than `txn` currently holding the lock.
    fn other_holders(&self, txn: TxnId) -> Vec<TxnId> {
        let mut holders: Vec<TxnId> =
            self.sharers.iter().copied().filter(|&t| t != txn).collect();
        if let Some(x) = self.exclusive {
            if x != txn {
                holders.push(x);
            }
        }
        holders
    }
}

/// Blocking row lock table with wait-die conflict resolution.
#[derive(Debug, Default)]
pub struct LockManager {
    /// Lock state per row; entries are removed when free.
    table: Mutex<HashMap<RowId, LockState>>,
    /// Signalled whenever a lock is released.
    released: Condvar,
}

impl LockManager {
    /// Creates an empty lock manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait-die admission: `true` means wait for the holders, `false`
    /// means the requester must die.
    fn may_wait(requester: TxnId, holders: &[TxnId]) -> bool {
        holders.iter().all(|&h| requester < h)
    }

    /// Acquisition is only legal during the growing phase.
    fn can_acquire(txn: &Transaction) -> bool {
        txn.state() == TransactionState::Growing
    }
}

impl RowLockManager for LockManager {
    fn lock_shared(&self, txn: &Transaction, rid: RowId) -> bool {
        if txn.isolation() == IsolationLevel::ReadUncommitted || !Self::can_acquire(txn) {
            return false;
        }
        if txn.is_shared_locked(rid) || txn.is_exclusive_locked(rid) {
            return true;
        }

        let mut table = self.table.lock();
        loop {
            let state = table.entry(rid).or_default();
            // Shared is compatible with shared; only an exclusive holder
            // or a pending upgrade blocks.
            let blockers: Vec<TxnId> = state
                .exclusive
                .into_iter()
                .chain(state.upgrading)
                .filter(|&t| t != txn.id())
                .collect();
            if blockers.is_empty() {
                state.sharers.insert(txn.id());
                txn.add_shared(rid);
                trace!(txn = %txn.id(), %rid, "shared lock granted");
                return true;
            }
            if !Self::may_wait(txn.id(), &blockers) {
                debug!(txn = %txn.id(), %rid, "shared lock refused (wait-die)");
                return false;
            }
            self.released.wait(&mut table);
        }
    }

    fn lock_exclusive(&self, txn: &Transaction, rid: RowId) -> bool {
        if !Self::can_acquire(txn) {
            return false;
        }
        if txn.is_exclusive_locked(rid) {
            return true;
        }
        if txn.is_shared_locked(rid) {
            // Holding shared requires the upgrade path; granting exclusive
            // here would leave the sharer entry dangling.
            return false;
        }

        let mut table = self.table.lock();
        loop {
            let state = table.entry(rid).or_default();
            let holders = state.other_holders(txn.id());
            if holders.is_empty() && state.upgrading.is_none() {
                state.exclusive = Some(txn.id());
                txn.add_exclusive(rid);
                trace!(txn = %txn.id(), %rid, "exclusive lock granted");
                return true;
            }
            if !Self::may_wait(txn.id(), &holders) {
                debug!(txn = %txn.id(), %rid, "exclusive lock refused (wait-die)");
                return false;
            }
            self.released.wait(&mut table);
        }
    }

    fn lock_upgrade(&self, txn: &Transaction, rid: RowId) -> bool {
        if !Self::can_acquire(txn) || !txn.is_shared_locked(rid) {
            return false;
        }

        let mut table = self.table.lock();
        {
            let state = table.entry(rid).or_default();
            if state.upgrading.is_some() {
                // Two pending upgrades on the same row would deadlock each
                // other; refuse the second.
                debug!(txn = %txn.id(), %rid, "upgrade refused (upgrade pending)");
                return false;
            }
            state.upgrading = Some(txn.id());
        }

        loop {
            let state = table.entry(rid).or_default();
            let others = state.other_holders(txn.id());
            if others.is_empty() {
                state.sharers.remove(&txn.id());
                state.exclusive = Some(txn.id());
                state.upgrading = None;
                txn.remove_shared(rid);
                txn.add_exclusive(rid);
                trace!(txn = %txn.id(), %rid, "lock upgraded to exclusive");
                return true;
            }
            if !Self::may_wait(txn.id(), &others) {
                state.upgrading = None;
                debug!(txn = %txn.id(), %rid, "upgrade refused (wait-die)");
                return false;
            }
            self.released.wait(&mut table);
        }
    }

    fn unlock(&self, txn: &Transaction, rid: RowId) -> bool {
        let mut table = self.table.lock();
        let Some(state) = table.get_mut(&rid) else {
            return false;
        };

        let held_shared = state.sharers.remove(&txn.id());
        let held_exclusive = state.exclusive == Some(txn.id());
        if held_exclusive {
            state.exclusive = None;
        }
        if !held_shared && !held_exclusive {
            return false;
        }
        if state.is_free() {
            table.remove(&rid);
        }
        drop(table);
        self.released.notify_all();

        if held_shared {
            txn.remove_shared(rid);
        }
        if held_exclusive {
            txn.remove_exclusive(rid);
        }

        // Under the strictest level any release ends the growing phase.
        // Weaker levels release early by contract, without shrinking.
        if txn.isolation() == IsolationLevel::RepeatableRead
            && txn.state() == TransactionState::Growing
        {
            txn.set_state(TransactionState::Shrinking);
        }
        trace!(txn = %txn.id(), %rid, "lock released");
        true
    }

    fn unlock_all(&self, txn: &Transaction) {
        let mut table = self.table.lock();
        for rid in txn.held_locks() {
            if let Some(state) = table.get_mut(&rid) {
                state.sharers.remove(&txn.id());
                if state.exclusive == Some(txn.id()) {
                    state.exclusive = None;
                }
                if state.upgrading == Some(txn.id()) {
                    state.upgrading = None;
                }
                if state.is_free() {
                    table.remove(&rid);
                }
            }
            txn.remove_shared(rid);
            txn.remove_exclusive(rid);
        }
        drop(table);
        self.released.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    use super::*;

    fn txn(id: u64, isolation: IsolationLevel) -> Transaction {
        Transaction::new(TxnId::new(id), isolation)
    }

    #[test]
    fn exclusive_grant_and_release() {
        let lm = LockManager::new();
        let t = txn(1, IsolationLevel::ReadCommitted);
        let rid = RowId::new(1);

        assert!(lm.lock_exclusive(&t, rid));
        assert!(t.is_exclusive_locked(rid));
        assert!(lm.unlock(&t, rid));
        assert!(!t.is_exclusive_locked(rid));
    }

    #[test]
    fn shared_locks_are_compatible() {
        let lm = LockManager::new();
        let a = txn(1, IsolationLevel::RepeatableRead);
        let b = txn(2, IsolationLevel::RepeatableRead);
        let rid = RowId::new(1);

        assert!(lm.lock_shared(&a, rid));
        assert!(lm.lock_shared(&b, rid));
    }

    #[test]
    fn younger_requester_dies_on_conflict() {
        let lm = LockManager::new();
        let older = txn(1, IsolationLevel::ReadCommitted);
        let younger = txn(2, IsolationLevel::ReadCommitted);
        let rid = RowId::new(1);

        assert!(lm.lock_exclusive(&older, rid));
        assert!(!lm.lock_exclusive(&younger, rid));
        assert!(!lm.lock_shared(&younger, rid));
    }

    #[test]
    fn older_requester_waits_for_release() {
        let lm = Arc::new(LockManager::new());
        let older = Arc::new(txn(1, IsolationLevel::ReadCommitted));
        let younger = Arc::new(txn(2, IsolationLevel::ReadCommitted));
        let rid = RowId::new(1);

        assert!(lm.lock_exclusive(&younger, rid));

        let waiter = {
            let lm = Arc::clone(&lm);
            let older = Arc::clone(&older);
            thread::spawn(move || lm.lock_exclusive(&older, rid))
        };

        thread::sleep(Duration::from_millis(50));
        assert!(lm.unlock(&younger, rid));
        assert!(waiter.join().unwrap());
        assert!(older.is_exclusive_locked(rid));
    }

    #[test]
    fn no_shared_locks_under_read_uncommitted() {
        let lm = LockManager::new();
        let t = txn(1, IsolationLevel::ReadUncommitted);
        assert!(!lm.lock_shared(&t, RowId::new(1)));
    }

    #[test]
    fn upgrade_requires_shared() {
        let lm = LockManager::new();
        let t = txn(1, IsolationLevel::RepeatableRead);
        let rid = RowId::new(1);

        assert!(!lm.lock_upgrade(&t, rid));
        assert!(lm.lock_shared(&t, rid));
        assert!(lm.lock_upgrade(&t, rid));
        assert!(t.is_exclusive_locked(rid));
        assert!(!t.is_shared_locked(rid));
    }

    #[test]
    fn upgrade_dies_against_older_sharer() {
        let lm = LockManager::new();
        let older = txn(1, IsolationLevel::RepeatableRead);
        let younger = txn(2, IsolationLevel::RepeatableRead);
        let rid = RowId::new(1);

        assert!(lm.lock_shared(&older, rid));
        assert!(lm.lock_shared(&younger, rid));
        assert!(!lm.lock_upgrade(&younger, rid));
        // The older sharer may still upgrade once the younger releases.
        assert!(lm.unlock(&younger, rid));
        assert!(lm.lock_upgrade(&older, rid));
    }

    #[test]
    fn unlock_without_lock_is_invalid() {
        let lm = LockManager::new();
        let t = txn(1, IsolationLevel::ReadCommitted);
        assert!(!lm.unlock(&t, RowId::new(1)));
    }

    #[test]
    fn repeatable_read_release_starts_shrinking() {
        let lm = LockManager::new();
        let t = txn(1, IsolationLevel::RepeatableRead);
        let rid = RowId::new(1);

        assert!(lm.lock_exclusive(&t, rid));
        assert!(lm.unlock(&t, rid));
        assert_eq!(t.state(), TransactionState::Shrinking);
        // No acquisition in the shrinking phase.
        assert!(!lm.lock_exclusive(&t, rid));
    }

    #[test]
    fn read_committed_release_keeps_growing() {
        let lm = LockManager::new();
        let t = txn(1, IsolationLevel::ReadCommitted);
        let rid = RowId::new(1);

        assert!(lm.lock_exclusive(&t, rid));
        assert!(lm.unlock(&t, rid));
        assert_eq!(t.state(), TransactionState::Growing);
        assert!(lm.lock_exclusive(&t, rid));
    }

    #[test]
    fn unlock_all_clears_every_lock() {
        let lm = LockManager::new();
        let t = txn(1, IsolationLevel::RepeatableRead);

        assert!(lm.lock_shared(&t, RowId::new(1)));
        assert!(lm.lock_exclusive(&t, RowId::new(2)));
        lm.unlock_all(&t);
        assert!(t.held_locks().is_empty());
    }
}
