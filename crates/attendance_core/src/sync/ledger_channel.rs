//! Live ledger subscription.
//!
//! # Responsibility
//! - Deliver the month's ledger as full snapshots: first the state at
//!   subscribe time, then one snapshot per observed commit.
//! - Own the store watch handle and release it on `unsubscribe` or drop.
//!
//! # Invariants
//! - Rapid commits may coalesce into one delivery carrying the latest state.
//! - After `unsubscribe`, no further snapshot is ever returned.

use crate::model::attendance::AttendanceLedger;
use crate::model::month::MonthKey;
use crate::repo::ledger_repo::ledger_from_snapshot;
use crate::store::{DocumentWatch, StoreResult};
use log::debug;

/// Lifecycle of one subscription. `Unsubscribed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    Active,
    Unsubscribed,
}

/// Snapshot feed for one month's ledger.
///
/// Each delivered value replaces the previous one; it is never a diff.
#[derive(Debug)]
pub struct LedgerSubscription {
    month_key: MonthKey,
    watch: Option<DocumentWatch>,
    initial_pending: bool,
}

impl LedgerSubscription {
    pub(crate) fn new(month_key: MonthKey, watch: DocumentWatch) -> Self {
        debug!(
            "event=ledger_subscribe module=sync status=ok month={}",
            month_key
        );
        Self {
            month_key,
            watch: Some(watch),
            initial_pending: true,
        }
    }

    pub fn month_key(&self) -> &MonthKey {
        &self.month_key
    }

    pub fn state(&self) -> SubscriptionState {
        if self.watch.is_some() {
            SubscriptionState::Active
        } else {
            SubscriptionState::Unsubscribed
        }
    }

    pub fn is_active(&self) -> bool {
        self.state() == SubscriptionState::Active
    }

    /// Returns the next pending snapshot without waiting.
    ///
    /// `None` means nothing new was committed, or the subscription is closed.
    pub fn try_next(&mut self) -> Option<StoreResult<AttendanceLedger>> {
        let watch = self.watch.as_mut()?;
        if self.initial_pending {
            self.initial_pending = false;
            return Some(decode(&self.month_key, watch));
        }
        match watch.has_changed() {
            Ok(true) => Some(decode(&self.month_key, watch)),
            Ok(false) => None,
            Err(_) => {
                self.release("store_closed");
                None
            }
        }
    }

    /// Waits for the next snapshot.
    ///
    /// Returns `None` once unsubscribed or when the store goes away.
    pub async fn next(&mut self) -> Option<StoreResult<AttendanceLedger>> {
        let watch = self.watch.as_mut()?;
        if self.initial_pending {
            self.initial_pending = false;
            return Some(decode(&self.month_key, watch));
        }
        if watch.changed().await.is_err() {
            self.release("store_closed");
            return None;
        }
        let watch = self.watch.as_mut()?;
        Some(decode(&self.month_key, watch))
    }

    /// Stops delivery and releases the watch. Safe to call repeatedly.
    pub fn unsubscribe(&mut self) {
        self.release("unsubscribe");
    }

    fn release(&mut self, reason: &str) {
        if self.watch.take().is_some() {
            debug!(
                "event=ledger_unsubscribe module=sync status=ok month={} reason={}",
                self.month_key, reason
            );
        }
    }
}

fn decode(month_key: &MonthKey, watch: &mut DocumentWatch) -> StoreResult<AttendanceLedger> {
    let snapshot = watch.borrow_and_update();
    ledger_from_snapshot(month_key, (*snapshot).as_ref())
}
