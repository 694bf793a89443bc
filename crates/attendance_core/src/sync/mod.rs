//! Sync Channel: push delivery of committed ledger changes to live views.
//!
//! Subscriptions are explicit values owned by their view; there is no global
//! registry. Dropping a subscription releases it like `unsubscribe`.

mod ledger_channel;

pub use ledger_channel::{LedgerSubscription, SubscriptionState};
