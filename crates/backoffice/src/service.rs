use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use common::{SharedClock, SystemClock};
use store::Store;

/// Default number of orders handled by one reconcile sweep.
pub const DEFAULT_RECONCILE_BATCH: i64 = 200;

/// Entry point of the application services.
///
/// Every mutating method runs in exactly one store transaction; the
/// transaction is committed only when the whole operation succeeded.
#[derive(Clone)]
pub struct Backoffice<S: Store> {
    store: S,
    clock: SharedClock,
    reconcile_batch: i64,
}

impl<S: Store> Backoffice<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock::default()),
            reconcile_batch: DEFAULT_RECONCILE_BATCH,
        }
    }

    /// Replaces the time source.
    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    /// Sets how many orders a reconcile sweep may repair at once.
    pub fn with_reconcile_batch(mut self, batch: i64) -> Self {
        self.reconcile_batch = batch.max(1);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn clock(&self) -> &SharedClock {
        &self.clock
    }

    pub(crate) fn reconcile_batch(&self) -> i64 {
        self.reconcile_batch
    }

    pub(crate) fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub(crate) fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    pub(crate) fn offset(&self) -> FixedOffset {
        self.clock.offset()
    }
}
