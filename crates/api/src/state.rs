//! Shared application state.

use std::sync::Arc;

use backoffice::{Backoffice, InvoiceRenderer, TextInvoiceRenderer};
use common::SharedClock;
use reporting::Reporter;
use store::Store;

/// Company name printed on rendered invoices.
pub const COMPANY_NAME: &str = "Mon Application";

/// Services shared by every handler.
pub struct AppState<S: Store> {
    pub backoffice: Backoffice<S>,
    pub reporter: Reporter<S>,
    pub renderer: Arc<dyn InvoiceRenderer>,
}

impl<S: Store> AppState<S> {
    /// State over `store` with the wall clock and the text invoice renderer.
    pub fn new(store: S, reconcile_batch: i64) -> Self {
        Self {
            backoffice: Backoffice::new(store.clone()).with_reconcile_batch(reconcile_batch),
            reporter: Reporter::new(store),
            renderer: Arc::new(TextInvoiceRenderer::new(COMPANY_NAME)),
        }
    }

    /// Replaces the time source of every service.
    pub fn with_clock(self, clock: SharedClock) -> Self {
        Self {
            backoffice: self.backoffice.with_clock(clock.clone()),
            reporter: self.reporter.with_clock(clock),
            renderer: self.renderer,
        }
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn InvoiceRenderer>) -> Self {
        self.renderer = renderer;
        self
    }
}
