//! Debounced, last-request-wins price calculation for one service.
//!
//! Every calculation is tagged with a sequence number when issued. A response
//! is only applied while its number is still the newest one issued, so a slow
//! early response can never overwrite a fresher total. Edits are debounced by
//! ticket: each `schedule` call takes a ticket and only the task still holding
//! the latest ticket after the quiet period calculates.

use crate::domain::model::{BreakdownLine, ParameterSet};
use crate::domain::ports::PricingApi;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub const DEFAULT_DEBOUNCE_MS: u64 = 400;
pub const CALCULATION_FAILED: &str = "Could not calculate estimate. Please try again.";

/// What the estimate panel shows.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EstimateView {
    pub total: f64,
    pub breakdown: Vec<BreakdownLine>,
    pub error: Option<String>,
    /// Newest calculation that touched this view.
    pub seq: u64,
}

struct Inner {
    api: Arc<dyn PricingApi>,
    service_id: String,
    debounce: Duration,
    edits: AtomicU64,
    issued: AtomicU64,
    state: watch::Sender<EstimateView>,
}

#[derive(Clone)]
pub struct EstimateCalculator {
    inner: Arc<Inner>,
}

impl EstimateCalculator {
    pub fn new(api: Arc<dyn PricingApi>, service_id: impl Into<String>, debounce: Duration) -> Self {
        let (state, _) = watch::channel(EstimateView::default());
        Self {
            inner: Arc::new(Inner {
                api,
                service_id: service_id.into(),
                debounce,
                edits: AtomicU64::new(0),
                issued: AtomicU64::new(0),
                state,
            }),
        }
    }

    pub fn service_id(&self) -> &str {
        &self.inner.service_id
    }

    pub fn view(&self) -> EstimateView {
        self.inner.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<EstimateView> {
        self.inner.state.subscribe()
    }

    /// Calculates right away and returns the view afterwards, which may
    /// already reflect a newer calculation than this one. Debounced edits
    /// still waiting for their quiet period are dropped.
    pub async fn calculate(&self, params: &ParameterSet) -> EstimateView {
        self.cancel_pending();
        self.run(params).await
    }

    /// Drops debounced edits that have not fired yet.
    pub fn cancel_pending(&self) {
        self.inner.edits.fetch_add(1, Ordering::SeqCst);
    }

    async fn run(&self, params: &ParameterSet) -> EstimateView {
        let inner = &self.inner;
        let seq = inner.issued.fetch_add(1, Ordering::SeqCst) + 1;

        if params.is_empty() {
            self.apply(seq, |view| {
                view.total = 0.0;
                view.breakdown.clear();
                view.error = None;
            });
            return self.view();
        }

        // 新的請求發出時先清掉舊錯誤
        self.apply(seq, |view| view.error = None);

        debug!("🧮 Calculating '{}' (#{})", inner.service_id, seq);
        match inner.api.calculate(&inner.service_id, params).await {
            Ok(result) => {
                let applied = self.apply(seq, |view| {
                    view.total = result.estimated_cost;
                    view.breakdown = result.breakdown;
                    view.error = None;
                });
                if applied {
                    info!("🧮 Estimate for '{}': {}", inner.service_id, result.estimated_cost);
                } else {
                    debug!("🧮 Discarding stale result #{} for '{}'", seq, inner.service_id);
                }
            }
            Err(e) => {
                warn!("⚠️ Estimate #{} for '{}' failed: {}", seq, inner.service_id, e);
                self.apply(seq, |view| view.error = Some(CALCULATION_FAILED.to_string()));
            }
        }

        self.view()
    }

    /// Recalculates once edits have been quiet for the debounce period.
    pub fn schedule(&self, params: ParameterSet) -> JoinHandle<()> {
        let ticket = self.inner.edits.fetch_add(1, Ordering::SeqCst) + 1;
        let calculator = self.clone();

        tokio::spawn(async move {
            tokio::time::sleep(calculator.inner.debounce).await;
            if calculator.inner.edits.load(Ordering::SeqCst) != ticket {
                debug!("⏱️ Edit #{} superseded before the quiet period ended", ticket);
                return;
            }
            calculator.run(&params).await;
        })
    }

    // Compare-and-set: the sequence check runs under the watch lock.
    fn apply(&self, seq: u64, update: impl FnOnce(&mut EstimateView)) -> bool {
        let issued = &self.inner.issued;
        self.inner.state.send_if_modified(|view| {
            if seq != issued.load(Ordering::SeqCst) {
                return false;
            }
            update(view);
            view.seq = seq;
            true
        })
    }
}
