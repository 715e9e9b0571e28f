//! Metrics collection for observability
//!
//! This module provides Prometheus metrics for monitoring the ledger.
//! Each [`Metrics`] owns its registry so several books can coexist in one
//! process.
//!
//! # Metrics
//!
//! - `ledger_sessions_opened_total` - Edit sessions opened
//! - `ledger_commits_total` - Edit sessions committed
//! - `ledger_rollbacks_total` - Edit sessions rolled back
//! - `ledger_balancing_splits_total` - Splits created by auto-balancing
//! - `ledger_backend_notifications_total` - Commit notifications sent to the backend
//! - `ledger_contract_violations_total` - Mutations rejected outside a session
//! - `ledger_queries_total` - Queries run
//! - `ledger_query_results` - Histogram of result sizes
//! - `ledger_query_duration_seconds` - Histogram of query latencies

use prometheus::{Histogram, HistogramOpts, IntCounter, Registry};
use std::sync::Arc;

/// Metrics collector
#[derive(Clone, Debug)]
pub struct Metrics {
    /// Edit sessions opened
    pub sessions_opened: IntCounter,

    /// Edit sessions committed
    pub commits_total: IntCounter,

    /// Edit sessions rolled back
    pub rollbacks_total: IntCounter,

    /// Splits created by auto-balancing
    pub balancing_splits_total: IntCounter,

    /// Commit notifications delivered to the backend
    pub backend_notifications_total: IntCounter,

    /// Mutations rejected for lack of an open session
    pub contract_violations_total: IntCounter,

    /// Queries run
    pub queries_total: IntCounter,

    /// Result size histogram
    pub query_results: Histogram,

    /// Query duration histogram
    pub query_duration: Histogram,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl Metrics {
    /// Create new metrics collector
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let sessions_opened =
            IntCounter::new("ledger_sessions_opened_total", "Edit sessions opened")?;
        registry.register(Box::new(sessions_opened.clone()))?;

        let commits_total = IntCounter::new("ledger_commits_total", "Edit sessions committed")?;
        registry.register(Box::new(commits_total.clone()))?;

        let rollbacks_total =
            IntCounter::new("ledger_rollbacks_total", "Edit sessions rolled back")?;
        registry.register(Box::new(rollbacks_total.clone()))?;

        let balancing_splits_total = IntCounter::new(
            "ledger_balancing_splits_total",
            "Splits created by auto-balancing",
        )?;
        registry.register(Box::new(balancing_splits_total.clone()))?;

        let backend_notifications_total = IntCounter::new(
            "ledger_backend_notifications_total",
            "Commit notifications sent to the backend",
        )?;
        registry.register(Box::new(backend_notifications_total.clone()))?;

        let contract_violations_total = IntCounter::new(
            "ledger_contract_violations_total",
            "Mutations rejected outside a session",
        )?;
        registry.register(Box::new(contract_violations_total.clone()))?;

        let queries_total = IntCounter::new("ledger_queries_total", "Queries run")?;
        registry.register(Box::new(queries_total.clone()))?;

        let query_results = Histogram::with_opts(
            HistogramOpts::new("ledger_query_results", "Histogram of result sizes")
                .buckets(vec![0.0, 1.0, 10.0, 50.0, 100.0, 500.0, 1000.0, 10000.0]),
        )?;
        registry.register(Box::new(query_results.clone()))?;

        let query_duration = Histogram::with_opts(
            HistogramOpts::new("ledger_query_duration_seconds", "Histogram of query latencies")
                .buckets(vec![0.0001, 0.0005, 0.001, 0.005, 0.010, 0.050, 0.100, 0.500]),
        )?;
        registry.register(Box::new(query_duration.clone()))?;

        Ok(Self {
            sessions_opened,
            commits_total,
            rollbacks_total,
            balancing_splits_total,
            backend_notifications_total,
            contract_violations_total,
            queries_total,
            query_results,
            query_duration,
            registry,
        })
    }

    /// Record a session opening
    pub fn record_session_opened(&self) {
        self.sessions_opened.inc();
    }

    /// Record a commit
    pub fn record_commit(&self) {
        self.commits_total.inc();
    }

    /// Record a rollback
    pub fn record_rollback(&self) {
        self.rollbacks_total.inc();
    }

    /// Record a split created to restore balance
    pub fn record_balancing_split(&self) {
        self.balancing_splits_total.inc();
    }

    /// Record a backend commit notification
    pub fn record_backend_notification(&self) {
        self.backend_notifications_total.inc();
    }

    /// Record a rejected mutation
    pub fn record_contract_violation(&self) {
        self.contract_violations_total.inc();
    }

    /// Record a query run
    pub fn record_query(&self, results: usize, duration_seconds: f64) {
        self.queries_total.inc();
        self.query_results.observe(results as f64);
        self.query_duration.observe(duration_seconds);
    }

    /// Get metrics registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}
