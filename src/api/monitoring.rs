//! Service metrics
//!
//! Atomic counters exported in Prometheus text format at `GET /metrics`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Clone, Default)]
pub struct MetricsRegistry {
    pub http_requests_total: Arc<AtomicU64>,
    pub bets_placed_total: Arc<AtomicU64>,
    pub amount_wagered_total: Arc<AtomicU64>,
    pub rounds_created_total: Arc<AtomicU64>,
    pub rounds_settled_total: Arc<AtomicU64>,
    pub rounds_cancelled_total: Arc<AtomicU64>,
    pub payouts_credited_total: Arc<AtomicU64>,
    pub rewards_redeemed_total: Arc<AtomicU64>,
    pub errors_total: Arc<AtomicU64>,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc(counter: &Arc<AtomicU64>) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(counter: &Arc<AtomicU64>, value: u64) {
        counter.fetch_add(value, Ordering::Relaxed);
    }

    /// Record a served HTTP request and whether it ended in an error.
    pub fn record_http_request(&self, success: bool) {
        self.http_requests_total.fetch_add(1, Ordering::Relaxed);
        if !success {
            self.errors_total.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn to_prometheus_format(&self) -> String {
        let mut output = String::new();

        let counters: [(&str, &str, &Arc<AtomicU64>); 9] = [
            ("numpool_http_requests_total", "Total HTTP requests served", &self.http_requests_total),
            ("numpool_bets_placed_total", "Total bets accepted", &self.bets_placed_total),
            ("numpool_amount_wagered_total", "Total amount wagered (smallest unit)", &self.amount_wagered_total),
            ("numpool_rounds_created_total", "Total rounds created", &self.rounds_created_total),
            ("numpool_rounds_settled_total", "Total rounds settled", &self.rounds_settled_total),
            ("numpool_rounds_cancelled_total", "Total rounds cancelled", &self.rounds_cancelled_total),
            ("numpool_payouts_credited_total", "Total payout amount credited", &self.payouts_credited_total),
            ("numpool_rewards_redeemed_total", "Total reward codes redeemed", &self.rewards_redeemed_total),
            ("numpool_errors_total", "Total requests that returned an error", &self.errors_total),
        ];

        for (name, help, counter) in counters {
            output.push_str(&format!(
                "# HELP {} {}\n# TYPE {} counter\n{} {}\n\n",
                name,
                help,
                name,
                name,
                counter.load(Ordering::Relaxed)
            ));
        }
        output
    }
}
