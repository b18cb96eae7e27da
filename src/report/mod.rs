//! Report types and emitters
//!
//! A finished run produces one `BatchReport`: ordered estimates for every
//! host that succeeded, the failure list for those that didn't, and the
//! unpriceable-type tally. The CSV and PDF emitters both render from it.

pub mod csv;
pub mod pdf;

use crate::cost::{CostEstimate, TermCosts};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A host that could not be estimated, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostFailure {
    pub host: String,
    pub reason: String,
}

/// Everything a finished estimation run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    /// Successful estimates, in original input order.
    pub estimates: Vec<CostEstimate>,
    /// Per-host failures, in original input order.
    pub failures: Vec<HostFailure>,
    /// Instance types skipped during candidate selection because the pricing
    /// service had no entry for them, with occurrence counts.
    pub unpriced_types: HashMap<String, u32>,
    pub region: String,
    pub generated_at: DateTime<Utc>,
}

impl BatchReport {
    /// Sum monthly totals across all successful hosts.
    pub fn totals(&self) -> TermCosts {
        let mut totals = TermCosts {
            on_demand: 0.0,
            reserved_1yr: 0.0,
            reserved_3yr: 0.0,
        };
        for est in &self.estimates {
            totals.on_demand += est.total_monthly.on_demand;
            totals.reserved_1yr += est.total_monthly.reserved_1yr;
            totals.reserved_3yr += est.total_monthly.reserved_3yr;
        }
        totals
    }

    pub fn total_storage_monthly(&self) -> f64 {
        self.estimates.iter().map(|e| e.storage_monthly).sum()
    }

    /// 3-year-term monthly cost per instance type, for the cost-share chart.
    pub fn cost_by_instance_type(&self) -> HashMap<String, f64> {
        let mut shares: HashMap<String, f64> = HashMap::new();
        for est in &self.estimates {
            *shares.entry(est.instance_type.clone()).or_insert(0.0) +=
                est.total_monthly.reserved_3yr;
        }
        shares
    }

    /// Cost shares with small slices folded into "Other".
    ///
    /// Returns (label, cost) pairs sorted by descending cost; types whose
    /// share of the total is below `threshold_pct` are grouped.
    pub fn cost_shares(&self, threshold_pct: f64) -> Vec<(String, f64)> {
        let by_type = self.cost_by_instance_type();
        let total: f64 = by_type.values().sum();
        if total <= 0.0 {
            return Vec::new();
        }

        let mut named: Vec<(String, f64)> = Vec::new();
        let mut other = 0.0;
        for (name, cost) in by_type {
            if cost / total * 100.0 < threshold_pct {
                other += cost;
            } else {
                named.push((name, cost));
            }
        }
        named.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        if other > 0.0 {
            named.push(("Other".to_string(), other));
        }
        named
    }
}
