//! Cost aggregation
//!
//! Pure arithmetic: (host, matched instance, quote) in, monthly cost estimate
//! out. Uses the 730-hour month AWS bills against.

use crate::catalog::InstanceSpec;
use crate::inventory::HostRecord;
use crate::pricing::PriceQuote;
use serde::{Deserialize, Serialize};

/// Hours in a billing month.
pub const HOURS_PER_MONTH: f64 = 730.0;

/// Monthly cost for each purchase term.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TermCosts {
    pub on_demand: f64,
    pub reserved_1yr: f64,
    pub reserved_3yr: f64,
}

/// One host's monthly estimate. Written once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostEstimate {
    pub host: String,
    pub instance_type: String,
    pub compute_monthly: TermCosts,
    pub storage_gib: f64,
    pub storage_monthly: f64,
    pub total_monthly: TermCosts,
}

/// Combine compute and storage rates into a per-host monthly estimate.
pub fn estimate(host: &HostRecord, instance: &InstanceSpec, quote: &PriceQuote) -> CostEstimate {
    let compute_monthly = TermCosts {
        on_demand: quote.rates.on_demand_hourly * HOURS_PER_MONTH,
        reserved_1yr: quote.rates.reserved_1yr_hourly * HOURS_PER_MONTH,
        reserved_3yr: quote.rates.reserved_3yr_hourly * HOURS_PER_MONTH,
    };
    let storage_monthly = host.disk_gib * quote.storage_gib_month;
    CostEstimate {
        host: host.name.clone(),
        instance_type: instance.name.clone(),
        compute_monthly,
        storage_gib: host.disk_gib,
        storage_monthly,
        total_monthly: TermCosts {
            on_demand: compute_monthly.on_demand + storage_monthly,
            reserved_1yr: compute_monthly.reserved_1yr + storage_monthly,
            reserved_3yr: compute_monthly.reserved_3yr + storage_monthly,
        },
    }
}
