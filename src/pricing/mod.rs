//! Pricing lookup
//!
//! The remote pricing service sits behind the `PricingSource` trait so the
//! orchestrator and tests never talk to AWS directly. `AwsPricingSource` is
//! the real implementation; `PriceCache` adds per-key single-flight caching
//! on top of any source.

pub mod aws;
pub mod cache;

pub use aws::AwsPricingSource;
pub use cache::PriceCache;

use crate::error::{MigratectlError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Pricing platform derived from the guest OS string in the inventory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Platform {
    Linux,
    RedHat,
    Suse,
    Windows,
}

impl Platform {
    /// Map a raw OS description (e.g. "Red Hat Enterprise Linux 8 (64-bit)")
    /// onto a pricing platform. Anything unrecognized prices as Linux.
    pub fn from_os(os: &str) -> Self {
        if os.contains("Windows") {
            Platform::Windows
        } else if os.contains("Red Hat") {
            Platform::RedHat
        } else if os.contains("SUSE") {
            Platform::Suse
        } else {
            Platform::Linux
        }
    }

    /// `operatingSystem` attribute value for the Pricing API.
    pub fn pricing_name(&self) -> &'static str {
        match self {
            Platform::Linux => "Linux",
            Platform::RedHat => "RHEL",
            Platform::Suse => "SUSE",
            Platform::Windows => "Windows",
        }
    }

    /// Product description for reserved instance offerings.
    pub fn ri_description(&self) -> &'static str {
        match self {
            Platform::Linux => "Linux/UNIX",
            Platform::RedHat => "Red Hat Enterprise Linux",
            Platform::Suse => "SUSE Linux",
            Platform::Windows => "Windows",
        }
    }
}

/// Hourly rates for the three purchase terms.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TermRates {
    pub on_demand_hourly: f64,
    pub reserved_1yr_hourly: f64,
    pub reserved_3yr_hourly: f64,
}

/// A cached pricing answer for one (instance type, region, platform) key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub instance_type: String,
    pub region: String,
    pub platform: Platform,
    pub rates: TermRates,
    /// EBS gp storage rate, USD per GiB-month, for the quote's region.
    pub storage_gib_month: f64,
}

/// Remote rate lookup API. Implementations must be safe to share across the
/// worker pool.
#[async_trait]
pub trait PricingSource: Send + Sync {
    /// Hourly rates for an instance type in a region.
    async fn term_rates(
        &self,
        instance_type: &str,
        platform: Platform,
        region: &str,
    ) -> Result<TermRates>;

    /// Regional EBS gp storage rate, USD per GiB-month.
    async fn storage_rate(&self, region: &str) -> Result<f64>;
}

/// Pricing API `location` attribute values for supported regions.
const REGION_LOCATIONS: &[(&str, &str)] = &[
    ("us-east-1", "US East (N. Virginia)"),
    ("us-east-2", "US East (Ohio)"),
    ("us-west-1", "US West (N. California)"),
    ("us-west-2", "US West (Oregon)"),
    ("ca-central-1", "Canada (Central)"),
    ("eu-west-1", "EU (Ireland)"),
    ("eu-west-2", "EU (London)"),
    ("eu-central-1", "EU (Frankfurt)"),
    ("ap-southeast-1", "Asia Pacific (Singapore)"),
    ("ap-southeast-2", "Asia Pacific (Sydney)"),
    ("ap-northeast-1", "Asia Pacific (Tokyo)"),
    ("ap-south-1", "Asia Pacific (Mumbai)"),
    ("sa-east-1", "South America (Sao Paulo)"),
];

/// Resolve a region code to its Pricing API location name.
///
/// Unknown regions are rejected up front so a typo fails before any host is
/// processed.
pub fn region_location(region: &str) -> Result<&'static str> {
    REGION_LOCATIONS
        .iter()
        .find(|(code, _)| *code == region)
        .map(|(_, location)| *location)
        .ok_or_else(|| MigratectlError::InputValidation {
            field: "region".to_string(),
            reason: format!(
                "unsupported region '{}'; known regions: {}",
                region,
                REGION_LOCATIONS
                    .iter()
                    .map(|(code, _)| *code)
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_from_os() {
        assert_eq!(
            Platform::from_os("Microsoft Windows Server 2019 (64-bit)"),
            Platform::Windows
        );
        assert_eq!(
            Platform::from_os("Red Hat Enterprise Linux 8 (64-bit)"),
            Platform::RedHat
        );
        assert_eq!(Platform::from_os("SUSE Linux Enterprise 15"), Platform::Suse);
        assert_eq!(Platform::from_os("CentOS 7 (64-bit)"), Platform::Linux);
        assert_eq!(Platform::from_os("Ubuntu Linux (64-bit)"), Platform::Linux);
        assert_eq!(Platform::from_os(""), Platform::Linux);
    }

    #[test]
    fn region_location_lookup() {
        assert_eq!(region_location("us-east-1").unwrap(), "US East (N. Virginia)");
        assert_eq!(region_location("eu-central-1").unwrap(), "EU (Frankfurt)");
        let err = region_location("mars-north-1").unwrap_err();
        assert!(matches!(err, MigratectlError::InputValidation { .. }));
    }
}
