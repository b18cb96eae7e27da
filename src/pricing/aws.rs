//! AWS-backed pricing source
//!
//! On-demand and storage rates come from the Pricing API (`GetProducts`);
//! reserved rates come from EC2 `DescribeReservedInstancesOfferings` with the
//! All Upfront offering class, amortized to an effective hourly rate so all
//! three terms are comparable.
//!
//! The Pricing API is only served from a couple of endpoint regions, so this
//! source holds two clients: a pricing client pinned to the endpoint region
//! and an EC2 client in the region being priced.

use crate::error::{MigratectlError, Result};
use crate::pricing::{region_location, Platform, PricingSource, TermRates};
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_ec2::types::{InstanceType, OfferingTypeValues, RiProductDescription};
use aws_sdk_ec2::Client as Ec2Client;
use aws_sdk_pricing::types::{Filter, FilterType};
use aws_sdk_pricing::Client as PricingClient;
use tracing::debug;

const SECONDS_1YR: i64 = 31_536_000;
const SECONDS_3YR: i64 = 94_608_000;

pub struct AwsPricingSource {
    pricing: PricingClient,
    ec2: Ec2Client,
}

impl AwsPricingSource {
    pub fn new(pricing: PricingClient, ec2: Ec2Client) -> Self {
        Self { pricing, ec2 }
    }

    /// Build clients from the ambient AWS credential chain.
    pub async fn connect(region: &str, pricing_endpoint_region: &str) -> Self {
        let pricing_cfg = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(pricing_endpoint_region.to_string()))
            .load()
            .await;
        let ec2_cfg = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .load()
            .await;
        Self {
            pricing: PricingClient::new(&pricing_cfg),
            ec2: Ec2Client::new(&ec2_cfg),
        }
    }

    pub fn ec2_client(&self) -> &Ec2Client {
        &self.ec2
    }

    async fn get_products(&self, filters: Vec<Filter>) -> Result<Vec<String>> {
        let mut req = self
            .pricing
            .get_products()
            .service_code("AmazonEC2")
            .max_results(1);
        for f in filters {
            req = req.filters(f);
        }
        let resp = req.send().await.map_err(|e| MigratectlError::PricingApi {
            operation: "GetProducts".to_string(),
            message: e.to_string(),
            source: Some(Box::new(e)),
        })?;
        Ok(resp.price_list().to_vec())
    }

    async fn on_demand_rate(
        &self,
        instance_type: &str,
        platform: Platform,
        region: &str,
    ) -> Result<f64> {
        let location = region_location(region)?;
        let filters = vec![
            term_match("instanceType", instance_type)?,
            term_match("operatingSystem", platform.pricing_name())?,
            term_match("location", location)?,
            term_match("tenancy", "Shared")?,
            term_match("capacitystatus", "Used")?,
            term_match("preInstalledSw", "NA")?,
        ];
        let docs = self.get_products(filters).await?;

        let rate = docs
            .first()
            .and_then(|doc| serde_json::from_str::<serde_json::Value>(doc).ok())
            .and_then(|doc| first_on_demand_usd(&doc));

        match rate {
            Some(r) if r > 0.0 => Ok(r),
            _ => Err(MigratectlError::PriceUnavailable {
                instance_type: instance_type.to_string(),
                region: region.to_string(),
                detail: format!("no on-demand price for {}", platform.pricing_name()),
            }),
        }
    }

    async fn reserved_rate(
        &self,
        instance_type: &str,
        platform: Platform,
        region: &str,
        duration_secs: i64,
    ) -> Result<f64> {
        let resp = self
            .ec2
            .describe_reserved_instances_offerings()
            .instance_type(InstanceType::from(instance_type))
            .product_description(RiProductDescription::from(platform.ri_description()))
            .offering_type(OfferingTypeValues::AllUpfront)
            .min_duration(duration_secs)
            .max_duration(duration_secs)
            .max_results(100)
            .send()
            .await
            .map_err(|e| MigratectlError::PricingApi {
                operation: "DescribeReservedInstancesOfferings".to_string(),
                message: e.to_string(),
                source: Some(Box::new(e)),
            })?;

        let offering = resp
            .reserved_instances_offerings()
            .first()
            .ok_or_else(|| MigratectlError::PriceUnavailable {
                instance_type: instance_type.to_string(),
                region: region.to_string(),
                detail: format!(
                    "no {}yr reserved offering for {}",
                    duration_secs / SECONDS_1YR,
                    platform.ri_description()
                ),
            })?;

        let fixed = offering.fixed_price().unwrap_or(0.0) as f64;
        let duration = offering.duration().unwrap_or(duration_secs);
        let recurring_hourly: f64 = offering
            .recurring_charges()
            .iter()
            .filter_map(|c| c.amount())
            .sum();

        let rate = effective_hourly(fixed, duration, recurring_hourly);
        if rate <= 0.0 {
            return Err(MigratectlError::PriceUnavailable {
                instance_type: instance_type.to_string(),
                region: region.to_string(),
                detail: "reserved offering priced at zero".to_string(),
            });
        }
        Ok(rate)
    }
}

#[async_trait]
impl PricingSource for AwsPricingSource {
    async fn term_rates(
        &self,
        instance_type: &str,
        platform: Platform,
        region: &str,
    ) -> Result<TermRates> {
        debug!("Fetching rates for {} in {}", instance_type, region);
        let on_demand_hourly = self.on_demand_rate(instance_type, platform, region).await?;
        let reserved_1yr_hourly = self
            .reserved_rate(instance_type, platform, region, SECONDS_1YR)
            .await?;
        let reserved_3yr_hourly = self
            .reserved_rate(instance_type, platform, region, SECONDS_3YR)
            .await?;
        Ok(TermRates {
            on_demand_hourly,
            reserved_1yr_hourly,
            reserved_3yr_hourly,
        })
    }

    async fn storage_rate(&self, region: &str) -> Result<f64> {
        let location = region_location(region)?;
        let filters = vec![
            term_match("productFamily", "Storage")?,
            term_match("volumeType", "General Purpose")?,
            term_match("location", location)?,
        ];
        let docs = self.get_products(filters).await?;

        docs.first()
            .and_then(|doc| serde_json::from_str::<serde_json::Value>(doc).ok())
            .and_then(|doc| first_on_demand_usd(&doc))
            .filter(|r| *r > 0.0)
            .ok_or_else(|| MigratectlError::PriceUnavailable {
                instance_type: "ebs-gp".to_string(),
                region: region.to_string(),
                detail: "no general purpose storage price".to_string(),
            })
    }
}

fn term_match(field: &str, value: &str) -> Result<Filter> {
    Filter::builder()
        .r#type(FilterType::TermMatch)
        .field(field)
        .value(value)
        .build()
        .map_err(|e| MigratectlError::PricingApi {
            operation: "GetProducts filter".to_string(),
            message: e.to_string(),
            source: Some(Box::new(e)),
        })
}

/// Walk a Pricing API product document down to the first on-demand USD rate.
fn first_on_demand_usd(doc: &serde_json::Value) -> Option<f64> {
    let terms = doc.get("terms")?.get("OnDemand")?.as_object()?;
    for term in terms.values() {
        let Some(dimensions) = term.get("priceDimensions").and_then(|d| d.as_object()) else {
            continue;
        };
        for dimension in dimensions.values() {
            let usd = dimension
                .get("pricePerUnit")
                .and_then(|p| p.get("USD"))
                .and_then(|u| u.as_str());
            if let Some(usd) = usd {
                if let Ok(rate) = usd.parse::<f64>() {
                    return Some(rate);
                }
            }
        }
    }
    None
}

/// Amortize an all-upfront fixed price over the term and add recurring
/// hourly charges.
fn effective_hourly(fixed_price: f64, duration_secs: i64, recurring_hourly: f64) -> f64 {
    if duration_secs <= 0 {
        return recurring_hourly;
    }
    let hours = duration_secs as f64 / 3600.0;
    fixed_price / hours + recurring_hourly
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_on_demand_price_document() {
        let doc = json!({
            "product": { "attributes": { "instanceType": "m5.large" } },
            "terms": {
                "OnDemand": {
                    "XYZ.JRTCKXETXF": {
                        "priceDimensions": {
                            "XYZ.JRTCKXETXF.6YS6EN2CT7": {
                                "unit": "Hrs",
                                "pricePerUnit": { "USD": "0.0960000000" }
                            }
                        }
                    }
                }
            }
        });
        let rate = first_on_demand_usd(&doc).unwrap();
        assert!((rate - 0.096).abs() < 1e-9);
    }

    #[test]
    fn missing_terms_yield_none() {
        let doc = json!({ "product": {} });
        assert!(first_on_demand_usd(&doc).is_none());
        let doc = json!({ "terms": { "OnDemand": {} } });
        assert!(first_on_demand_usd(&doc).is_none());
    }

    #[test]
    fn effective_hourly_amortizes_fixed_price() {
        // 8760 hours in a 1yr term
        let rate = effective_hourly(876.0, SECONDS_1YR, 0.0);
        assert!((rate - 0.1).abs() < 1e-9);

        let with_recurring = effective_hourly(876.0, SECONDS_1YR, 0.05);
        assert!((with_recurring - 0.15).abs() < 1e-9);

        // Degenerate duration falls back to recurring only
        assert_eq!(effective_hourly(100.0, 0, 0.02), 0.02);
    }
}
