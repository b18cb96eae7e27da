//! Instance type reference table
//!
//! The catalog is the immutable table of instance types the matcher works
//! against. It is either fetched live from EC2 `DescribeInstanceTypes`
//! (mirroring the real AWS offering) or taken from a built-in table of
//! general-purpose, compute-, and memory-optimized families for offline use
//! and tests.

use crate::error::{MigratectlError, Result};
use aws_sdk_ec2::Client as Ec2Client;
use serde::{Deserialize, Serialize};
use tracing::info;

/// A named compute offering with fixed vCPU/RAM capacity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceSpec {
    pub name: String,
    pub vcpus: u32,
    pub ram_gib: f64,
}

impl InstanceSpec {
    pub fn new(name: &str, vcpus: u32, ram_gib: f64) -> Self {
        Self {
            name: name.to_string(),
            vcpus,
            ram_gib,
        }
    }
}

/// Immutable instance reference table.
#[derive(Debug, Clone)]
pub struct InstanceCatalog {
    specs: Vec<InstanceSpec>,
}

impl InstanceCatalog {
    pub fn new(mut specs: Vec<InstanceSpec>) -> Self {
        // Stable matcher iteration order: capacity first, then name
        specs.sort_by(|a, b| {
            (a.vcpus, a.ram_gib, &a.name)
                .partial_cmp(&(b.vcpus, b.ram_gib, &b.name))
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Self { specs }
    }

    /// Built-in reference table covering the t3/c5/m5/r5 families.
    pub fn builtin() -> Self {
        let table: &[(&str, u32, f64)] = &[
            ("t3.micro", 2, 1.0),
            ("t3.small", 2, 2.0),
            ("t3.medium", 2, 4.0),
            ("t3.large", 2, 8.0),
            ("t3.xlarge", 4, 16.0),
            ("t3.2xlarge", 8, 32.0),
            ("c5.large", 2, 4.0),
            ("c5.xlarge", 4, 8.0),
            ("c5.2xlarge", 8, 16.0),
            ("c5.4xlarge", 16, 32.0),
            ("c5.9xlarge", 36, 72.0),
            ("c5.12xlarge", 48, 96.0),
            ("c5.18xlarge", 72, 144.0),
            ("c5.24xlarge", 96, 192.0),
            ("m5.large", 2, 8.0),
            ("m5.xlarge", 4, 16.0),
            ("m5.2xlarge", 8, 32.0),
            ("m5.4xlarge", 16, 64.0),
            ("m5.8xlarge", 32, 128.0),
            ("m5.12xlarge", 48, 192.0),
            ("m5.16xlarge", 64, 256.0),
            ("m5.24xlarge", 96, 384.0),
            ("r5.large", 2, 16.0),
            ("r5.xlarge", 4, 32.0),
            ("r5.2xlarge", 8, 64.0),
            ("r5.4xlarge", 16, 128.0),
            ("r5.8xlarge", 32, 256.0),
            ("r5.12xlarge", 48, 384.0),
            ("r5.16xlarge", 64, 512.0),
            ("r5.24xlarge", 96, 768.0),
        ];
        Self::new(
            table
                .iter()
                .map(|(name, vcpus, ram)| InstanceSpec::new(name, *vcpus, *ram))
                .collect(),
        )
    }

    /// Fetch the live instance type catalog from EC2.
    pub async fn fetch(client: &Ec2Client) -> Result<Self> {
        let mut specs = Vec::new();
        let mut pages = client.describe_instance_types().into_paginator().send();

        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| MigratectlError::PricingApi {
                operation: "DescribeInstanceTypes".to_string(),
                message: e.to_string(),
                source: Some(Box::new(e)),
            })?;
            for info in page.instance_types() {
                let name = match info.instance_type() {
                    Some(t) => t.as_str().to_string(),
                    None => continue,
                };
                let vcpus = info
                    .v_cpu_info()
                    .and_then(|v| v.default_v_cpus())
                    .unwrap_or(0);
                let mib = info.memory_info().and_then(|m| m.size_in_mib()).unwrap_or(0);
                if vcpus <= 0 || mib <= 0 {
                    continue;
                }
                specs.push(InstanceSpec {
                    name,
                    vcpus: vcpus as u32,
                    ram_gib: mib as f64 / 1024.0,
                });
            }
        }

        if specs.is_empty() {
            return Err(MigratectlError::PricingApi {
                operation: "DescribeInstanceTypes".to_string(),
                message: "catalog came back empty".to_string(),
                source: None,
            });
        }

        info!("Fetched {} instance types from EC2", specs.len());
        Ok(Self::new(specs))
    }

    pub fn specs(&self) -> &[InstanceSpec] {
        &self.specs
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Smallest vCPU count in the table. Host requirements below this are
    /// clamped up before matching.
    pub fn min_vcpus(&self) -> u32 {
        self.specs.iter().map(|s| s.vcpus).min().unwrap_or(1)
    }

    /// Smallest RAM size in the table, in GiB.
    pub fn min_ram_gib(&self) -> f64 {
        self.specs
            .iter()
            .map(|s| s.ram_gib)
            .reduce(f64::min)
            .unwrap_or(0.0)
    }
}
