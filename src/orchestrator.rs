//! Estimation pipeline orchestration
//!
//! Drives a run through its phases: read the inventory, build the catalog,
//! fan per-host work out across a bounded worker pool, collect results in
//! input order, emit reports. Host failures are isolated; only input
//! validation and report-write failures abort the batch.

use crate::catalog::{InstanceCatalog, InstanceSpec};
use crate::config::Config;
use crate::cost::{self, CostEstimate};
use crate::error::{MigratectlError, Result};
use crate::hooks::ExtensionRegistry;
use crate::inventory::{self, HostRecord};
use crate::matcher::match_candidates;
use crate::pricing::{region_location, AwsPricingSource, Platform, PriceCache, PriceQuote, PricingSource};
use crate::report::{self, BatchReport, HostFailure};
use crate::utils::format_duration;
use chrono::Utc;
use futures::future::select_all;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Pipeline phases, in order. `Failed` is terminal for batch-level errors
/// only; per-host failures never leave `Collecting`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Reading,
    Dispatching,
    Collecting,
    Emitting,
    Done,
    Failed,
}

/// Externally supplied paths for one estimation run.
#[derive(Debug, Clone)]
pub struct EstimateJob {
    pub input: PathBuf,
    pub output_csv: PathBuf,
    pub output_pdf: PathBuf,
}

/// One host's processing result. The unpriced tally is kept even when the
/// host ultimately fails, so a batch of unpriceable hosts still reports
/// which types the pricing service was missing.
pub struct HostOutcome {
    pub estimate: Result<CostEstimate>,
    /// Candidate types skipped because no price existed for them.
    pub unpriced: Vec<String>,
}

/// What the worker pool produced, before report assembly.
pub struct ProcessedBatch {
    pub estimates: Vec<CostEstimate>,
    pub failures: Vec<HostFailure>,
    pub unpriced_types: HashMap<String, u32>,
}

pub struct Orchestrator {
    config: Config,
    hooks: ExtensionRegistry,
    phase: Phase,
}

impl Orchestrator {
    pub fn new(config: Config, hooks: ExtensionRegistry) -> Self {
        Self {
            config,
            hooks,
            phase: Phase::Idle,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    fn set_phase(&mut self, next: Phase) {
        debug!("Phase {:?} -> {:?}", self.phase, next);
        self.phase = next;
    }

    /// Run the full pipeline against AWS.
    pub async fn run(&mut self, job: &EstimateJob) -> Result<BatchReport> {
        let result = self.run_inner(job).await;
        match result {
            Ok(report) => {
                self.set_phase(Phase::Done);
                Ok(report)
            }
            Err(e) => {
                self.set_phase(Phase::Failed);
                Err(e)
            }
        }
    }

    async fn run_inner(&mut self, job: &EstimateJob) -> Result<BatchReport> {
        let started = Instant::now();
        let region = self.config.aws.region.clone();

        self.set_phase(Phase::Reading);
        // An unknown region or a malformed workbook must fail before any
        // remote call is made
        region_location(&region)?;
        let mut hosts = inventory::load_inventory(&job.input)?;
        info!("Loaded {} hosts from {}", hosts.len(), job.input.display());

        let aws = AwsPricingSource::connect(&region, &self.config.aws.pricing_endpoint_region).await;
        let catalog = if self.config.estimate.builtin_catalog {
            InstanceCatalog::builtin()
        } else {
            InstanceCatalog::fetch(aws.ec2_client()).await?
        };
        inventory::clamp_to_catalog(&mut hosts, &catalog);

        self.hooks.run_pre_process(&mut hosts);

        let source: Arc<dyn PricingSource> = Arc::new(aws);
        let cache = Arc::new(PriceCache::new(
            source,
            self.config.estimate.retry_attempts,
            Duration::from_secs(self.config.estimate.request_timeout_secs),
        ));

        let batch = self.process_hosts(hosts, Arc::new(catalog), cache).await;

        let mut estimates = batch.estimates;
        self.hooks.run_post_process(&mut estimates);

        let report = BatchReport {
            estimates,
            failures: batch.failures,
            unpriced_types: batch.unpriced_types,
            region,
            generated_at: Utc::now(),
        };

        self.set_phase(Phase::Emitting);
        report::csv::write_csv(&job.output_csv, &report)?;
        report::pdf::write_pdf(&job.output_pdf, &report, self.config.estimate.pie_threshold_pct)?;
        self.hooks.run_report(&report);

        info!(
            "Estimated {} hosts ({} failed) in {}",
            report.estimates.len(),
            report.failures.len(),
            format_duration(started.elapsed())
        );
        Ok(report)
    }

    /// Fan the host list out across the worker pool and collect results in
    /// input order.
    ///
    /// Tasks complete in any order; every result is tagged with its input
    /// index and the final vectors are rebuilt from those indices.
    pub async fn process_hosts(
        &mut self,
        hosts: Vec<HostRecord>,
        catalog: Arc<InstanceCatalog>,
        cache: Arc<PriceCache>,
    ) -> ProcessedBatch {
        let workers = self.config.estimate.workers.max(1);
        let region = self.config.aws.region.clone();
        let total = hosts.len();

        self.set_phase(Phase::Dispatching);
        info!("Dispatching {} hosts across {} workers", total, workers);

        let pb = ProgressBar::new(total as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} hosts")
                .expect("Progress bar template should be valid"),
        );

        let mut slots: Vec<Option<CostEstimate>> = (0..total).map(|_| None).collect();
        let mut failures: Vec<(usize, HostFailure)> = Vec::new();
        let mut unpriced_types: HashMap<String, u32> = HashMap::new();

        type Joined =
            std::result::Result<(usize, String, HostOutcome), tokio::task::JoinError>;
        fn record(
            joined: Joined,
            slots: &mut [Option<CostEstimate>],
            failures: &mut Vec<(usize, HostFailure)>,
            unpriced_types: &mut HashMap<String, u32>,
        ) {
            match joined {
                Ok((idx, name, outcome)) => {
                    for t in outcome.unpriced {
                        *unpriced_types.entry(t).or_insert(0) += 1;
                    }
                    match outcome.estimate {
                        Ok(estimate) => slots[idx] = Some(estimate),
                        Err(e) => {
                            warn!("Host {} failed: {}", name, e);
                            failures.push((
                                idx,
                                HostFailure {
                                    host: name,
                                    reason: e.to_string(),
                                },
                            ));
                        }
                    }
                }
                Err(e) => error!("Worker task failed: {}", e),
            }
        }

        let mut handles: Vec<JoinHandle<(usize, String, HostOutcome)>> = Vec::new();
        for (idx, host) in hosts.into_iter().enumerate() {
            let catalog = Arc::clone(&catalog);
            let cache = Arc::clone(&cache);
            let region = region.clone();
            let pb = pb.clone();
            handles.push(tokio::spawn(async move {
                let name = host.name.clone();
                let result = process_host(&host, &catalog, &cache, &region).await;
                pb.inc(1);
                (idx, name, result)
            }));

            if handles.len() >= workers {
                let (joined, _, remaining) = select_all(handles).await;
                handles = remaining;
                record(joined, &mut slots, &mut failures, &mut unpriced_types);
            }
        }

        self.set_phase(Phase::Collecting);
        for handle in handles {
            record(
                handle.await,
                &mut slots,
                &mut failures,
                &mut unpriced_types,
            );
        }
        pb.finish_and_clear();

        failures.sort_by_key(|(idx, _)| *idx);
        ProcessedBatch {
            estimates: slots.into_iter().flatten().collect(),
            failures: failures.into_iter().map(|(_, f)| f).collect(),
            unpriced_types,
        }
    }
}

/// Match, price, and aggregate one host.
///
/// The matcher hands back every type at the minimal capacity point; among
/// those, the cheapest on-demand rate wins (candidates arrive name-sorted,
/// so equal prices tie-break lexicographically). Types the pricing service
/// has no entry for are skipped and tallied, not fatal; the next candidate
/// gets a chance.
pub async fn process_host(
    host: &HostRecord,
    catalog: &InstanceCatalog,
    cache: &PriceCache,
    region: &str,
) -> HostOutcome {
    let candidates = match match_candidates(catalog, host.cpus, host.ram_gib) {
        Ok(candidates) => candidates,
        Err(e) => {
            return HostOutcome {
                estimate: Err(e),
                unpriced: Vec::new(),
            }
        }
    };
    let platform = Platform::from_os(&host.os);

    let mut unpriced = Vec::new();
    let mut best: Option<(&InstanceSpec, PriceQuote)> = None;

    for spec in candidates {
        match cache.quote(&spec.name, platform, region).await {
            Ok(quote) => {
                let cheaper = match &best {
                    Some((_, current)) => {
                        quote.rates.on_demand_hourly < current.rates.on_demand_hourly
                    }
                    None => true,
                };
                if cheaper {
                    best = Some((spec, quote));
                }
            }
            Err(MigratectlError::PriceUnavailable { .. }) => {
                debug!("No price for candidate {}", spec.name);
                unpriced.push(spec.name.clone());
            }
            Err(e) => {
                return HostOutcome {
                    estimate: Err(e),
                    unpriced,
                }
            }
        }
    }

    let estimate = match best {
        Some((spec, quote)) => Ok(cost::estimate(host, spec, &quote)),
        None => Err(MigratectlError::PriceUnavailable {
            instance_type: unpriced.join(", "),
            region: region.to_string(),
            detail: "no candidate instance type could be priced".to_string(),
        }),
    };

    HostOutcome { estimate, unpriced }
}
