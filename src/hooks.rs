//! Extension hooks
//!
//! Pipeline extension points modeled as ordered lists of trait objects held
//! in an explicit registry. The registry is built at startup, handed to the
//! orchestrator, and dropped with it. There is no global registration and
//! nothing runs as an import side effect.
//!
//! A failing hook is logged and skipped; hooks can reshape the data flowing
//! through the pipeline but can never abort the batch.

use crate::cost::CostEstimate;
use crate::error::Result;
use crate::inventory::HostRecord;
use crate::report::BatchReport;
use tracing::{info, warn};

/// Runs after the inventory is loaded, before dispatch.
pub trait PreProcessHook: Send + Sync {
    fn name(&self) -> &str;
    fn run(&self, hosts: &mut Vec<HostRecord>) -> Result<()>;
}

/// Runs after collection, before report emission.
pub trait PostProcessHook: Send + Sync {
    fn name(&self) -> &str;
    fn run(&self, estimates: &mut Vec<CostEstimate>) -> Result<()>;
}

/// Runs after the built-in reports are written.
pub trait ReportHook: Send + Sync {
    fn name(&self) -> &str;
    fn run(&self, report: &BatchReport) -> Result<()>;
}

/// Ordered hook lists for the three pipeline extension points.
#[derive(Default)]
pub struct ExtensionRegistry {
    pre_process: Vec<Box<dyn PreProcessHook>>,
    post_process: Vec<Box<dyn PostProcessHook>>,
    report: Vec<Box<dyn ReportHook>>,
}

impl ExtensionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_pre_process(&mut self, hook: Box<dyn PreProcessHook>) {
        self.pre_process.push(hook);
    }

    pub fn register_post_process(&mut self, hook: Box<dyn PostProcessHook>) {
        self.post_process.push(hook);
    }

    pub fn register_report(&mut self, hook: Box<dyn ReportHook>) {
        self.report.push(hook);
    }

    pub fn run_pre_process(&self, hosts: &mut Vec<HostRecord>) {
        for hook in &self.pre_process {
            info!("Running pre-process hook: {}", hook.name());
            if let Err(e) = hook.run(hosts) {
                warn!("Pre-process hook {} failed: {}", hook.name(), e);
            }
        }
    }

    pub fn run_post_process(&self, estimates: &mut Vec<CostEstimate>) {
        for hook in &self.post_process {
            info!("Running post-process hook: {}", hook.name());
            if let Err(e) = hook.run(estimates) {
                warn!("Post-process hook {} failed: {}", hook.name(), e);
            }
        }
    }

    pub fn run_report(&self, report: &BatchReport) {
        for hook in &self.report {
            info!("Running report hook: {}", hook.name());
            if let Err(e) = hook.run(report) {
                warn!("Report hook {} failed: {}", hook.name(), e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MigratectlError;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    struct TagHosts {
        calls: Arc<AtomicU32>,
    }

    impl PreProcessHook for TagHosts {
        fn name(&self) -> &str {
            "tag-hosts"
        }

        fn run(&self, hosts: &mut Vec<HostRecord>) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            hosts.retain(|h| !h.name.starts_with("template-"));
            Ok(())
        }
    }

    struct AlwaysFails;

    impl PreProcessHook for AlwaysFails {
        fn name(&self) -> &str {
            "always-fails"
        }

        fn run(&self, _hosts: &mut Vec<HostRecord>) -> Result<()> {
            Err(MigratectlError::Report("boom".to_string()))
        }
    }

    fn host(name: &str) -> HostRecord {
        HostRecord {
            name: name.to_string(),
            cpus: 2,
            ram_gib: 4.0,
            disk_gib: 20.0,
            os: String::new(),
        }
    }

    #[test]
    fn hooks_run_in_registration_order_and_failures_are_isolated() {
        let calls = Arc::new(AtomicU32::new(0));
        let mut registry = ExtensionRegistry::new();
        registry.register_pre_process(Box::new(AlwaysFails));
        registry.register_pre_process(Box::new(TagHosts {
            calls: Arc::clone(&calls),
        }));

        let mut hosts = vec![host("web-01"), host("template-rhel8")];
        registry.run_pre_process(&mut hosts);

        // The failing hook didn't stop the second one
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(hosts.len(), 1);
        assert_eq!(hosts[0].name, "web-01");
    }
}
