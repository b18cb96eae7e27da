//! Instance matching
//!
//! Maps a host's (vCPU, RAM) requirement onto the smallest instance types
//! that satisfy it. The selection rule, made explicit here:
//!
//! 1. Keep only types with `vcpus >= required && ram_gib >= required`.
//! 2. Order by `(vcpus, ram_gib, name)` ascending.
//! 3. The candidate set is every type sharing the minimal `(vcpus, ram_gib)`
//!    capacity point. Capacity is a proxy for cost; among equally-sized
//!    candidates the final pick is whichever prices cheapest on-demand, with
//!    lexicographic name as the last resort (see `orchestrator::process_host`).
//!
//! A requirement that exceeds the largest known type is `NoMatchFound`.

use crate::catalog::{InstanceCatalog, InstanceSpec};
use crate::error::{MigratectlError, Result};

/// Return the capacity-minimal candidate set for a requirement.
///
/// The returned slice of specs all share the same `(vcpus, ram_gib)` point and
/// are ordered by name.
pub fn match_candidates<'a>(
    catalog: &'a InstanceCatalog,
    vcpus: u32,
    ram_gib: f64,
) -> Result<Vec<&'a InstanceSpec>> {
    let mut fits: Vec<&InstanceSpec> = catalog
        .specs()
        .iter()
        .filter(|s| s.vcpus >= vcpus && s.ram_gib >= ram_gib)
        .collect();

    if fits.is_empty() {
        return Err(MigratectlError::NoMatchFound { vcpus, ram_gib });
    }

    fits.sort_by(|a, b| {
        (a.vcpus, a.ram_gib, &a.name)
            .partial_cmp(&(b.vcpus, b.ram_gib, &b.name))
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let best_vcpus = fits[0].vcpus;
    let best_ram = fits[0].ram_gib;
    Ok(fits
        .into_iter()
        .take_while(|s| s.vcpus == best_vcpus && s.ram_gib == best_ram)
        .collect())
}

/// Single best-fit spec, ignoring price (first candidate by name).
pub fn best_fit<'a>(
    catalog: &'a InstanceCatalog,
    vcpus: u32,
    ram_gib: f64,
) -> Result<&'a InstanceSpec> {
    let candidates = match_candidates(catalog, vcpus, ram_gib)?;
    // match_candidates never returns an empty Ok
    Ok(candidates[0])
}
