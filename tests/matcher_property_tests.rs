//! Property-based tests for instance matching
//!
//! These tests use proptest to generate requirements across the whole
//! built-in catalog range and verify that matching always returns a
//! capacity-minimal, requirement-satisfying candidate set.

use migratectl::catalog::InstanceCatalog;
use migratectl::error::MigratectlError;
use migratectl::matcher::{best_fit, match_candidates};
use proptest::prelude::*;

proptest! {
    #[test]
    fn candidates_always_satisfy_requirement(
        vcpus in 1u32..=96u32,
        ram_gib in 0.5f64..=768.0f64,
    ) {
        let catalog = InstanceCatalog::builtin();
        let candidates = match_candidates(&catalog, vcpus, ram_gib).unwrap();
        prop_assert!(!candidates.is_empty());
        for c in &candidates {
            prop_assert!(c.vcpus >= vcpus);
            prop_assert!(c.ram_gib >= ram_gib);
        }
    }

    #[test]
    fn no_smaller_candidate_also_fits(
        vcpus in 1u32..=96u32,
        ram_gib in 0.5f64..=768.0f64,
    ) {
        let catalog = InstanceCatalog::builtin();
        let chosen = best_fit(&catalog, vcpus, ram_gib).unwrap();
        for spec in catalog.specs() {
            if spec.vcpus >= vcpus && spec.ram_gib >= ram_gib {
                // Every satisfying spec is at least as big as the chosen one
                prop_assert!(
                    (chosen.vcpus, chosen.ram_gib) <= (spec.vcpus, spec.ram_gib),
                    "{} ({}vcpu/{}GiB) beat chosen {} ({}vcpu/{}GiB)",
                    spec.name, spec.vcpus, spec.ram_gib,
                    chosen.name, chosen.vcpus, chosen.ram_gib,
                );
            }
        }
    }

    #[test]
    fn all_candidates_share_one_capacity_point(
        vcpus in 1u32..=96u32,
        ram_gib in 0.5f64..=768.0f64,
    ) {
        let catalog = InstanceCatalog::builtin();
        let candidates = match_candidates(&catalog, vcpus, ram_gib).unwrap();
        let first = candidates[0];
        for c in &candidates {
            prop_assert_eq!(c.vcpus, first.vcpus);
            prop_assert_eq!(c.ram_gib, first.ram_gib);
        }
    }

    #[test]
    fn oversized_cpu_requirement_never_matches(vcpus in 97u32..=4096u32) {
        let catalog = InstanceCatalog::builtin();
        let err = match_candidates(&catalog, vcpus, 1.0).unwrap_err();
        prop_assert!(matches!(err, MigratectlError::NoMatchFound { .. }));
    }
}

#[test]
fn oversized_ram_requirement_never_matches() {
    let catalog = InstanceCatalog::builtin();
    let err = match_candidates(&catalog, 1, 769.0).unwrap_err();
    assert!(matches!(err, MigratectlError::NoMatchFound { .. }));
}

#[test]
fn exact_four_sixteen_prefers_exact_fit() {
    let catalog = InstanceCatalog::builtin();
    let candidates = match_candidates(&catalog, 4, 16.0).unwrap();
    // Both 4/16 types qualify; the 8/32 types do not appear at all
    for c in &candidates {
        assert_eq!((c.vcpus, c.ram_gib), (4, 16.0));
    }
    assert!(candidates.iter().any(|c| c.name == "t3.xlarge"));
    assert!(candidates.iter().any(|c| c.name == "m5.xlarge"));
}
