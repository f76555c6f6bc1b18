//! Property-based tests for the dependency resolver.
//!
//! Requests are drawn from the sample catalog; the properties must hold for
//! every combination the generator produces.

#[cfg(test)]
mod proptest_tests {
    use crate::catalog::{Catalog, UnitRef};
    use crate::resolver::{resolve, Mode};
    use crate::test_support::{sample_catalog, sample_manifest};
    use proptest::prelude::*;

    const REQUESTABLE: &[&str] = &[
        "database",
        "database:postgres",
        "database:sqlite",
        "redis",
        "worker",
        "scheduler",
        "cron",
        "auth",
        "billing",
    ];

    fn request() -> impl Strategy<Value = Vec<&'static str>> {
        prop::collection::vec(prop::sample::select(REQUESTABLE), 0..5)
    }

    fn parse(catalog: &Catalog, names: &[&str]) -> Vec<UnitRef> {
        names.iter().map(|n| catalog.parse_ref(n).unwrap()).collect()
    }

    proptest! {
        /// Property: a successful auto resolution is closed under dependencies
        /// and service requirements.
        #[test]
        fn auto_resolution_is_closed(names in request()) {
            let catalog = sample_catalog();
            let units = parse(&catalog, &names);
            let resolution = resolve(&catalog, &sample_manifest(), &units, &[], Mode::Auto).unwrap();
            prop_assume!(resolution.is_ok());

            for name in resolution.target_components.keys() {
                let component = catalog.component(name).unwrap();
                for dependency in &component.dependencies {
                    prop_assert!(
                        resolution.target_components.contains_key(&dependency.name),
                        "'{}' is enabled without its dependency '{}'",
                        name,
                        dependency.name
                    );
                }
            }
            for name in &resolution.target_services {
                let service = catalog.service(name).unwrap();
                for required in &service.requires {
                    prop_assert!(resolution.target_components.contains_key(&required.name));
                }
            }
        }

        /// Property: strict and auto agree whenever strict succeeds.
        #[test]
        fn strict_success_matches_auto(names in request()) {
            let catalog = sample_catalog();
            let units = parse(&catalog, &names);
            let strict = resolve(&catalog, &sample_manifest(), &units, &[], Mode::Strict).unwrap();
            prop_assume!(strict.is_ok());
            let auto = resolve(&catalog, &sample_manifest(), &units, &[], Mode::Auto).unwrap();
            prop_assert_eq!(strict.target_components, auto.target_components);
            prop_assert!(auto.implied.is_empty());
        }

        /// Property: resolution is deterministic.
        #[test]
        fn resolution_is_deterministic(names in request()) {
            let catalog = sample_catalog();
            let units = parse(&catalog, &names);
            let first = resolve(&catalog, &sample_manifest(), &units, &[], Mode::Auto).unwrap();
            let second = resolve(&catalog, &sample_manifest(), &units, &[], Mode::Auto).unwrap();
            prop_assert_eq!(first, second);
        }

        /// Property: additions always list dependencies before dependents.
        #[test]
        fn additions_follow_topological_order(names in request()) {
            let catalog = sample_catalog();
            let units = parse(&catalog, &names);
            let resolution = resolve(&catalog, &sample_manifest(), &units, &[], Mode::Auto).unwrap();
            let positions: Vec<usize> = resolution
                .additions
                .iter()
                .map(|r| catalog.topo_index(&r.name).unwrap())
                .collect();
            prop_assert!(positions.windows(2).all(|w| w[0] < w[1]));
        }
    }
}
