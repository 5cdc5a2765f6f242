// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2026 Alex Sizykh

use futures_util::future::join_all;

use crate::app::errors::{AppError, AppErrorKind, AppResult, codes};
use crate::app::filters::build_filter;
use crate::app::ports::ComputeQueryPort;
use crate::app::types::{TierMatch, TierOutcome, TierProbe};

/// Query every role tier and return the first one, in the priority order of
/// `tiers`, whose query succeeded with at least one reservation group.
///
/// The per-tier queries have no data dependency on each other, so they are
/// issued concurrently; ranking happens afterwards over the joined results,
/// which preserve tier order. A failed or empty tier is skipped, never
/// fatal; each tier is attempted exactly once. If no tier is viable the
/// whole discovery fails with `no_instances`.
pub async fn discover(
    compute: &dyn ComputeQueryPort,
    network_id: &str,
    tiers: &[String],
) -> AppResult<TierMatch> {
    let queries = tiers.iter().map(|tier| {
        let filters = build_filter(network_id, tier);
        async move { compute.query_instances(&filters).await }
    });
    let results = join_all(queries).await;

    let mut probes = Vec::with_capacity(tiers.len());
    let mut matched = None;
    for (tier, result) in tiers.iter().zip(results) {
        match result {
            Ok(groups) => {
                if groups.is_empty() {
                    tracing::debug!(%tier, "tier skipped: zero reservation groups");
                    probes.push(TierProbe {
                        tier: tier.clone(),
                        outcome: TierOutcome::Empty,
                    });
                } else {
                    probes.push(TierProbe {
                        tier: tier.clone(),
                        outcome: TierOutcome::Groups(groups.len()),
                    });
                    if matched.is_none() {
                        matched = Some((tier.clone(), groups));
                    }
                }
            }
            Err(err) => {
                tracing::warn!(%tier, error = %err, "tier skipped: discovery query failed");
                probes.push(TierProbe {
                    tier: tier.clone(),
                    outcome: TierOutcome::Failed(err),
                });
            }
        }
    }

    match matched {
        Some((tier, groups)) => {
            tracing::info!(%tier, groups = groups.len(), "tier matched");
            Ok(TierMatch {
                tier,
                groups,
                probes,
            })
        }
        None => Err(AppError::with_message(
            AppErrorKind::NotFound,
            codes::NO_INSTANCES,
            format!("no running instances found for network {network_id} in any tier"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::app::filters::ROLE_TAG_FILTER;
    use crate::app::types::{FilterSet, Instance, ReservationGroup};

    fn tiers(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    fn group_with_instances(id: &str, count: usize) -> ReservationGroup {
        ReservationGroup {
            id: id.to_string(),
            instances: (0..count)
                .map(|i| Instance {
                    id: format!("{id}-i{i}"),
                    public_address: Some(format!("{id}-i{i}.example")),
                })
                .collect(),
        }
    }

    /// Scripted compute port keyed by the role predicate of the incoming
    /// filter set. Counts queries per role.
    struct ScriptedCompute {
        by_role: HashMap<String, AppResult<Vec<ReservationGroup>>>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedCompute {
        fn new(by_role: HashMap<String, AppResult<Vec<ReservationGroup>>>) -> Self {
            Self {
                by_role,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn queried_roles(&self) -> Vec<String> {
            self.calls.lock().expect("calls lock").clone()
        }
    }

    fn role_of(filters: &FilterSet) -> String {
        filters
            .iter()
            .find(|filter| filter.name == ROLE_TAG_FILTER)
            .and_then(|filter| filter.values.first())
            .cloned()
            .expect("filter set should carry a role predicate")
    }

    #[async_trait]
    impl ComputeQueryPort for ScriptedCompute {
        async fn query_instances(
            &self,
            filters: &FilterSet,
        ) -> AppResult<Vec<ReservationGroup>> {
            let role = role_of(filters);
            self.calls.lock().expect("calls lock").push(role.clone());
            self.by_role
                .get(&role)
                .cloned()
                .unwrap_or_else(|| Ok(Vec::new()))
        }
    }

    fn query_error() -> AppError {
        AppError::with_message(
            AppErrorKind::Internal,
            codes::QUERY_FAILURE,
            "control plane unavailable",
        )
    }

    #[tokio::test]
    async fn highest_viable_tier_wins_regardless_of_lower_tiers() {
        let compute = ScriptedCompute::new(HashMap::from([
            ("Validator".to_string(), Ok(vec![group_with_instances("v", 1)])),
            ("Maker".to_string(), Ok(vec![group_with_instances("m", 2)])),
            ("Observer".to_string(), Ok(vec![group_with_instances("o", 3)])),
        ]));
        let matched = discover(&compute, "net-1", &tiers(&["Validator", "Maker", "Observer"]))
            .await
            .unwrap();
        assert_eq!(matched.tier, "Validator");
        assert_eq!(matched.groups[0].id, "v");
    }

    #[tokio::test]
    async fn empty_validator_falls_back_to_maker() {
        let compute = ScriptedCompute::new(HashMap::from([
            ("Validator".to_string(), Ok(Vec::new())),
            ("Maker".to_string(), Ok(vec![group_with_instances("m", 1)])),
            ("Observer".to_string(), Ok(vec![group_with_instances("o", 1)])),
        ]));
        let matched = discover(&compute, "net-1", &tiers(&["Validator", "Maker", "Observer"]))
            .await
            .unwrap();
        assert_eq!(matched.tier, "Maker");
    }

    #[tokio::test]
    async fn only_observer_populated_selects_observer() {
        let compute = ScriptedCompute::new(HashMap::from([
            ("Validator".to_string(), Ok(Vec::new())),
            ("Maker".to_string(), Ok(Vec::new())),
            ("Observer".to_string(), Ok(vec![group_with_instances("o", 1)])),
        ]));
        let matched = discover(&compute, "net-1", &tiers(&["Validator", "Maker", "Observer"]))
            .await
            .unwrap();
        assert_eq!(matched.tier, "Observer");
    }

    #[tokio::test]
    async fn failed_higher_tier_is_skipped_not_fatal() {
        let compute = ScriptedCompute::new(HashMap::from([
            ("Validator".to_string(), Err(query_error())),
            ("Maker".to_string(), Ok(vec![group_with_instances("m", 1)])),
        ]));
        let matched = discover(&compute, "net-1", &tiers(&["Validator", "Maker"]))
            .await
            .unwrap();
        assert_eq!(matched.tier, "Maker");
        // Error and empty stay distinguishable in the probe trail.
        assert!(matches!(matched.probes[0].outcome, TierOutcome::Failed(_)));
        assert!(matches!(matched.probes[1].outcome, TierOutcome::Groups(1)));
    }

    #[tokio::test]
    async fn all_tiers_empty_or_failed_yields_no_instances() {
        let compute = ScriptedCompute::new(HashMap::from([
            ("Validator".to_string(), Err(query_error())),
            ("Maker".to_string(), Ok(Vec::new())),
            ("Observer".to_string(), Ok(Vec::new())),
        ]));
        let err = discover(&compute, "net-1", &tiers(&["Validator", "Maker", "Observer"]))
            .await
            .unwrap_err();
        assert_eq!(err.code(), codes::NO_INSTANCES);
        assert_eq!(err.kind(), AppErrorKind::NotFound);
    }

    #[tokio::test]
    async fn every_tier_is_queried_exactly_once() {
        let compute = ScriptedCompute::new(HashMap::from([(
            "Validator".to_string(),
            Ok(vec![group_with_instances("v", 1)]),
        )]));
        let _ = discover(&compute, "net-1", &tiers(&["Validator", "Maker", "Observer"])).await;
        let mut roles = compute.queried_roles();
        roles.sort();
        assert_eq!(roles, vec!["Maker", "Observer", "Validator"]);
    }
}
