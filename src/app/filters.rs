// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2026 Alex Sizykh

use crate::app::types::{Filter, FilterSet};

pub const NETWORK_TAG_FILTER: &str = "tag:NetworkId";
pub const ROLE_TAG_FILTER: &str = "tag:Role";
pub const STATE_FILTER: &str = "instance-state-name";
pub const RUNNING_STATE: &str = "running";

/// Build the predicate set for one role tier: network scope, role scope and
/// the running-state constraint. Pure and deterministic; malformed inputs
/// simply produce a set that matches nothing.
pub fn build_filter(network_id: &str, role: &str) -> FilterSet {
    vec![
        Filter {
            name: NETWORK_TAG_FILTER.to_string(),
            values: vec![network_id.to_string()],
        },
        Filter {
            name: ROLE_TAG_FILTER.to_string(),
            values: vec![role.to_string()],
        },
        Filter {
            name: STATE_FILTER.to_string(),
            values: vec![RUNNING_STATE.to_string()],
        },
    ]
}
