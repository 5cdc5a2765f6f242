// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2026 Alex Sizykh

use async_trait::async_trait;

use crate::app::errors::AppResult;
use crate::app::types::{FilterSet, ReservationGroup};

#[async_trait]
/// Compute-instance query boundary. A failed query and a successful query
/// with zero matches are distinct outcomes: `Err` vs `Ok(vec![])`.
pub trait ComputeQueryPort: Send + Sync {
    async fn query_instances(&self, filters: &FilterSet) -> AppResult<Vec<ReservationGroup>>;
}
