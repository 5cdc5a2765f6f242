// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2026 Alex Sizykh

use rand::Rng;

use crate::app::types::ReservationGroup;

/// Pick one reservation group uniformly at random. The generator is injected
/// so tests can seed it; production callers pass a per-process source.
/// Returns `None` only for an empty slice, which the discovery ranking
/// upstream already rules out.
pub fn select_group<'a, R: Rng + ?Sized>(
    groups: &'a [ReservationGroup],
    rng: &mut R,
) -> Option<&'a ReservationGroup> {
    if groups.is_empty() {
        return None;
    }
    let index = rng.random_range(0..groups.len());
    groups.get(index)
}
