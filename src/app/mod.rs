// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2026 Alex Sizykh

pub mod credentials;
pub mod discovery;
pub mod dispatch;
pub mod errors;
pub mod filters;
pub mod ports;
pub mod selector;
pub mod types;
pub mod usecases;
