// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2026 Alex Sizykh

use async_trait::async_trait;

use crate::app::errors::AppResult;
use crate::app::types::Credential;

#[async_trait]
/// One established secure channel to a single instance. Owned exclusively
/// by the dispatch loop; never pooled or reused across instances.
pub trait RemoteSession: Send {
    /// Submit a command and return its captured output.
    async fn run(&mut self, command: &str) -> AppResult<String>;

    /// Tear the channel down. Idempotent: safe to call again after a failed
    /// run or a previous destroy.
    async fn destroy(&mut self);
}

#[async_trait]
/// Secure remote session establishment boundary.
pub trait RemoteSessionPort: Send + Sync {
    async fn connect(
        &self,
        address: &str,
        user: &str,
        credential: &Credential,
    ) -> AppResult<Box<dyn RemoteSession>>;
}
