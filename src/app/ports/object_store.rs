// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2026 Alex Sizykh

use async_trait::async_trait;

use crate::app::errors::AppResult;

#[async_trait]
/// Object storage fetch boundary.
pub trait ObjectStorePort: Send + Sync {
    async fn get_object(&self, bucket: &str, key: &str) -> AppResult<Vec<u8>>;
}
