// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2026 Alex Sizykh

use std::sync::Arc;

use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::app::errors::{AppError, AppErrorKind, AppResult, codes};
use crate::app::ports::{ComputeQueryPort, KeyDecryptPort, ObjectStorePort, RemoteSessionPort};
use crate::app::types::InvocationReport;
use crate::app::{credentials, discovery, dispatch, selector};
use crate::config::Config;

/// One scheduled backup invocation, wired over the external collaborators.
#[derive(Clone)]
pub struct UseCases {
    compute: Arc<dyn ComputeQueryPort>,
    objects: Arc<dyn ObjectStorePort>,
    kms: Arc<dyn KeyDecryptPort>,
    sessions: Arc<dyn RemoteSessionPort>,
}

impl UseCases {
    pub fn new(
        compute: Arc<dyn ComputeQueryPort>,
        objects: Arc<dyn ObjectStorePort>,
        kms: Arc<dyn KeyDecryptPort>,
        sessions: Arc<dyn RemoteSessionPort>,
    ) -> Self {
        Self {
            compute,
            objects,
            kms,
            sessions,
        }
    }

    pub async fn run_backup(&self, config: &Config) -> AppResult<InvocationReport> {
        let mut rng = StdRng::from_os_rng();
        self.run_backup_with_rng(config, &mut rng).await
    }

    /// Discover the target group and launch the backup command on each of
    /// its instances. Discovery and credential resolution have no data
    /// dependency on each other and run concurrently; their results are
    /// joined here, at the dispatch boundary.
    pub async fn run_backup_with_rng<R: Rng + Send>(
        &self,
        config: &Config,
        rng: &mut R,
    ) -> AppResult<InvocationReport> {
        tracing::info!(network = %config.network_id, "scheduled backup run starting");

        let (discovered, credential) = tokio::join!(
            discovery::discover(self.compute.as_ref(), &config.network_id, &config.role_tiers),
            credentials::resolve(
                self.objects.as_ref(),
                self.kms.as_ref(),
                config.ssh_password.as_deref(),
                &config.bucket,
                &config.object_key,
                &config.kms_key_ref,
            ),
        );
        let credential = credential?;
        let matched = discovered?;

        let group = selector::select_group(&matched.groups, rng).ok_or_else(|| {
            AppError::with_message(
                AppErrorKind::Internal,
                codes::INTERNAL_ERROR,
                "matched tier carried no reservation groups",
            )
        })?;
        tracing::info!(
            tier = %matched.tier,
            groups = matched.groups.len(),
            group = %group.id,
            instances = group.instances.len(),
            "reservation group selected"
        );

        let outcomes = dispatch::dispatch(
            self.sessions.as_ref(),
            &config.ssh_user,
            &group.instances,
            &credential,
            &config.backup_command,
        )
        .await;

        Ok(InvocationReport {
            tier: matched.tier.clone(),
            group_id: group.id.clone(),
            outcomes,
        })
    }
}
