// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2026 Alex Sizykh

use crate::app::errors::{AppError, AppErrorKind, AppResult, codes};
use crate::app::ports::RemoteSessionPort;
use crate::app::types::{Credential, DispatchOutcome, Instance};

/// Wrap a command so the remote job survives the session closing. The
/// dispatcher never waits for the job itself, only for the launch request.
pub fn detach_command(command: &str) -> String {
    format!("screen -d -m {command}")
}

/// Launch `command` on every instance of the chosen group, one session at a
/// time. A connect or launch failure on one instance is recorded and the
/// loop moves on; nothing here aborts the batch. Every established session
/// is destroyed before the next instance is attempted, on both the success
/// and failure paths of the run step.
pub async fn dispatch(
    sessions: &dyn RemoteSessionPort,
    user: &str,
    instances: &[Instance],
    credential: &Credential,
    command: &str,
) -> Vec<DispatchOutcome> {
    let wrapped = detach_command(command);
    let mut outcomes = Vec::with_capacity(instances.len());
    for instance in instances {
        outcomes.push(dispatch_one(sessions, user, instance, credential, &wrapped).await);
    }
    outcomes
}

async fn dispatch_one(
    sessions: &dyn RemoteSessionPort,
    user: &str,
    instance: &Instance,
    credential: &Credential,
    wrapped_command: &str,
) -> DispatchOutcome {
    let Some(address) = instance.public_address.as_deref() else {
        tracing::warn!(instance = %instance.id, "instance skipped: no public address assigned");
        return outcome(
            instance,
            Err(AppError::with_message(
                AppErrorKind::NotFound,
                codes::NO_ADDRESS,
                format!("instance {} has no public address", instance.id),
            )),
        );
    };

    tracing::info!(instance = %instance.id, %address, "dispatching backup command");
    let mut session = match sessions.connect(address, user, credential).await {
        Ok(session) => session,
        Err(err) => {
            tracing::warn!(instance = %instance.id, %address, error = %err, "unable to connect, skipping instance");
            return outcome(instance, Err(err));
        }
    };

    let result = session.run(wrapped_command).await;
    match &result {
        Ok(output) => {
            tracing::info!(instance = %instance.id, %address, output = %output.trim(), "launch request accepted");
        }
        Err(err) => {
            tracing::warn!(instance = %instance.id, %address, error = %err, "launch request failed");
        }
    }
    session.destroy().await;
    outcome(instance, result)
}

fn outcome(instance: &Instance, result: AppResult<String>) -> DispatchOutcome {
    DispatchOutcome {
        instance_id: instance.id.clone(),
        address: instance.public_address.clone(),
        result,
    }
}
