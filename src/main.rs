// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2026 Alex Sizykh

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use backupd::adapters::control_plane::ControlPlaneClient;
use backupd::adapters::ssh::SshDispatchAdapter;
use backupd::app::usecases::UseCases;
use backupd::{config, logging};

/// One-shot backup dispatcher. The scheduler event that triggers it carries
/// no parameters; everything is read from the environment.
#[derive(Parser, Debug)]
#[command(name = "backupd", version, about = "Dispatch a backup job to one instance group")]
struct Opts {
    /// Override the remote backup command.
    #[arg(long)]
    command: Option<String>,

    /// Enable debug logging.
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let opts = Opts::parse();
    logging::init(opts.verbose);

    let mut config = match config::from_env() {
        Ok(config) => config,
        Err(err) => {
            tracing::error!(code = err.code(), error = %err, "configuration invalid");
            return ExitCode::FAILURE;
        }
    };
    if let Some(command) = opts.command {
        config.backup_command = command;
    }
    config::log_report(&config);

    let control_plane = Arc::new(ControlPlaneClient::new(&config.control_plane_url));
    let ssh = Arc::new(SshDispatchAdapter::new(config.ssh_port));
    let usecases = UseCases::new(
        control_plane.clone(),
        control_plane.clone(),
        control_plane,
        ssh,
    );

    let report = match usecases.run_backup(&config).await {
        Ok(report) => report,
        Err(err) => {
            tracing::error!(code = err.code(), error = %err, "backup run aborted");
            return ExitCode::FAILURE;
        }
    };

    for outcome in &report.outcomes {
        let address = outcome.address.as_deref().unwrap_or("(no address)");
        match &outcome.result {
            Ok(_) => {
                tracing::info!(instance = %outcome.instance_id, %address, "dispatched");
            }
            Err(err) => {
                tracing::warn!(instance = %outcome.instance_id, %address, error = %err, "not dispatched");
            }
        }
    }
    tracing::info!(
        tier = %report.tier,
        group = %report.group_id,
        attempted = report.outcomes.len(),
        failed = report.failed_count(),
        "backup dispatch complete"
    );
    ExitCode::SUCCESS
}
