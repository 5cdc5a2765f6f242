// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2026 Alex Sizykh

use std::env;

use crate::app::errors::{AppError, AppErrorKind, AppResult, codes};

const ENV_NETWORK_ID: &str = "NetworkId";
const ENV_BUCKET: &str = "Bucket";
const ENV_OBJECT_KEY: &str = "Key";
const ENV_KMS_KEY_REF: &str = "KmsKeyRef";
const ENV_SSH_USER: &str = "SSHUser";
const ENV_SSH_PASS: &str = "SSHPass";
const ENV_SSH_PORT: &str = "SSHPort";
const ENV_ROLE_TIERS: &str = "RoleTiers";
const ENV_BACKUP_COMMAND: &str = "BackupCommand";
const ENV_CONTROL_PLANE_URL: &str = "ControlPlaneUrl";

pub const DEFAULT_ROLE_TIERS: [&str; 3] = ["Validator", "Maker", "Observer"];
pub const DEFAULT_BACKUP_COMMAND: &str =
    "/usr/bin/python /opt/quorum/bin/backup-chain-data.py backup";
const DEFAULT_SSH_PORT: u16 = 22;

/// Everything one invocation needs, resolved once at startup and passed by
/// reference into the components. Nothing below reads the environment
/// again after this is built.
#[derive(Debug, Clone)]
pub struct Config {
    pub network_id: String,
    pub role_tiers: Vec<String>,
    pub bucket: String,
    pub object_key: String,
    pub kms_key_ref: String,
    pub ssh_user: String,
    pub ssh_password: Option<String>,
    pub ssh_port: u16,
    pub backup_command: String,
    pub control_plane_url: String,
}

pub fn from_env() -> AppResult<Config> {
    let vars: Vec<(String, String)> = env::vars().collect();
    from_vars(&vars)
}

/// Build the configuration from an explicit variable list so tests never
/// touch process-global environment state.
pub fn from_vars(vars: &[(String, String)]) -> AppResult<Config> {
    let lookup = |name: &str| {
        vars.iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.clone())
            .filter(|value| !value.is_empty())
    };

    let network_id = lookup(ENV_NETWORK_ID)
        .or_else(|| network_id_ignoring_case(vars))
        .ok_or_else(|| missing(ENV_NETWORK_ID))?;
    let ssh_user = lookup(ENV_SSH_USER).ok_or_else(|| missing(ENV_SSH_USER))?;
    let control_plane_url =
        lookup(ENV_CONTROL_PLANE_URL).ok_or_else(|| missing(ENV_CONTROL_PLANE_URL))?;
    let ssh_password = lookup(ENV_SSH_PASS);

    let bucket = lookup(ENV_BUCKET);
    let object_key = lookup(ENV_OBJECT_KEY);
    if ssh_password.is_none() && (bucket.is_none() || object_key.is_none()) {
        return Err(AppError::with_message(
            AppErrorKind::InvalidArgument,
            codes::INVALID_ARGUMENT,
            format!("{ENV_BUCKET} and {ENV_OBJECT_KEY} are required when {ENV_SSH_PASS} is not set"),
        ));
    }

    let ssh_port = match lookup(ENV_SSH_PORT) {
        Some(raw) => raw.parse::<u16>().map_err(|_| {
            AppError::with_message(
                AppErrorKind::InvalidArgument,
                codes::INVALID_ARGUMENT,
                format!("{ENV_SSH_PORT} must be a port number, got {raw:?}"),
            )
        })?,
        None => DEFAULT_SSH_PORT,
    };

    Ok(Config {
        network_id,
        role_tiers: parse_role_tiers(lookup(ENV_ROLE_TIERS).as_deref()),
        bucket: bucket.unwrap_or_default(),
        object_key: object_key.unwrap_or_default(),
        kms_key_ref: lookup(ENV_KMS_KEY_REF).unwrap_or_default(),
        ssh_user,
        ssh_password,
        ssh_port,
        backup_command: lookup(ENV_BACKUP_COMMAND)
            .unwrap_or_else(|| DEFAULT_BACKUP_COMMAND.to_string()),
        control_plane_url,
    })
}

// The network id has historically been set with inconsistent casing by
// provisioning tooling, so the exact name is tried first and a
// case-insensitive scan second.
fn network_id_ignoring_case(vars: &[(String, String)]) -> Option<String> {
    vars.iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(ENV_NETWORK_ID))
        .map(|(_, value)| value.clone())
        .filter(|value| !value.is_empty())
}

fn parse_role_tiers(raw: Option<&str>) -> Vec<String> {
    let tiers: Vec<String> = raw
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|tier| !tier.is_empty())
        .map(str::to_string)
        .collect();
    if tiers.is_empty() {
        DEFAULT_ROLE_TIERS.iter().map(|t| t.to_string()).collect()
    } else {
        tiers
    }
}

fn missing(name: &str) -> AppError {
    AppError::with_message(
        AppErrorKind::InvalidArgument,
        codes::INVALID_ARGUMENT,
        format!("{name} is not set"),
    )
}

/// Log the effective configuration at startup. The password value never
/// appears; only which credential source is in play.
pub fn log_report(config: &Config) {
    tracing::info!(network_id = %config.network_id, "config network id");
    tracing::info!(tiers = ?config.role_tiers, "config role tiers");
    tracing::info!(bucket = %config.bucket, key = %config.object_key, "config key object");
    tracing::info!(user = %config.ssh_user, port = config.ssh_port, "config ssh target");
    tracing::info!(
        source = if config.ssh_password.is_some() { "password" } else { "encrypted key" },
        "config credential source"
    );
    tracing::info!(command = %config.backup_command, "config backup command");
    tracing::info!(url = %config.control_plane_url, "config control plane");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn base_vars() -> Vec<(String, String)> {
        vars(&[
            ("NetworkId", "net-42"),
            ("SSHUser", "ops"),
            ("SSHPass", "secret"),
            ("ControlPlaneUrl", "http://cp.internal"),
        ])
    }

    #[test]
    fn minimal_password_config_loads_with_defaults() {
        let config = from_vars(&base_vars()).unwrap();
        assert_eq!(config.network_id, "net-42");
        assert_eq!(config.ssh_password.as_deref(), Some("secret"));
        assert_eq!(config.ssh_port, DEFAULT_SSH_PORT);
        assert_eq!(config.role_tiers, vec!["Validator", "Maker", "Observer"]);
        assert_eq!(config.backup_command, DEFAULT_BACKUP_COMMAND);
    }

    #[test]
    fn network_id_falls_back_to_case_insensitive_lookup() {
        let mut pairs = base_vars();
        pairs.retain(|(key, _)| key != "NetworkId");
        pairs.push(("NETWORKID".to_string(), "net-ci".to_string()));
        let config = from_vars(&pairs).unwrap();
        assert_eq!(config.network_id, "net-ci");
    }

    #[test]
    fn missing_network_id_is_rejected() {
        let mut pairs = base_vars();
        pairs.retain(|(key, _)| key != "NetworkId");
        let err = from_vars(&pairs).unwrap_err();
        assert_eq!(err.code(), codes::INVALID_ARGUMENT);
    }

    #[test]
    fn keyless_password_requires_bucket_and_key() {
        let mut pairs = base_vars();
        pairs.retain(|(key, _)| key != "SSHPass");
        assert!(from_vars(&pairs).is_err());

        pairs.push(("Bucket".to_string(), "backups".to_string()));
        pairs.push(("Key".to_string(), "ssh.pem.enc".to_string()));
        let config = from_vars(&pairs).unwrap();
        assert!(config.ssh_password.is_none());
        assert_eq!(config.bucket, "backups");
        assert_eq!(config.object_key, "ssh.pem.enc");
    }

    #[test]
    fn role_tiers_parse_in_declared_order() {
        let mut pairs = base_vars();
        pairs.push(("RoleTiers".to_string(), "Archiver, Validator ,Maker".to_string()));
        let config = from_vars(&pairs).unwrap();
        assert_eq!(config.role_tiers, vec!["Archiver", "Validator", "Maker"]);
    }

    #[test]
    fn bad_ssh_port_is_rejected() {
        let mut pairs = base_vars();
        pairs.push(("SSHPort".to_string(), "not-a-port".to_string()));
        let err = from_vars(&pairs).unwrap_err();
        assert_eq!(err.code(), codes::INVALID_ARGUMENT);
    }

    #[test]
    fn empty_values_are_treated_as_unset() {
        let mut pairs = base_vars();
        pairs.retain(|(key, _)| key != "SSHPass");
        pairs.push(("SSHPass".to_string(), String::new()));
        // Empty password means the key path, which needs bucket and key.
        assert!(from_vars(&pairs).is_err());
    }
}
