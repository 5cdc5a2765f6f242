// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2026 Alex Sizykh

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};

use crate::app::errors::{AppError, AppErrorKind, AppResult, codes};
use crate::app::ports::{ComputeQueryPort, KeyDecryptPort, KmsError, KmsErrorCode, ObjectStorePort};
use crate::app::types::{FilterSet, Instance, ReservationGroup};

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// JSON client for the control-plane API: instance queries, key-object
/// fetches and decrypt calls all go through the same base endpoint.
#[derive(Clone)]
pub struct ControlPlaneClient {
    http: reqwest::Client,
    base: String,
}

impl ControlPlaneClient {
    pub fn new(base: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .user_agent(concat!("backupd/", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("failed to create HTTP client");
        Self {
            http,
            base: base.into().trim_end_matches('/').to_string(),
        }
    }
}

#[derive(Serialize)]
struct FilterBody<'a> {
    name: &'a str,
    values: &'a [String],
}

#[derive(Serialize)]
struct QueryBody<'a> {
    filters: Vec<FilterBody<'a>>,
}

#[derive(Deserialize)]
struct InstanceBody {
    id: String,
    #[serde(default)]
    public_address: Option<String>,
}

#[derive(Deserialize)]
struct ReservationBody {
    id: String,
    #[serde(default)]
    instances: Vec<InstanceBody>,
}

#[derive(Deserialize)]
struct QueryResponse {
    reservations: Vec<ReservationBody>,
}

#[derive(Serialize)]
struct DecryptBody<'a> {
    key_ref: &'a str,
    ciphertext: String,
}

#[derive(Deserialize)]
struct DecryptResponse {
    plaintext: String,
}

#[derive(Deserialize)]
struct ServiceErrorBody {
    code: String,
    #[serde(default)]
    message: String,
}

fn query_error(err: impl std::fmt::Display) -> AppError {
    AppError::with_message(
        AppErrorKind::Internal,
        codes::QUERY_FAILURE,
        format!("instance query failed: {err}"),
    )
}

fn into_group(body: ReservationBody) -> ReservationGroup {
    ReservationGroup {
        id: body.id,
        instances: body
            .instances
            .into_iter()
            .map(|instance| Instance {
                id: instance.id,
                public_address: instance.public_address.filter(|addr| !addr.is_empty()),
            })
            .collect(),
    }
}

#[async_trait]
impl ComputeQueryPort for ControlPlaneClient {
    #[tracing::instrument(
        name = "control_plane",
        level = "debug",
        skip(self, filters),
        fields(op = "query_instances")
    )]
    async fn query_instances(&self, filters: &FilterSet) -> AppResult<Vec<ReservationGroup>> {
        let body = QueryBody {
            filters: filters
                .iter()
                .map(|filter| FilterBody {
                    name: &filter.name,
                    values: &filter.values,
                })
                .collect(),
        };
        let response = self
            .http
            .post(format!("{}/instances/query", self.base))
            .json(&body)
            .send()
            .await
            .map_err(query_error)?;
        if !response.status().is_success() {
            return Err(query_error(format!("HTTP {}", response.status())));
        }
        let parsed: QueryResponse = response.json().await.map_err(query_error)?;
        Ok(parsed.reservations.into_iter().map(into_group).collect())
    }
}

#[async_trait]
impl ObjectStorePort for ControlPlaneClient {
    #[tracing::instrument(
        name = "control_plane",
        level = "debug",
        skip(self),
        fields(op = "get_object", bucket = %bucket, key = %key)
    )]
    async fn get_object(&self, bucket: &str, key: &str) -> AppResult<Vec<u8>> {
        let object_error = |err: String| {
            AppError::with_message(
                AppErrorKind::Internal,
                codes::OBJECT_FETCH_FAILURE,
                format!("object fetch {bucket}/{key} failed: {err}"),
            )
        };
        let response = self
            .http
            .get(format!("{}/objects/{bucket}/{key}", self.base))
            .send()
            .await
            .map_err(|err| object_error(err.to_string()))?;
        if !response.status().is_success() {
            return Err(object_error(format!("HTTP {}", response.status())));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|err| object_error(err.to_string()))?;
        tracing::debug!(bytes = bytes.len(), "object fetched");
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl KeyDecryptPort for ControlPlaneClient {
    #[tracing::instrument(
        name = "control_plane",
        level = "debug",
        skip(self, ciphertext),
        fields(op = "decrypt", key_ref = %key_ref)
    )]
    async fn decrypt(&self, ciphertext: &[u8], key_ref: &str) -> Result<Vec<u8>, KmsError> {
        let body = DecryptBody {
            key_ref,
            ciphertext: BASE64.encode(ciphertext),
        };
        let response = self
            .http
            .post(format!("{}/kms/decrypt", self.base))
            .json(&body)
            .send()
            .await
            .map_err(|err| KmsError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            // The service reports failures as a JSON {code, message} body;
            // anything unparseable is a transport-level failure.
            let raw = response
                .text()
                .await
                .map_err(|err| KmsError::Transport(err.to_string()))?;
            return Err(match serde_json::from_str::<ServiceErrorBody>(&raw) {
                Ok(service) => KmsError::Service {
                    code: KmsErrorCode::from_code(&service.code),
                    message: service.message,
                },
                Err(_) => KmsError::Transport(format!("HTTP {status}: {raw}")),
            });
        }

        let parsed: DecryptResponse = response
            .json()
            .await
            .map_err(|err| KmsError::Transport(err.to_string()))?;
        BASE64
            .decode(parsed.plaintext.as_bytes())
            .map_err(|err| KmsError::Transport(format!("invalid plaintext encoding: {err}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_is_normalized() {
        let client = ControlPlaneClient::new("http://cp.internal/");
        assert_eq!(client.base, "http://cp.internal");
    }

    #[test]
    fn reservations_map_to_groups_with_optional_addresses() {
        let parsed: QueryResponse = serde_json::from_str(
            r#"{
                "reservations": [
                    {
                        "id": "r-1",
                        "instances": [
                            {"id": "i-1", "public_address": "i-1.example"},
                            {"id": "i-2", "public_address": ""},
                            {"id": "i-3"}
                        ]
                    }
                ]
            }"#,
        )
        .unwrap();
        let groups: Vec<ReservationGroup> =
            parsed.reservations.into_iter().map(into_group).collect();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].id, "r-1");
        assert_eq!(
            groups[0].instances[0].public_address.as_deref(),
            Some("i-1.example")
        );
        // Empty or missing addresses both surface as None.
        assert!(groups[0].instances[1].public_address.is_none());
        assert!(groups[0].instances[2].public_address.is_none());
    }

    #[test]
    fn service_error_body_maps_to_known_kms_code() {
        let body: ServiceErrorBody =
            serde_json::from_str(r#"{"code": "DisabledException", "message": "key disabled"}"#)
                .unwrap();
        assert_eq!(KmsErrorCode::from_code(&body.code), KmsErrorCode::Disabled);
    }
}
