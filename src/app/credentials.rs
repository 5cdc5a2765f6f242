// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2026 Alex Sizykh

use crate::app::errors::{AppError, AppErrorKind, AppResult, codes};
use crate::app::ports::{KeyDecryptPort, KmsError, KmsErrorCode, ObjectStorePort};
use crate::app::types::Credential;

/// Resolve the remote-access credential for this invocation.
///
/// A non-empty out-of-band password short-circuits everything: no fetch, no
/// decrypt. Otherwise the encrypted key blob is fetched from object storage
/// and decrypted through the key-management service. Both failures are
/// fatal to the invocation; there is no fallback between the two variants.
/// The resolved credential is reused read-only across every session.
pub async fn resolve(
    objects: &dyn ObjectStorePort,
    kms: &dyn KeyDecryptPort,
    explicit_password: Option<&str>,
    bucket: &str,
    key: &str,
    kms_key_ref: &str,
) -> AppResult<Credential> {
    if let Some(password) = explicit_password.filter(|value| !value.is_empty()) {
        tracing::debug!("using out-of-band password credential");
        return Ok(Credential::Password(password.to_string()));
    }

    tracing::info!(%bucket, %key, "fetching encrypted key material");
    let ciphertext = objects.get_object(bucket, key).await.map_err(|err| {
        AppError::with_message(
            AppErrorKind::Aborted,
            codes::CREDENTIAL_UNAVAILABLE,
            format!("unable to retrieve key object {key} from bucket {bucket}: {err}"),
        )
    })?;
    tracing::debug!(bytes = ciphertext.len(), "encrypted key material fetched");

    match kms.decrypt(&ciphertext, kms_key_ref).await {
        Ok(plaintext) => {
            tracing::info!(bytes = plaintext.len(), "key material decrypted");
            Ok(Credential::Key(plaintext))
        }
        Err(err) => {
            // Classification is diagnostic only; every decrypt failure is
            // equally fatal.
            tracing::error!(error = %err, detail = classify_kms_error(&err), "decryption failed");
            Err(AppError::with_message(
                AppErrorKind::Aborted,
                codes::DECRYPT_FAILURE,
                format!("decrypt of key object {key} failed: {err}"),
            ))
        }
    }
}

/// Map a key-management failure to an operator-facing diagnostic. Never
/// consulted for control flow.
pub fn classify_kms_error(err: &KmsError) -> &'static str {
    match err {
        KmsError::Service { code, .. } => match code {
            KmsErrorCode::NotFound => "the referenced key does not exist",
            KmsErrorCode::Disabled => "the key is disabled",
            KmsErrorCode::KeyUnavailable => "the key exists but is not available",
            KmsErrorCode::DependencyTimeout => "a service dependency timed out",
            KmsErrorCode::InvalidKeyUsage => "the key does not permit decryption",
            KmsErrorCode::InvalidGrantToken => "the supplied grant token is invalid",
            KmsErrorCode::Internal => "the key service hit an internal error",
            KmsErrorCode::InvalidState => "the key is in a state that forbids decryption",
            KmsErrorCode::Other(_) => "unrecognized key service error code",
        },
        KmsError::Transport(_) => "could not reach the key service",
    }
}
