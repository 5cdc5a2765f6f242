// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2026 Alex Sizykh

use async_trait::async_trait;

/// Service-reported failure codes the key-management service can return.
/// The set is closed over the codes we know how to describe; anything else
/// lands in `Other` and still flows through the same fatal path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KmsErrorCode {
    NotFound,
    Disabled,
    KeyUnavailable,
    DependencyTimeout,
    InvalidKeyUsage,
    InvalidGrantToken,
    Internal,
    InvalidState,
    Other(String),
}

impl KmsErrorCode {
    pub fn from_code(code: &str) -> Self {
        match code {
            "NotFoundException" => KmsErrorCode::NotFound,
            "DisabledException" => KmsErrorCode::Disabled,
            "KeyUnavailableException" => KmsErrorCode::KeyUnavailable,
            "DependencyTimeoutException" => KmsErrorCode::DependencyTimeout,
            "InvalidKeyUsageException" => KmsErrorCode::InvalidKeyUsage,
            "InvalidGrantTokenException" => KmsErrorCode::InvalidGrantToken,
            "KMSInternalException" => KmsErrorCode::Internal,
            "KMSInvalidStateException" => KmsErrorCode::InvalidState,
            other => KmsErrorCode::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            KmsErrorCode::NotFound => "NotFoundException",
            KmsErrorCode::Disabled => "DisabledException",
            KmsErrorCode::KeyUnavailable => "KeyUnavailableException",
            KmsErrorCode::DependencyTimeout => "DependencyTimeoutException",
            KmsErrorCode::InvalidKeyUsage => "InvalidKeyUsageException",
            KmsErrorCode::InvalidGrantToken => "InvalidGrantTokenException",
            KmsErrorCode::Internal => "KMSInternalException",
            KmsErrorCode::InvalidState => "KMSInvalidStateException",
            KmsErrorCode::Other(code) => code,
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum KmsError {
    #[error("kms rejected the request ({}): {message}", code.as_str())]
    Service { code: KmsErrorCode, message: String },
    #[error("kms transport failure: {0}")]
    Transport(String),
}

#[async_trait]
/// Key-management decrypt boundary. Errors carry an inspectable code so the
/// caller can print a clearer diagnostic; they are all equally fatal.
pub trait KeyDecryptPort: Send + Sync {
    async fn decrypt(&self, ciphertext: &[u8], key_ref: &str) -> Result<Vec<u8>, KmsError>;
}
