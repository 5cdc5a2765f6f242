// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2026 Alex Sizykh

pub mod compute;
pub mod kms;
pub mod object_store;
pub mod remote;

pub use compute::ComputeQueryPort;
pub use kms::{KeyDecryptPort, KmsError, KmsErrorCode};
pub use object_store::ObjectStorePort;
pub use remote::{RemoteSession, RemoteSessionPort};
