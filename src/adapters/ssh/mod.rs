// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2026 Alex Sizykh

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use russh::ChannelMsg;
use russh::client::AuthResult;
use russh::keys::PrivateKeyWithHashAlg;

use crate::app::errors::{AppError, AppErrorKind, AppResult, codes};
use crate::app::ports::{RemoteSession, RemoteSessionPort};
use crate::app::types::Credential;

const INACTIVITY_TIMEOUT_SECS: u64 = 30;

/// Minimal russh client handler. We rely on default implementations.
/// TODO: add actual server key verification
#[derive(Clone, Debug, Default)]
struct ClientHandler;

impl russh::client::Handler for ClientHandler {
    type Error = anyhow::Error;
    async fn check_server_key(
        &mut self,
        _server_public_key: &russh::keys::ssh_key::PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        Ok(true)
    }
}

/// Opens one fresh SSH connection per instance. Nothing is cached; the
/// dispatch loop owns each session for exactly one command.
pub struct SshDispatchAdapter {
    port: u16,
    config: Arc<russh::client::Config>,
}

impl SshDispatchAdapter {
    pub fn new(port: u16) -> Self {
        let config = russh::client::Config {
            inactivity_timeout: Some(Duration::from_secs(INACTIVITY_TIMEOUT_SECS)),
            ..Default::default()
        };
        Self {
            port,
            config: Arc::new(config),
        }
    }

    async fn authenticate(
        handle: &mut russh::client::Handle<ClientHandler>,
        user: &str,
        credential: &Credential,
    ) -> Result<()> {
        let result = match credential {
            Credential::Password(password) => {
                handle
                    .authenticate_password(user.to_string(), password.clone())
                    .await?
            }
            Credential::Key(material) => {
                let pem =
                    std::str::from_utf8(material).context("key material is not valid UTF-8")?;
                let key = russh::keys::decode_secret_key(pem, None)
                    .context("failed to decode decrypted private key")?;
                let alg = handle.best_supported_rsa_hash().await?.flatten();
                handle
                    .authenticate_publickey(
                        user.to_string(),
                        PrivateKeyWithHashAlg::new(Arc::new(key), alg),
                    )
                    .await?
            }
        };
        match result {
            AuthResult::Success => Ok(()),
            AuthResult::Failure { .. } => Err(anyhow!("authentication rejected for {user}")),
        }
    }
}

#[async_trait]
impl RemoteSessionPort for SshDispatchAdapter {
    #[tracing::instrument(
        name = "ssh",
        level = "debug",
        skip(self, credential),
        fields(op = "connect", host = %address, user = %user, port = self.port)
    )]
    async fn connect(
        &self,
        address: &str,
        user: &str,
        credential: &Credential,
    ) -> AppResult<Box<dyn RemoteSession>> {
        let mut handle =
            russh::client::connect(self.config.clone(), (address, self.port), ClientHandler)
                .await
                .map_err(|err| {
                    AppError::with_message(
                        AppErrorKind::Aborted,
                        codes::CONNECTION_FAILURE,
                        format!("ssh connect to {address} failed: {err}"),
                    )
                })?;
        Self::authenticate(&mut handle, user, credential)
            .await
            .map_err(|err| {
                AppError::with_message(
                    AppErrorKind::Aborted,
                    codes::CONNECTION_FAILURE,
                    format!("ssh auth to {address} failed: {err}"),
                )
            })?;
        Ok(Box::new(SshSession {
            address: address.to_string(),
            handle: Some(handle),
        }))
    }
}

fn handle_run_message(msg: &ChannelMsg, out: &mut Vec<u8>, code: &mut i32) -> bool {
    match msg {
        ChannelMsg::Data { data } => {
            out.extend_from_slice(data);
            false
        }
        ChannelMsg::ExtendedData { data, ext: 1 } => {
            out.extend_from_slice(data);
            false
        }
        ChannelMsg::ExitStatus { exit_status } => {
            *code = *exit_status as i32;
            false
        }
        ChannelMsg::Close => true,
        _ => false,
    }
}

pub struct SshSession {
    address: String,
    // Taken on destroy; a drained session is a closed session.
    handle: Option<russh::client::Handle<ClientHandler>>,
}

impl SshSession {
    async fn exec_capture(
        handle: &russh::client::Handle<ClientHandler>,
        command: &str,
    ) -> Result<(String, i32)> {
        let mut chan = handle
            .channel_open_session()
            .await
            .context("open session")?;
        chan.exec(true, command).await.context("exec request")?;

        let mut out = Vec::new();
        let mut code: i32 = 0;
        while let Some(msg) = chan.wait().await {
            if handle_run_message(&msg, &mut out, &mut code) {
                break;
            }
        }
        let _ = chan.eof().await;
        let _ = chan.close().await;
        Ok((String::from_utf8_lossy(&out).into_owned(), code))
    }
}

#[async_trait]
impl RemoteSession for SshSession {
    async fn run(&mut self, command: &str) -> AppResult<String> {
        let handle = self.handle.as_ref().ok_or_else(|| {
            AppError::with_message(
                AppErrorKind::Internal,
                codes::INTERNAL_ERROR,
                "session already destroyed",
            )
        })?;
        tracing::debug!(host = %self.address, %command, "executing");
        let (output, code) = Self::exec_capture(handle, command).await.map_err(|err| {
            AppError::with_message(
                AppErrorKind::Internal,
                codes::REMOTE_ERROR,
                format!("ssh exec on {} failed: {err}", self.address),
            )
        })?;
        if code != 0 {
            return Err(AppError::with_message(
                AppErrorKind::Internal,
                codes::REMOTE_ERROR,
                format!("command exited with status {code} on {}", self.address),
            ));
        }
        Ok(output)
    }

    async fn destroy(&mut self) {
        if let Some(handle) = self.handle.take() {
            if let Err(err) = handle
                .disconnect(russh::Disconnect::ByApplication, "dispatch complete", "en")
                .await
            {
                tracing::debug!(host = %self.address, error = %err, "disconnect failed");
            }
        }
    }
}
