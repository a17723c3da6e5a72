// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Listener task for framed observation I/O.
//!
//! Accepts local connections on a TCP endpoint or a filesystem socket,
//! demultiplexes framed messages into the connection's application entry,
//! and answers connect frames. Malformed frames close the offending
//! connection without killing the daemon.

use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::{TcpListener, TcpStream, UnixListener, UnixStream};
use tokio::sync::{watch, Notify};
use tracing::{debug, error, info, warn};

use crate::apps::{AppEntry, AppTable, Observation};
use crate::collector::{ConnectOutcome, Ingest};
use crate::harvester::{self, HarvesterConfig};
use crate::protocol::{Frame, RejectReason, Reply};
use crate::protocol_wire::{self, ProtocolError};

/// A parsed listener address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindAddr {
    /// TCP endpoint, `host:port`.
    Tcp(String),
    /// Filesystem socket path.
    Unix(PathBuf),
}

impl std::fmt::Display for BindAddr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BindAddr::Tcp(addr) => write!(f, "{addr}"),
            BindAddr::Unix(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Classify a listener address string.
///
/// All-numeric means a local port; a colon means host:port; anything else
/// is a socket path.
pub fn parse_addr(addr: &str) -> BindAddr {
    if !addr.is_empty() && addr.bytes().all(|b| b.is_ascii_digit()) {
        BindAddr::Tcp(format!("127.0.0.1:{addr}"))
    } else if addr.contains(':') {
        BindAddr::Tcp(addr.to_string())
    } else {
        BindAddr::Unix(PathBuf::from(addr))
    }
}

/// Listener errors.
#[derive(Debug, Error)]
pub enum ListenError {
    #[error("failed to bind {0}: {1}")]
    Bind(String, #[source] std::io::Error),
}

/// Accepted connection stream, either transport.
#[derive(Debug)]
pub enum ClientStream {
    Tcp(TcpStream),
    Unix(UnixStream),
}

impl AsyncRead for ClientStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            ClientStream::Tcp(s) => Pin::new(s).poll_read(cx, buf),
            ClientStream::Unix(s) => Pin::new(s).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for ClientStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        match self.get_mut() {
            ClientStream::Tcp(s) => Pin::new(s).poll_write(cx, buf),
            ClientStream::Unix(s) => Pin::new(s).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            ClientStream::Tcp(s) => Pin::new(s).poll_flush(cx),
            ClientStream::Unix(s) => Pin::new(s).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            ClientStream::Tcp(s) => Pin::new(s).poll_shutdown(cx),
            ClientStream::Unix(s) => Pin::new(s).poll_shutdown(cx),
        }
    }
}

/// Bound acceptor, either transport.
#[derive(Debug)]
pub enum Acceptor {
    Tcp(TcpListener),
    Unix(UnixListener),
}

impl Acceptor {
    /// Bind the parsed address. A stale socket file is removed first.
    pub async fn bind(addr: &BindAddr) -> Result<Acceptor, ListenError> {
        match addr {
            BindAddr::Tcp(endpoint) => TcpListener::bind(endpoint)
                .await
                .map(Acceptor::Tcp)
                .map_err(|e| ListenError::Bind(endpoint.clone(), e)),
            BindAddr::Unix(path) => {
                if path.exists() {
                    let _ = std::fs::remove_file(path);
                }
                UnixListener::bind(path)
                    .map(Acceptor::Unix)
                    .map_err(|e| ListenError::Bind(path.display().to_string(), e))
            }
        }
    }

    async fn accept(&self) -> std::io::Result<ClientStream> {
        match self {
            Acceptor::Tcp(listener) => {
                let (stream, _) = listener.accept().await?;
                Ok(ClientStream::Tcp(stream))
            }
            Acceptor::Unix(listener) => {
                let (stream, _) = listener.accept().await?;
                Ok(ClientStream::Unix(stream))
            }
        }
    }
}

/// Shared worker context for all connection handlers.
pub struct ListenCtx<I: Ingest> {
    pub table: Arc<AppTable>,
    pub ingest: Arc<I>,
    pub harvester: HarvesterConfig,
    /// Daemon-wide high-security mode; mismatching connects are rejected.
    pub high_security: bool,
    /// Observed by per-entry harvest loops spawned from here.
    pub shutdown: watch::Receiver<bool>,
}

/// Listener task accepting connections until shutdown.
pub struct Listener<I: Ingest> {
    acceptor: Acceptor,
    ctx: Arc<ListenCtx<I>>,
}

/// Errors from one connection.
#[derive(Debug, Error)]
enum ConnectionError {
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

impl<I: Ingest + 'static> Listener<I> {
    pub fn new(acceptor: Acceptor, ctx: Arc<ListenCtx<I>>) -> Self {
        Self { acceptor, ctx }
    }

    /// Accept connections until the shutdown flag flips.
    pub async fn run(self) {
        let mut shutdown = self.ctx.shutdown.clone();
        loop {
            tokio::select! {
                accepted = self.acceptor.accept() => match accepted {
                    Ok(stream) => {
                        let ctx = Arc::clone(&self.ctx);
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(stream, &ctx).await {
                                match e {
                                    ConnectionError::Protocol(ProtocolError::Closed) => {
                                        debug!("client disconnected")
                                    }
                                    _ => warn!("closing connection: {e}"),
                                }
                            }
                        });
                    }
                    Err(e) => {
                        error!("accept error: {e}");
                    }
                },
                _ = shutdown.changed() => {
                    info!("listener stopping");
                    return;
                }
            }
        }
    }
}

/// Serve one connection: a connect frame, then observation frames.
async fn handle_connection<S, I>(stream: S, ctx: &ListenCtx<I>) -> Result<(), ConnectionError>
where
    S: AsyncRead + AsyncWrite + Unpin,
    I: Ingest + 'static,
{
    let (mut reader, mut writer) = tokio::io::split(stream);
    let kill = Arc::new(Notify::new());
    let mut entry: Option<Arc<AppEntry>> = None;

    loop {
        let frame = tokio::select! {
            // Entry evicted or disconnected: close; the library reconnects.
            _ = kill.notified() => return Ok(()),
            read = protocol_wire::read_frame::<Frame, _>(&mut reader) => match read {
                Ok(frame) => frame,
                Err(ProtocolError::Closed) => return Ok(()),
                Err(e) => return Err(e.into()),
            },
        };

        match frame {
            Frame::Connect { identity } => match connect_app(ctx, &identity).await {
                Disposition::Accept(accepted, run_token) => {
                    accepted.register_connection(&kill);
                    entry = Some(accepted);
                    protocol_wire::write_frame(&mut writer, &Reply::Accepted { run_token })
                        .await?;
                }
                Disposition::Reject(reason) => {
                    protocol_wire::write_frame(&mut writer, &Reply::Rejected { reason }).await?;
                    return Ok(());
                }
                // Transient ingest failure: close silently; the library
                // retries its connect later.
                Disposition::Drop => return Ok(()),
            },
            observation => {
                let Some(entry) = &entry else {
                    warn!("observation before connect frame; closing");
                    return Ok(());
                };
                if !entry.is_connected() {
                    debug!(
                        app = entry.identity.display_name(),
                        "entry disconnected; closing so the library reconnects"
                    );
                    return Ok(());
                }
                if let Some(observation) = to_observation(observation) {
                    entry.ingest(observation);
                }
            }
        }
    }
}

/// Dispatch of a connect frame.
enum Disposition {
    Accept(Arc<AppEntry>, String),
    Reject(RejectReason),
    Drop,
}

async fn connect_app<I: Ingest + 'static>(
    ctx: &ListenCtx<I>,
    identity: &beacon_core::AppIdentity,
) -> Disposition {
    if !identity.license_looks_valid() {
        return Disposition::Reject(RejectReason::InvalidLicense);
    }
    if identity.high_security != ctx.high_security {
        return Disposition::Reject(RejectReason::HighSecurityMismatch);
    }

    let (entry, created) = ctx.table.attach(identity);
    if created {
        info!(app = identity.display_name(), "new application entry");
        tokio::spawn(harvester::run_entry(
            Arc::clone(&entry),
            Arc::clone(&ctx.table),
            Arc::clone(&ctx.ingest),
            ctx.harvester.clone(),
            ctx.shutdown.clone(),
        ));
    }

    if let Some(run_token) = entry.run_token() {
        return Disposition::Accept(entry, run_token);
    }

    match ctx.ingest.connect(identity).await {
        ConnectOutcome::Accepted { run_token } => {
            entry.set_run_token(Some(run_token.clone()));
            Disposition::Accept(entry, run_token)
        }
        ConnectOutcome::InvalidLicense => Disposition::Reject(RejectReason::InvalidLicense),
        ConnectOutcome::Redirect { host } => Disposition::Reject(RejectReason::Redirect { host }),
        ConnectOutcome::RetryLater => Disposition::Drop,
    }
}

fn to_observation(frame: Frame) -> Option<Observation> {
    match frame {
        Frame::Event { event } => Some(Observation::Event(event)),
        Frame::CustomEvent { event } => Some(Observation::CustomEvent(event)),
        Frame::Metric { sample } => Some(Observation::Metric(sample)),
        Frame::Error { error } => Some(Observation::Error(error)),
        Frame::SlowSample { sample } => Some(Observation::SlowSample(sample)),
        // Handled by the caller before dispatch.
        Frame::Connect { .. } => None,
    }
}

#[cfg(test)]
#[path = "listener_tests.rs"]
mod tests;
