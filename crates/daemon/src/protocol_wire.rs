// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Length-prefixed JSON framing for the local protocol.
//!
//! Every message on the wire is a 4-byte big-endian length followed by
//! that many bytes of JSON. Frames decode straight into their typed
//! message; there is no intermediate raw-bytes layer.

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Largest params blob an instrumentation library is expected to attach
/// to a slow sample (explain plan plus backtrace).
pub const MAX_PARAMS_BLOB: usize = 8 * 1024 * 1024;

/// Frame cap, checked before any allocation.
///
/// Sized at twice the params-blob bound: the params blob dominates every
/// other field of the largest legitimate frame, so a well-behaved sender
/// never comes near this, and a corrupt or hostile length prefix cannot
/// make the daemon allocate gigabytes.
pub const MAX_FRAME_LEN: usize = 2 * MAX_PARAMS_BLOB;

/// Framing errors.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Peer closed the connection at a frame boundary.
    #[error("connection closed")]
    Closed,

    /// Peer closed the connection mid-frame.
    #[error("connection closed mid-frame ({missing} bytes missing)")]
    Truncated { missing: usize },

    /// Length prefix or encoded message beyond the frame cap.
    #[error("frame of {len} bytes exceeds the {max} byte cap")]
    FrameTooLarge { len: usize, max: usize },

    #[error("malformed frame: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Read one frame and decode it.
///
/// EOF before the length prefix is a clean close; EOF inside a frame is a
/// protocol violation and reported as such.
pub async fn read_frame<T, R>(reader: &mut R) -> Result<T, ProtocolError>
where
    T: DeserializeOwned,
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; 4];
    if let Err(e) = reader.read_exact(&mut header).await {
        return Err(match e.kind() {
            std::io::ErrorKind::UnexpectedEof => ProtocolError::Closed,
            _ => ProtocolError::Io(e),
        });
    }

    let len = u32::from_be_bytes(header) as usize;
    if len > MAX_FRAME_LEN {
        return Err(ProtocolError::FrameTooLarge {
            len,
            max: MAX_FRAME_LEN,
        });
    }

    let mut body = vec![0u8; len];
    let mut filled = 0;
    while filled < len {
        match reader.read(&mut body[filled..]).await {
            Ok(0) => {
                return Err(ProtocolError::Truncated {
                    missing: len - filled,
                })
            }
            Ok(n) => filled += n,
            Err(e) => return Err(ProtocolError::Io(e)),
        }
    }

    Ok(serde_json::from_slice(&body)?)
}

/// Encode one frame and write it, prefix and body in a single buffer so
/// the frame hits the socket in one write.
pub async fn write_frame<T, W>(writer: &mut W, frame: &T) -> Result<(), ProtocolError>
where
    T: Serialize,
    W: AsyncWrite + Unpin,
{
    let body = serde_json::to_vec(frame)?;
    if body.len() > MAX_FRAME_LEN {
        return Err(ProtocolError::FrameTooLarge {
            len: body.len(),
            max: MAX_FRAME_LEN,
        });
    }

    let mut wire = Vec::with_capacity(4 + body.len());
    wire.extend_from_slice(&(body.len() as u32).to_be_bytes());
    wire.extend_from_slice(&body);
    writer.write_all(&wire).await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
#[path = "protocol_wire_tests.rs"]
mod tests;
