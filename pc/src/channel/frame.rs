//! Newline-delimited JSON framing shared by both ends of the socket

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::trace;

use crate::error::PlanClientError;
use crate::protocol::MAX_FRAME_SIZE;

/// Write one message as a single JSON line
pub async fn write_frame<W, T>(writer: &mut W, msg: &T) -> Result<(), PlanClientError>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let json = serde_json::to_string(msg)?;

    if json.len() > MAX_FRAME_SIZE {
        return Err(PlanClientError::Protocol(format!("Message too large: {} bytes", json.len())));
    }

    writer.write_all(json.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;
    trace!(bytes = json.len(), "write_frame: sent");
    Ok(())
}

/// Read one JSON line; `None` on a clean end of stream
pub async fn read_frame<R, T>(reader: &mut R) -> Result<Option<T>, PlanClientError>
where
    R: AsyncBufRead + Unpin,
    T: DeserializeOwned,
{
    let mut line = String::new();
    let limit = (MAX_FRAME_SIZE + 1) as u64;
    let bytes_read = (&mut *reader).take(limit).read_line(&mut line).await?;

    if bytes_read == 0 {
        return Ok(None);
    }

    if bytes_read > MAX_FRAME_SIZE && !line.ends_with('\n') {
        return Err(PlanClientError::Protocol(format!("Frame too large: {} bytes", bytes_read)));
    }

    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Err(PlanClientError::Protocol("Empty frame received".to_string()));
    }

    trace!(bytes = bytes_read, "read_frame: received");
    Ok(Some(serde_json::from_str(trimmed)?))
}
