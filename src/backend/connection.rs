//! Connection establishment for the push channel and the history endpoint.

use std::time::Duration;

use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::error::{ChatError, Result};
use crate::protocol::SnapshotRecord;

pub type PushStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const SNAPSHOT_TIMEOUT: Duration = Duration::from_secs(15);

/// Open the push socket.
///
/// # Errors
/// Returns `ChatError::PushConnection` if the handshake fails, or
/// `ChatError::Configuration` if it does not finish in time.
pub async fn establish_connection(url: &str) -> Result<PushStream> {
    tracing::info!(url, "connecting push channel");
    let (stream, response) = timeout(CONNECT_TIMEOUT, connect_async(url))
        .await
        .map_err(|_| {
            ChatError::Configuration(format!(
                "push connection timeout after {:?}",
                CONNECT_TIMEOUT
            ))
        })??;
    tracing::debug!(status = %response.status(), "push channel handshake complete");
    Ok(stream)
}

/// Fetch conversation history once.
///
/// # Errors
/// Any transport failure, non-success status or undecodable body is returned
/// as an error; the caller keeps whatever state it already has.
pub async fn fetch_snapshot(url: &str) -> Result<Vec<SnapshotRecord>> {
    let client = reqwest::Client::builder()
        .timeout(SNAPSHOT_TIMEOUT)
        .build()?;
    let body = client
        .get(url)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;
    let records: Vec<SnapshotRecord> = serde_json::from_str(&body)?;
    tracing::debug!(url, records = records.len(), "snapshot fetched");
    Ok(records)
}
