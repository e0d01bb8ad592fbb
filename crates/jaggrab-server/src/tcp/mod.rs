//! TCP JAGGRAB protocol implementation.
//!
//! One request per connection: the client sends a single line, the server
//! writes the response body and shuts the connection down. Any failure closes
//! the connection without writing anything.

use crate::error::{ProtocolError, ServerError};
use crate::server::AppState;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;

pub mod handlers;

use handlers::MAX_REQUEST_LINE;

/// Bind `bind_addr` and serve connections until the task is dropped.
///
/// # Errors
///
/// Returns `ServerError` if the server fails to bind or encounters a fatal error.
pub async fn start_server(bind_addr: SocketAddr, state: Arc<AppState>) -> Result<(), ServerError> {
    let listener =
        TcpListener::bind(bind_addr)
            .await
            .map_err(|source| ServerError::BindFailed {
                addr: bind_addr,
                source,
            })?;

    serve(listener, state).await
}

/// Serve connections from an already bound listener.
///
/// # Errors
///
/// Returns `ServerError` if accepting a connection fails.
pub async fn serve(listener: TcpListener, state: Arc<AppState>) -> Result<(), ServerError> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!("JAGGRAB server listening on {addr}");
    }

    loop {
        let (socket, addr) = listener
            .accept()
            .await
            .map_err(|e| ServerError::Shutdown(format!("Failed to accept TCP connection: {e}")))?;

        let state = Arc::clone(&state);

        tokio::spawn(async move {
            if let Err(e) = handle_connection(socket, state).await {
                if e.is_client_fault() {
                    tracing::debug!("Dropped request from {addr}: {e}");
                } else {
                    tracing::warn!("TCP connection from {addr} failed: {e}");
                }
            }
        });
    }
}

/// Handle a single TCP connection.
async fn handle_connection(
    mut socket: TcpStream,
    state: Arc<AppState>,
) -> Result<(), ProtocolError> {
    let addr = socket.peer_addr()?;
    tracing::debug!("Accepted TCP connection from {addr}");

    let read_timeout = state.read_timeout();
    let mut line = String::new();
    let read = {
        let mut reader = BufReader::new(&mut socket).take(MAX_REQUEST_LINE as u64 + 1);
        timeout(read_timeout, reader.read_line(&mut line)).await
    };

    match read {
        Ok(Ok(0)) => {
            tracing::debug!("TCP connection closed by client: {addr}");
            return Ok(());
        }
        Ok(Ok(n)) if n > MAX_REQUEST_LINE => {
            return Err(ProtocolError::RequestTooLong {
                limit: MAX_REQUEST_LINE,
            });
        }
        Ok(Ok(_)) => {}
        Ok(Err(e)) => return Err(ProtocolError::Io(e)),
        Err(_) => {
            return Err(ProtocolError::Timeout {
                millis: read_timeout.as_millis() as u64,
            });
        }
    }

    let path = handlers::parse_request(&line)?.to_string();
    tracing::debug!("Received request from {addr}: {path}");

    let task_state = Arc::clone(&state);
    let response = tokio::task::spawn_blocking(move || handlers::handle_request(&path, &task_state))
        .await
        .map_err(|e| ProtocolError::Task(e.to_string()))??;

    socket.write_all(&response).await?;
    socket.flush().await?;
    tracing::debug!("Sent {} bytes to {addr}", response.len());

    socket.shutdown().await?;
    Ok(())
}
