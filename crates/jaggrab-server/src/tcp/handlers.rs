//! Request parsing and dispatch.

use crate::error::ProtocolError;
use crate::routes::Route;
use crate::server::AppState;

/// Prefix every request line must start with.
pub const REQUEST_PREFIX: &str = "JAGGRAB /";

/// Longest accepted request line, including the line terminator.
pub const MAX_REQUEST_LINE: usize = 512;

/// Extract the requested path from a request line.
///
/// # Errors
///
/// Returns `ProtocolError::InvalidRequest` if the line lacks the `JAGGRAB /`
/// prefix.
pub fn parse_request(line: &str) -> Result<&str, ProtocolError> {
    line.strip_prefix(REQUEST_PREFIX)
        .map(str::trim)
        .ok_or_else(|| ProtocolError::InvalidRequest(line.trim_end().to_string()))
}

/// Produce the response body for a request path.
///
/// Reads from the cache synchronously; call from a blocking context.
///
/// # Errors
///
/// Returns `ProtocolError` if no route matches or the cache read fails.
pub fn handle_request(path: &str, state: &AppState) -> Result<Vec<u8>, ProtocolError> {
    let route = state
        .routes()
        .resolve(path)
        .ok_or_else(|| ProtocolError::UnknownRoute(path.to_string()))?;

    match route {
        Route::File { archive, file } => Ok(state.store().get_file(archive, file)?.into_bytes()),
        Route::Checksums => Ok(state.checksums().compute(state.store())?.to_bytes()),
    }
}
