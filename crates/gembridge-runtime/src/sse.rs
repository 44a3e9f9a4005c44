//! Server-Sent Events decoding for backend responses.
//!
//! Both supported backends stream their output as SSE:
//!
//! ```text
//! data: {"candidates":[...]}\n
//! \n
//! data: {"candidates":[...]}\n
//! ```
//!
//! [`sse_data_stream`] turns the raw byte stream into the sequence of `data:`
//! payloads, in order, regardless of how the transport split the bytes.

use bytes::{Bytes, BytesMut};
use futures_util::{Stream, StreamExt};
use tracing::warn;

use gembridge_core::BackendError;

/// State threaded through the `unfold` stream.
struct SseState<S> {
    stream: S,
    buf: BytesMut,
    /// Upstream has ended; drain what is left in `buf` and stop.
    eof: bool,
    /// A transport error was reported; nothing more will be yielded.
    failed: bool,
}

/// Convert a byte stream into the `data:` payloads it carries.
///
/// Blank lines, comments (`:`-prefixed) and other SSE fields are skipped.
/// A final line without a trailing newline is still decoded. A transport
/// error is yielded once as [`BackendError::Transport`] and ends the stream.
pub fn sse_data_stream<S, E>(byte_stream: S) -> impl Stream<Item = Result<String, BackendError>>
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    let state = SseState {
        stream: byte_stream.boxed(),
        buf: BytesMut::new(),
        eof: false,
        failed: false,
    };

    futures_util::stream::unfold(state, |mut st| async move {
        if st.failed {
            return None;
        }

        loop {
            // Try to extract a complete line from the buffer.
            if let Some(line_end) = find_newline(&st.buf) {
                let line = st.buf.split_to(line_end);
                let line_str = String::from_utf8_lossy(&line);

                if let Some(data) = parse_data_line(&line_str) {
                    return Some((Ok(data.to_owned()), st));
                }
                continue;
            }

            if st.eof {
                if st.buf.is_empty() {
                    return None;
                }
                // Terminate the dangling line so the loop above picks it up.
                st.buf.extend_from_slice(b"\n");
                continue;
            }

            // Need more data from upstream.
            match st.stream.next().await {
                Some(Ok(chunk)) => st.buf.extend_from_slice(&chunk),
                Some(Err(e)) => {
                    warn!("Backend stream error: {e}");
                    st.failed = true;
                    return Some((Err(BackendError::Transport(e.to_string())), st));
                }
                None => st.eof = true,
            }
        }
    })
}

/// Extract the payload of a `data:` line, if this is one.
fn parse_data_line(line: &str) -> Option<&str> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.is_empty() || line.starts_with(':') {
        return None;
    }
    let data = line.strip_prefix("data:")?;
    Some(data.strip_prefix(' ').unwrap_or(data))
}

/// Find the next newline in the buffer, returning the position after it.
fn find_newline(buf: &BytesMut) -> Option<usize> {
    buf.iter().position(|&b| b == b'\n').map(|pos| pos + 1)
}
