//! Minimal request decoding and response encoding.
//!
//! Only the request line and the final line of the buffer matter: the
//! request line gives the method and path, the last line is taken as the
//! form body. There is no keep-alive, chunking, or header model.

use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::time::timeout;
use tracing::debug;

/// Default number of bytes read from a connection.
pub const DEFAULT_READ_LIMIT: usize = 1024;

const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";

/// A decoded request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: String,
    pub path: String,
    pub body: String,
}

impl Request {
    /// Split a raw buffer into method, path and body.
    ///
    /// A request line with fewer than two space-separated tokens falls back
    /// to `GET /`. The body is always the last `\r\n`-separated line.
    #[must_use]
    pub fn parse(raw: &[u8]) -> Self {
        let text = String::from_utf8_lossy(raw);
        let lines: Vec<&str> = text.split("\r\n").collect();

        let request_line = lines.first().copied().unwrap_or_default();
        let parts: Vec<&str> = request_line.split(' ').collect();
        let (method, path) = if parts.len() < 2 {
            debug!("Malformed request line '{request_line}', defaulting to GET /");
            ("GET", "/")
        } else {
            (parts[0], parts[1])
        };

        let body = lines.last().copied().unwrap_or_default();

        Self {
            method: method.to_string(),
            path: path.to_string(),
            body: body.to_string(),
        }
    }
}

/// Read one request from `stream`, never more than `limit` bytes.
///
/// An empty vector means the peer closed before sending anything. After the
/// first chunk the reader keeps going until the headers are complete and any
/// `Content-Length` body has arrived; a timeout at that stage keeps what was
/// received.
///
/// # Errors
///
/// Returns an error if the first read fails or times out.
pub async fn read_request<S>(
    stream: &mut S,
    limit: usize,
    read_timeout: Duration,
) -> std::io::Result<Vec<u8>>
where
    S: AsyncRead + Unpin,
{
    let mut buffer = vec![0u8; limit];

    let first = timeout(read_timeout, stream.read(&mut buffer))
        .await
        .map_err(|_| {
            std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "no request received before timeout",
            )
        })??;
    let mut filled = first;

    while filled > 0 && filled < limit && !is_complete(&buffer[..filled]) {
        match timeout(read_timeout, stream.read(&mut buffer[filled..])).await {
            Ok(Ok(0)) => break,
            Ok(Ok(n)) => filled += n,
            Ok(Err(e)) => {
                debug!("Read failed after {filled} bytes: {e}");
                break;
            }
            Err(_) => {
                debug!("Timed out waiting for the rest of the request after {filled} bytes");
                break;
            }
        }
    }

    buffer.truncate(filled);
    Ok(buffer)
}

/// Whether `raw` holds the full header block and the announced body.
fn is_complete(raw: &[u8]) -> bool {
    let Some(header_end) = raw
        .windows(HEADER_TERMINATOR.len())
        .position(|window| window == HEADER_TERMINATOR)
    else {
        return false;
    };

    let body_start = header_end + HEADER_TERMINATOR.len();
    let headers = String::from_utf8_lossy(&raw[..header_end]);
    let content_length = headers
        .split("\r\n")
        .skip(1)
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    raw.len() >= body_start + content_length
}

/// Status codes this server answers with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    NotFound,
}

impl Status {
    #[must_use]
    pub fn code(self) -> u16 {
        match self {
            Status::Ok => 200,
            Status::NotFound => 404,
        }
    }

    #[must_use]
    pub fn reason(self) -> &'static str {
        match self {
            Status::Ok => "OK",
            Status::NotFound => "Not Found",
        }
    }
}

/// An HTML response; always followed by closing the connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: Status,
    pub body: String,
}

impl Response {
    #[must_use]
    pub fn html(body: String) -> Self {
        Self {
            status: Status::Ok,
            body,
        }
    }

    #[must_use]
    pub fn not_found() -> Self {
        Self {
            status: Status::NotFound,
            body: NOT_FOUND_PAGE.to_string(),
        }
    }

    /// Wire form: status line, content type, blank line, body.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        format!(
            "HTTP/1.1 {} {}\r\nContent-Type: text/html\r\n\r\n{}",
            self.status.code(),
            self.status.reason(),
            self.body
        )
        .into_bytes()
    }
}

const NOT_FOUND_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
    <title>404 Not Found</title>
</head>
<body>
    <h2>404 - Page Not Found</h2>
    <p>The page you are looking for does not exist.</p>
    <a href="/">Go to Home</a>
</body>
</html>"#;
