//! Request model and wire parsing.
//!
//! # Responsibilities
//! - Read one request off a buffered connection reader
//! - Split the request line into method, target and version
//! - Collect headers (lower-cased names, trimmed values, last wins)
//! - Read a fixed-length body when `Content-Length` is present
//!
//! # Design Decisions
//! - EOF before a request line is a clean close, not an error
//! - Malformed header lines are skipped; a malformed request line is fatal
//! - Header section and body sizes are bounded by `LimitsConfig`
//! - No chunked transfer-encoding

use std::collections::HashMap;

use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

use crate::config::LimitsConfig;

/// The only protocol version the pipeline serves.
pub const HTTP_1_1: &str = "HTTP/1.1";

/// A parsed HTTP request. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    method: String,
    path: String,
    version: String,
    headers: HashMap<String, String>,
    body: Option<Vec<u8>>,
}

impl Request {
    /// Create a request with no headers and no body.
    pub fn new(
        method: impl Into<String>,
        path: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            version: version.into(),
            headers: HashMap::new(),
            body: None,
        }
    }

    /// Add a header. The name is normalized the same way the parser does it.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers
            .insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    /// The raw request target, not URL-decoded.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Look up a header by name, case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// The body, present only when a positive `Content-Length` was sent.
    pub fn body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }

    /// Whether the client asked for the connection to be closed after this exchange.
    pub fn wants_close(&self) -> bool {
        self.header("connection")
            .map(|v| v.eq_ignore_ascii_case("close"))
            .unwrap_or(false)
    }
}

/// Reasons a request could not be read off the wire.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The peer closed the stream before sending a complete request line.
    #[error("connection closed by client")]
    ConnectionClosed,
    #[error("invalid HTTP request line: {0:?}")]
    MalformedRequestLine(String),
    #[error("connection closed before end of headers")]
    IncompleteHeaders,
    #[error("header section too large")]
    HeadersTooLarge,
    #[error("content-length {length} exceeds limit of {limit} bytes")]
    BodyTooLarge { length: usize, limit: usize },
    #[error("request body truncated: expected {expected} bytes, received {received}")]
    TruncatedBody { expected: usize, received: usize },
    #[error("error reading request: {0}")]
    Io(#[from] std::io::Error),
}

impl ParseError {
    /// True for the normal end of a keep-alive connection.
    pub fn is_clean_close(&self) -> bool {
        matches!(self, ParseError::ConnectionClosed)
    }
}

/// Read one request from `reader`.
///
/// The reader is left positioned right after the body so the next call
/// picks up the following request on the same connection.
pub async fn read_request<R>(reader: &mut R, limits: &LimitsConfig) -> Result<Request, ParseError>
where
    R: AsyncBufRead + Unpin,
{
    let mut budget = limits.max_header_bytes;
    let mut line = Vec::new();

    let request_line = loop {
        match read_line(reader, &mut line, &mut budget).await? {
            LineRead::Eof => return Err(ParseError::ConnectionClosed),
            LineRead::Line if line.is_empty() => continue,
            LineRead::Line => break String::from_utf8_lossy(&line).into_owned(),
        }
    };

    let mut headers = HashMap::new();
    loop {
        match read_line(reader, &mut line, &mut budget).await? {
            LineRead::Eof => return Err(ParseError::IncompleteHeaders),
            LineRead::Line if line.is_empty() => break,
            LineRead::Line => {
                let text = String::from_utf8_lossy(&line);
                match text.split_once(':') {
                    Some((name, value)) => {
                        headers.insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
                    }
                    None => tracing::warn!(line = %text, "Invalid header format"),
                }
            }
        }
    }

    let body = match headers
        .get("content-length")
        .and_then(|v| v.parse::<usize>().ok())
    {
        Some(length) if length > 0 => Some(read_body(reader, length, limits).await?),
        _ => None,
    };

    let parts: Vec<&str> = request_line.trim().split(' ').collect();
    let [method, path, version] = parts.as_slice() else {
        return Err(ParseError::MalformedRequestLine(request_line.trim().to_string()));
    };

    Ok(Request {
        method: (*method).to_string(),
        path: (*path).to_string(),
        version: (*version).to_string(),
        headers,
        body,
    })
}

enum LineRead {
    Line,
    Eof,
}

/// Read one line into `line` without its terminator (LF or CRLF).
///
/// A line cut short by end of stream counts as `Eof`.
async fn read_line<R>(
    reader: &mut R,
    line: &mut Vec<u8>,
    budget: &mut usize,
) -> Result<LineRead, ParseError>
where
    R: AsyncBufRead + Unpin,
{
    line.clear();
    // One extra byte distinguishes "exactly at the limit" from "over it".
    let mut limited = (&mut *reader).take(*budget as u64 + 1);
    let read = limited.read_until(b'\n', line).await?;

    if read > *budget {
        return Err(ParseError::HeadersTooLarge);
    }
    *budget -= read;

    if line.last() != Some(&b'\n') {
        return Ok(LineRead::Eof);
    }
    line.pop();
    if line.last() == Some(&b'\r') {
        line.pop();
    }
    Ok(LineRead::Line)
}

async fn read_body<R>(reader: &mut R, length: usize, limits: &LimitsConfig) -> Result<Vec<u8>, ParseError>
where
    R: AsyncBufRead + Unpin,
{
    if length > limits.max_body_bytes {
        return Err(ParseError::BodyTooLarge {
            length,
            limit: limits.max_body_bytes,
        });
    }

    let mut body = Vec::with_capacity(length);
    (&mut *reader).take(length as u64).read_to_end(&mut body).await?;
    if body.len() < length {
        return Err(ParseError::TruncatedBody {
            expected: length,
            received: body.len(),
        });
    }
    Ok(body)
}
