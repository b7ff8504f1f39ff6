use std::fmt;

use crate::http::request::{Method, Request, Version, normalize_resource};

/// Upper bound on the request line plus header block.
pub const MAX_HEADER_BYTES: usize = 64 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    InvalidRequestLine,
    InvalidMethod,
    InvalidVersion,
    InvalidHeader,
    InvalidContentLength,
    HeadersTooLarge,
    Incomplete,
}

impl ParseError {
    /// Everything except `Incomplete` is answered with 400.
    pub fn is_malformed(&self) -> bool {
        !matches!(self, ParseError::Incomplete)
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            ParseError::InvalidRequestLine => "request line must have exactly three tokens",
            ParseError::InvalidMethod => "unrecognised method",
            ParseError::InvalidVersion => "unsupported protocol version",
            ParseError::InvalidHeader => "header line without \": \" separator",
            ParseError::InvalidContentLength => "Content-Length is not a non-negative integer",
            ParseError::HeadersTooLarge => "header block too large",
            ParseError::Incomplete => "request incomplete",
        };
        f.write_str(msg)
    }
}

impl std::error::Error for ParseError {}

/// Parses a request from the bytes received so far.
///
/// `at_eof` tells the parser the peer has stopped sending: an unterminated
/// last line is then taken as-is, the header block ends, and a short body is
/// accepted with whatever bytes arrived. Without it, missing data yields
/// `ParseError::Incomplete`.
///
/// The request line is validated as soon as it is complete, so a malformed
/// line is reported without waiting for the headers.
pub fn parse_http_request(buf: &[u8], at_eof: bool) -> Result<(Request, usize), ParseError> {
    let (line, mut pos) = match next_line(buf, 0, at_eof) {
        Some(found) => found,
        None if at_eof => return Err(ParseError::InvalidRequestLine),
        None => return Err(incomplete_or_too_large(buf.len())),
    };

    let (method, resource, version) = parse_request_line(line)?;

    // Headers
    let mut content_length = None;

    loop {
        let Some((line, next)) = next_line(buf, pos, at_eof) else {
            if at_eof {
                break;
            }
            return Err(incomplete_or_too_large(buf.len()));
        };

        if next > MAX_HEADER_BYTES {
            return Err(ParseError::HeadersTooLarge);
        }
        pos = next;

        if line.is_empty() {
            break;
        }

        if let Some(length) = parse_header(line)? {
            content_length = Some(length);
        }
    }

    // Body
    let (body, consumed) = match content_length {
        None => (None, pos),
        Some(length) => {
            let available = &buf[pos..];
            if available.len() >= length {
                (Some(available[..length].to_vec()), pos + length)
            } else if at_eof {
                (Some(available.to_vec()), buf.len())
            } else {
                return Err(ParseError::Incomplete);
            }
        }
    };

    let request = Request {
        method,
        resource,
        version,
        content_length,
        body: body.filter(|b| !b.is_empty()),
    };

    Ok((request, consumed))
}

fn parse_request_line(line: &[u8]) -> Result<(Method, String, Version), ParseError> {
    let line = std::str::from_utf8(line).map_err(|_| ParseError::InvalidRequestLine)?;
    // Every whitespace character separates, so runs of spaces yield empty
    // tokens. Only trailing separators are ignored.
    let mut parts: Vec<&str> = line.split(|c: char| c.is_ascii_whitespace()).collect();
    while parts.last() == Some(&"") {
        parts.pop();
    }

    let [method, resource, version] = parts.as_slice() else {
        return Err(ParseError::InvalidRequestLine);
    };

    let method = Method::from_str(method).ok_or(ParseError::InvalidMethod)?;
    let version = Version::from_str(version).ok_or(ParseError::InvalidVersion)?;

    Ok((method, normalize_resource(resource), version))
}

/// Validates one header line and returns the body length if it is
/// `Content-Length`. Every other header is dropped.
fn parse_header(line: &[u8]) -> Result<Option<usize>, ParseError> {
    let line = std::str::from_utf8(line).map_err(|_| ParseError::InvalidHeader)?;
    let (key, value) = line.split_once(": ").ok_or(ParseError::InvalidHeader)?;

    if value.is_empty() {
        return Err(ParseError::InvalidHeader);
    }

    if !key.eq_ignore_ascii_case("Content-Length") {
        return Ok(None);
    }

    value
        .trim()
        .parse::<usize>()
        .map(Some)
        .map_err(|_| ParseError::InvalidContentLength)
}

/// Returns the line starting at `start` without its terminator, and the
/// offset just past it. Accepts `\r\n` and bare `\n`.
fn next_line(buf: &[u8], start: usize, at_eof: bool) -> Option<(&[u8], usize)> {
    let rest = buf.get(start..)?;

    match rest.iter().position(|&b| b == b'\n') {
        Some(end) => {
            let line = &rest[..end];
            let line = line.strip_suffix(b"\r").unwrap_or(line);
            Some((line, start + end + 1))
        }
        None if at_eof && !rest.is_empty() => {
            let line = rest.strip_suffix(b"\r").unwrap_or(rest);
            Some((line, buf.len()))
        }
        None => None,
    }
}

fn incomplete_or_too_large(buffered: usize) -> ParseError {
    if buffered > MAX_HEADER_BYTES {
        ParseError::HeadersTooLarge
    } else {
        ParseError::Incomplete
    }
}
