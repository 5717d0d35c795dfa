//! HTTP request parser.
//!
//! Splits a raw header buffer into method, path, version, host, optional
//! port, and the header list, borrowing every field from the buffer the
//! caller owns. A self-referential connection struct that keeps a parsed
//! request alive past its buffer would need `unsafe` lifetime extension
//! to `'static`, but nothing here needs to outlive the caller's own
//! stack frame, so the borrow is kept honest and no `unsafe` is needed.

use crate::{
    errors::ProxyError,
    http::types::{self, Method, Version},
};
use memchr::memchr;

/// A request parsed out of the bytes a client sent, borrowing from them.
///
/// The core treats every field as read-only after parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRequest<'a> {
    pub method: Method,
    pub path: &'a [u8],
    pub version: Version,
    pub host: &'a [u8],
    /// Raw decimal digits of the `Host:` header's port suffix, if any.
    /// The caller is responsible for parsing this into a `u16` when
    /// relaying; a present-but-non-numeric port is not a parse failure
    /// here.
    pub port: Option<&'a [u8]>,
    pub headers: Vec<(&'a [u8], &'a [u8])>,
}

/// Parses `buf`, which must contain at least one full request up to and
/// including the header terminator `\r\n\r\n` (the caller guarantees this
/// before calling). Returns `ClientProtocolError` on any
/// malformed request line, header, or unsupported HTTP version.
pub fn parse(buf: &[u8]) -> Result<ParsedRequest<'_>, ProxyError> {
    let (method, method_len) = Method::from_bytes(buf)?;
    let (path, version, rest) = parse_request_line(&buf[method_len..])?;
    let headers = parse_headers(rest)?;

    let (host, port) = split_host_port(find_header(&headers, b"host").unwrap_or(b""));

    Ok(ParsedRequest {
        method,
        path,
        version,
        host,
        port,
        headers,
    })
}

/// Consumes `<path> <version>\r\n` from the start of `src`, returning
/// the path, the version, and the remainder starting just after the
/// request line.
fn parse_request_line(src: &[u8]) -> Result<(&[u8], Version, &[u8]), ProxyError> {
    let line_end = memchr(b'\r', src).ok_or(ProxyError::ClientProtocolError)?;
    if src.get(line_end + 1) != Some(&b'\n') {
        return Err(ProxyError::ClientProtocolError);
    }
    let line = &src[..line_end];

    let space = memchr(b' ', line).ok_or(ProxyError::ClientProtocolError)?;
    let path = &line[..space];
    if path.is_empty() || path[0] != b'/' {
        return Err(ProxyError::ClientProtocolError);
    }

    let version = Version::from_bytes(&line[space + 1..])?;

    Ok((path, version, &src[line_end + 2..]))
}

/// Splits `\r\n`-terminated header lines out of `src` up to (but not
/// including) the blank-line terminator, returning each as a
/// case-preserved `(name, value)` pair with surrounding whitespace on
/// the value trimmed.
fn parse_headers(src: &[u8]) -> Result<Vec<(&[u8], &[u8])>, ProxyError> {
    let mut headers = Vec::new();
    let mut pos = 0;

    loop {
        if src[pos..].starts_with(b"\r\n") {
            return Ok(headers);
        }

        let line_end = pos + memchr(b'\r', &src[pos..]).ok_or(ProxyError::ClientProtocolError)?;
        if src.get(line_end + 1) != Some(&b'\n') {
            return Err(ProxyError::ClientProtocolError);
        }
        let line = &src[pos..line_end];

        let colon = memchr(b':', line).ok_or(ProxyError::ClientProtocolError)?;
        if colon == 0 {
            return Err(ProxyError::ClientProtocolError);
        }
        let name = &line[..colon];
        let value = trim(&line[colon + 1..]);

        headers.push((name, value));
        pos = line_end + 2;

        if pos > src.len() {
            return Err(ProxyError::ClientProtocolError);
        }
    }
}

#[inline(always)]
fn trim(mut bytes: &[u8]) -> &[u8] {
    while let [b' ' | b'\t', rest @ ..] = bytes {
        bytes = rest;
    }
    while let [rest @ .., b' ' | b'\t'] = bytes {
        bytes = rest;
    }
    bytes
}

/// Case-insensitive lookup of the first header named `name`.
fn find_header<'a>(headers: &[(&'a [u8], &'a [u8])], name: &[u8]) -> Option<&'a [u8]> {
    headers
        .iter()
        .find(|(key, _)| types::eq_ignore_case(key, name))
        .map(|(_, value)| *value)
}

/// Splits a `Host:` header value into (host, optional raw port digits).
/// An empty `host` argument (header absent) yields `(b"", None)`; the
/// worker surfaces that as a connect failure downstream rather than a
/// parse failure, since only the header terminator matters when treating
/// `port` as optional, not `host`.
fn split_host_port(host_header: &[u8]) -> (&[u8], Option<&[u8]>) {
    match memchr(b':', host_header) {
        Some(colon) => (&host_header[..colon], Some(&host_header[colon + 1..])),
        None => (host_header, None),
    }
}
