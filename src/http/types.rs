//! Core HTTP protocol types shared by the parser, relay, and error renderer.

use crate::errors::ProxyError;

// TO LOWER CASE

#[rustfmt::skip]
const ASCII_TABLE: [u8; 256] = [
    //   x0    x1    x2    x3    x4    x5    x6    x7    x8    x9    xA    xB    xC    xD    xE    xF
    0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0A, 0x0B, 0x0C, 0x0D, 0x0E, 0x0F, // 0x
    0x10, 0x11, 0x12, 0x13, 0x14, 0x15, 0x16, 0x17, 0x18, 0x19, 0x1A, 0x1B, 0x1C, 0x1D, 0x1E, 0x1F, // 1x
    0x20, 0x21, 0x22, 0x23, 0x24, 0x25, 0x26, 0x27, 0x28, 0x29, 0x2A, 0x2B, 0x2C, 0x2D, 0x2E, 0x2F, // 2x
    0x30, 0x31, 0x32, 0x33, 0x34, 0x35, 0x36, 0x37, 0x38, 0x39, 0x3A, 0x3B, 0x3C, 0x3D, 0x3E, 0x3F, // 3x
    0x40, b'a', b'b', b'c', b'd', b'e', b'f', b'g', b'h', b'i', b'j', b'k', b'l', b'm', b'n', b'o', // 4x
    b'p', b'q', b'r', b's', b't', b'u', b'v', b'w', b'x', b'y', b'z', 0x5B, 0x5C, 0x5D, 0x5E, 0x5F, // 5x
    0x60, b'a', b'b', b'c', b'd', b'e', b'f', b'g', b'h', b'i', b'j', b'k', b'l', b'm', b'n', b'o', // 6x
    b'p', b'q', b'r', b's', b't', b'u', b'v', b'w', b'x', b'y', b'z', 0x7B, 0x7C, 0x7D, 0x7E, 0x7F, // 7x
    0x80, 0x81, 0x82, 0x83, 0x84, 0x85, 0x86, 0x87, 0x88, 0x89, 0x8A, 0x8B, 0x8C, 0x8D, 0x8E, 0x8F, // 8x
    0x90, 0x91, 0x92, 0x93, 0x94, 0x95, 0x96, 0x97, 0x98, 0x99, 0x9A, 0x9B, 0x9C, 0x9D, 0x9E, 0x9F, // 9x
    0xA0, 0xA1, 0xA2, 0xA3, 0xA4, 0xA5, 0xA6, 0xA7, 0xA8, 0xA9, 0xAA, 0xAB, 0xAC, 0xAD, 0xAE, 0xAF, // Ax
    0xB0, 0xB1, 0xB2, 0xB3, 0xB4, 0xB5, 0xB6, 0xB7, 0xB8, 0xB9, 0xBA, 0xBB, 0xBC, 0xBD, 0xBE, 0xBF, // Bx
    0xC0, 0xC1, 0xC2, 0xC3, 0xC4, 0xC5, 0xC6, 0xC7, 0xC8, 0xC9, 0xCA, 0xCB, 0xCC, 0xCD, 0xCE, 0xCF, // Cx
    0xD0, 0xD1, 0xD2, 0xD3, 0xD4, 0xD5, 0xD6, 0xD7, 0xD8, 0xD9, 0xDA, 0xDB, 0xDC, 0xDD, 0xDE, 0xDF, // Dx
    0xE0, 0xE1, 0xE2, 0xE3, 0xE4, 0xE5, 0xE6, 0xE7, 0xE8, 0xE9, 0xEA, 0xEB, 0xEC, 0xED, 0xEE, 0xEF, // Ex
    0xF0, 0xF1, 0xF2, 0xF3, 0xF4, 0xF5, 0xF6, 0xF7, 0xF8, 0xF9, 0xFA, 0xFB, 0xFC, 0xFD, 0xFE, 0xFF, // Fx
];

#[inline(always)]
pub(crate) fn eq_ignore_case(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(&x, &y)| ASCII_TABLE[x as usize] == ASCII_TABLE[y as usize])
}

#[inline(always)]
pub(crate) fn slice_to_u16(bytes: &[u8]) -> Option<u16> {
    let mut result: u16 = 0;

    for &byte in bytes {
        if !byte.is_ascii_digit() {
            return None;
        }

        result = result
            .checked_mul(10)?
            .checked_add((byte - b'0') as u16)?;
    }

    Some(result)
}

// METHOD

/// HTTP request methods recognized on the request line.
///
/// Only `Get` is ever relayed; every other method is parsed far
/// enough to be recognized and then rejected with 501 — the
/// core never needs to dispatch on the others, so they collapse to
/// `Other`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Method {
    /// `GET` — the only method this proxy forwards upstream.
    Get,
    /// Any method other than `GET`; always rejected with 501.
    Other,
}

impl Method {
    /// Parses the method token at the start of `src`, returning the
    /// method and the byte offset of the single space that follows it.
    #[inline(always)]
    pub(crate) fn from_bytes(src: &[u8]) -> Result<(Self, usize), ProxyError> {
        match src {
            [b'G', b'E', b'T', b' ', ..] => Ok((Method::Get, 4)),
            _ => {
                let space = memchr::memchr(b' ', src).ok_or(ProxyError::ClientProtocolError)?;
                if space == 0 || !src[..space].iter().all(|b| b.is_ascii_alphabetic()) {
                    return Err(ProxyError::ClientProtocolError);
                }
                Ok((Method::Other, space + 1))
            }
        }
    }
}

// VERSION

/// HTTP protocol version carried on the request line ("HTTP/1.0 or
/// HTTP/1.1 request"). HTTP/0.9 and anything else is a parse failure.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Version {
    /// [RFC 1945](https://tools.ietf.org/html/rfc1945)
    Http10,
    /// [RFC 7230](https://tools.ietf.org/html/rfc7230) and related
    Http11,
}

impl Version {
    #[inline(always)]
    pub(crate) const fn from_bytes(src: &[u8]) -> Result<Self, ProxyError> {
        match src {
            b"HTTP/1.1" => Ok(Self::Http11),
            b"HTTP/1.0" => Ok(Self::Http10),
            _ => Err(ProxyError::ClientProtocolError),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_recognizes_get() {
        assert_eq!(Method::from_bytes(b"GET / HTTP/1.1\r\n").unwrap().0, Method::Get);
    }

    #[test]
    fn method_collapses_non_get_to_other() {
        let (method, consumed) = Method::from_bytes(b"POST / HTTP/1.1\r\n").unwrap();
        assert_eq!(method, Method::Other);
        assert_eq!(consumed, 5);
    }

    #[test]
    fn method_rejects_missing_space() {
        assert!(Method::from_bytes(b"GET").is_err());
    }

    #[test]
    fn version_rejects_http09() {
        assert!(Version::from_bytes(b"HTTP/0.9").is_err());
    }

    #[test]
    fn eq_ignore_case_matches_mixed_case_header_names() {
        assert!(eq_ignore_case(b"Host", b"host"));
        assert!(eq_ignore_case(b"CONNECTION", b"connection"));
        assert!(!eq_ignore_case(b"Host", b"Hosts"));
    }

    #[test]
    fn slice_to_u16_parses_decimal_port() {
        assert_eq!(slice_to_u16(b"8080"), Some(8080));
        assert_eq!(slice_to_u16(b"80a"), None);
    }
}
