use std::net::SocketAddr;

use crate::error::ParseError;

/// 每个连接携带的负载长度，传感器固件按 6 字节发送
pub const PAYLOAD_LEN: usize = 6;

/// One decibel measurement received from a sensor connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reading {
    pub peer: SocketAddr,
    /// Bytes as received, never longer than `PAYLOAD_LEN`
    pub raw: Vec<u8>,
    /// Decibel level
    pub value: i32,
}

impl Reading {
    pub fn from_payload(peer: SocketAddr, raw: &[u8]) -> Result<Self, ParseError> {
        let raw = &raw[..raw.len().min(PAYLOAD_LEN)];
        let value = parse_payload(raw)?;
        Ok(Self {
            peer,
            raw: raw.to_vec(),
            value,
        })
    }

    /// Payload text with the NUL padding removed, used for the per-reading log line.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(significant(&self.raw)).trim().to_string()
    }
}

/// Decode the ASCII decimal payload.
///
/// Only the first `PAYLOAD_LEN` bytes count. The text ends at the first NUL and
/// surrounding ASCII whitespace is ignored. Anything else must be a signed
/// decimal integer; there is no default value for bad input.
pub fn parse_payload(raw: &[u8]) -> Result<i32, ParseError> {
    let bytes = significant(&raw[..raw.len().min(PAYLOAD_LEN)]);
    let text = match std::str::from_utf8(bytes) {
        Ok(text) => text.trim_matches(|c: char| c.is_ascii_whitespace()),
        Err(_) => return Err(ParseError::Invalid(String::from_utf8_lossy(bytes).into_owned())),
    };

    if text.is_empty() {
        return Err(ParseError::Empty);
    }

    text.parse::<i32>()
        .map_err(|_| ParseError::Invalid(text.to_string()))
}

// 截断到第一个 '\0'
fn significant(raw: &[u8]) -> &[u8] {
    match raw.iter().position(|&b| b == 0) {
        Some(end) => &raw[..end],
        None => raw,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer() -> SocketAddr {
        "192.168.1.20:40000".parse().unwrap()
    }

    #[test]
    fn parses_nul_padded_payloads() {
        assert_eq!(parse_payload(b"-100\0\0"), Ok(-100));
        assert_eq!(parse_payload(b"50\0\0\0\0"), Ok(50));
        assert_eq!(parse_payload(b"-42"), Ok(-42));
    }

    #[test]
    fn ignores_surrounding_whitespace() {
        assert_eq!(parse_payload(b" 7\n"), Ok(7));
        assert_eq!(parse_payload(b"-41\r\n"), Ok(-41));
    }

    #[test]
    fn only_six_bytes_are_significant() {
        // 第 7 个字节之后的内容被丢弃
        assert_eq!(parse_payload(b"123456789"), Ok(123456));
        assert_eq!(parse_payload(b"-12345X"), Ok(-12345));
    }

    #[test]
    fn empty_payload_is_rejected() {
        assert_eq!(parse_payload(b""), Err(ParseError::Empty));
        assert_eq!(parse_payload(b"\0\0\0\0\0\0"), Err(ParseError::Empty));
        assert_eq!(parse_payload(b"   "), Err(ParseError::Empty));
    }

    #[test]
    fn garbage_is_rejected() {
        assert_eq!(parse_payload(b"abc"), Err(ParseError::Invalid("abc".into())));
        assert_eq!(parse_payload(b"12ab"), Err(ParseError::Invalid("12ab".into())));
        assert_eq!(parse_payload(b"-"), Err(ParseError::Invalid("-".into())));
        assert!(matches!(parse_payload(&[0xff, 0xfe]), Err(ParseError::Invalid(_))));
    }

    #[test]
    fn reading_keeps_truncated_raw_bytes() {
        let reading = Reading::from_payload(peer(), b"-100\0\0\0extra").unwrap();
        assert_eq!(reading.raw, b"-100\0\0");
        assert_eq!(reading.value, -100);
        assert_eq!(reading.text(), "-100");
        assert_eq!(reading.peer, peer());
    }
}
