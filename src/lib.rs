//! # dns-proxy
//!
//! A threaded caching DNS forwarder.
//!
//! Queries arrive on a UDP socket. Answers come from an in-memory cache when
//! a matching entry exists; otherwise the query is forwarded to the
//! configured upstream resolver and the reply is relayed back to the client
//! and cached. A janitor thread decays record TTLs and evicts entries whose
//! answer and authority sections have both expired.
//!
//! ## Features
//! - Blocking sockets and plain threads, no event loop
//! - Graceful shutdown via [`permit::Permit`]
//! - `forbid(unsafe_code)`
//!
//! ## Limitations
//! - Forwarder only: no recursion from the root servers, no DNSSEC, no TCP
//!   fallback, no EDNS(0)
//! - Name compression pointers are carried as opaque bytes, never followed
//!
//! ## Example
//! ```no_run
//! use dns_proxy::{serve_udp, DnsCache};
//! use permit::Permit;
//! use std::net::UdpSocket;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let permit = Permit::new();
//! let sock = Arc::new(UdpSocket::bind("0.0.0.0:53").unwrap());
//! let cache = Arc::new(DnsCache::new());
//! let upstream = "5.3.3.3:53".parse().unwrap();
//! serve_udp(&permit.new_sub(), &sock, &cache, upstream, Duration::from_secs(2)).unwrap();
//! ```
#![forbid(unsafe_code)]

mod dns_cache;
mod dns_codes;
mod dns_header;
mod dns_message;
mod dns_name;
mod dns_question;
mod dns_record;
mod dns_server;
mod dns_upstream;
mod worker_pool;

pub use dns_cache::DnsCache;
pub use dns_codes::{DnsClass, DnsOpCode, DnsResponseCode, DnsType};
pub use dns_header::DnsHeader;
pub use dns_message::DnsMessage;
pub use dns_name::DnsName;
pub use dns_question::DnsQuestion;
pub use dns_record::DnsRecord;
pub use dns_server::serve_udp;
pub use dns_upstream::{query_upstream, DEFAULT_UPSTREAM_TIMEOUT};

use fixed_buffer::FixedBuf;

/// Size of every receive and encode buffer. Datagrams larger than this are
/// truncated by the OS and fail to parse.
pub const DATAGRAM_SIZE: usize = 2048;

/// Errors surfaced by the codec, the cache janitor path, the upstream client,
/// and the dispatcher. Per-request errors are logged and the request dropped;
/// no error reply is synthesized for the client.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum DnsError {
    /// Buffer too short or structurally invalid.
    #[error("malformed DNS message")]
    MalformedMessage,
    /// The decoded message had zero questions.
    #[error("message has no question")]
    NoQuestion,
    /// An encoded message did not fit the output buffer.
    #[error("response buffer full")]
    ResponseBufferFull,
    /// The listen socket went away. Normal during shutdown.
    #[error("listen socket closed")]
    SocketClosed,
    /// Sending to the upstream resolver failed.
    #[error("upstream unreachable: {0}")]
    UpstreamUnreachable(String),
    /// No reply from the upstream resolver before the receive timeout.
    #[error("upstream timed out")]
    UpstreamTimeout,
    #[error("internal error: {0}")]
    Internal(String),
}

// All byte-order conversion happens in these helpers, exactly once per field
// in each direction. Everything in the message structs is host order.

fn read_exact<const N: usize, const M: usize>(buf: &mut FixedBuf<N>) -> Result<[u8; M], DnsError> {
    let mut result = [0_u8; M];
    buf.try_read_exact(&mut result)
        .ok_or(DnsError::MalformedMessage)?;
    Ok(result)
}

fn read_u8<const N: usize>(buf: &mut FixedBuf<N>) -> Result<u8, DnsError> {
    buf.try_read_byte().ok_or(DnsError::MalformedMessage)
}

fn read_u16_be<const N: usize>(buf: &mut FixedBuf<N>) -> Result<u16, DnsError> {
    let bytes: [u8; 2] = read_exact(buf)?;
    Ok(u16::from_be_bytes(bytes))
}

fn read_u32_be<const N: usize>(buf: &mut FixedBuf<N>) -> Result<u32, DnsError> {
    let bytes: [u8; 4] = read_exact(buf)?;
    Ok(u32::from_be_bytes(bytes))
}

fn read_vec<const N: usize>(buf: &mut FixedBuf<N>, len: usize) -> Result<Vec<u8>, DnsError> {
    let mut bytes = vec![0_u8; len];
    buf.try_read_exact(&mut bytes)
        .ok_or(DnsError::MalformedMessage)?;
    Ok(bytes)
}

fn write_bytes<const N: usize>(out: &mut FixedBuf<N>, bytes: &[u8]) -> Result<(), DnsError> {
    out.write_bytes(bytes)
        .map_err(|_| DnsError::ResponseBufferFull)?;
    Ok(())
}

fn write_u16_be<const N: usize>(out: &mut FixedBuf<N>, value: u16) -> Result<(), DnsError> {
    write_bytes(out, &value.to_be_bytes())
}

fn write_u32_be<const N: usize>(out: &mut FixedBuf<N>, value: u32) -> Result<(), DnsError> {
    write_bytes(out, &value.to_be_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_u16_round_trip() {
        for value in [0_u16, 1, 0x1234, 0x8000, u16::MAX] {
            let mut buf: FixedBuf<2> = FixedBuf::new();
            write_u16_be(&mut buf, value).unwrap();
            assert_eq!(value, read_u16_be(&mut buf).unwrap());
        }
    }

    #[test]
    fn test_u32_round_trip() {
        for value in [0_u32, 1, 0x0000_FFFF, 0x1234_5678, u32::MAX] {
            let mut buf: FixedBuf<4> = FixedBuf::new();
            write_u32_be(&mut buf, value).unwrap();
            assert_eq!(value, read_u32_be(&mut buf).unwrap());
        }
    }

    #[test]
    fn test_byte_swap_is_self_inverse() {
        for value in [0_u16, 1, 0x00FF, 0xABCD, u16::MAX] {
            assert_eq!(value, value.swap_bytes().swap_bytes());
        }
        for value in [0_u32, 1, 0x00FF_0000, 0xDEAD_BEEF, u32::MAX] {
            assert_eq!(value, value.swap_bytes().swap_bytes());
        }
    }

    #[test]
    fn test_truncated_reads_fail() {
        let mut buf: FixedBuf<8> = FixedBuf::new();
        buf.write_bytes(&[1, 2, 3]).unwrap();
        // A failed read consumes nothing, so both attempts see all 3 bytes.
        assert_eq!(Err(DnsError::MalformedMessage), read_u32_be(&mut buf));
        assert_eq!(Err(DnsError::MalformedMessage), read_vec(&mut buf, 4));
    }

    #[test]
    fn test_write_past_capacity_fails() {
        let mut buf: FixedBuf<2> = FixedBuf::new();
        assert_eq!(
            Err(DnsError::ResponseBufferFull),
            write_u32_be(&mut buf, 7)
        );
    }
}
