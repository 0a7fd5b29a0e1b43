use crate::{DnsError, DATAGRAM_SIZE};
use std::io::ErrorKind;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, UdpSocket};
use std::time::Duration;

/// How long to wait for the upstream resolver's reply.
pub const DEFAULT_UPSTREAM_TIMEOUT: Duration = Duration::from_secs(2);

/// Sends `request` to the upstream resolver from a fresh ephemeral socket and
/// waits for a single reply, returning its bytes.
///
/// One send, one receive, no retries: a lost exchange surfaces as an error
/// and the client retries on its own schedule.
///
/// # Errors
/// Returns [`DnsError::UpstreamUnreachable`] when the socket cannot be set up
/// or the send fails, and [`DnsError::UpstreamTimeout`] when no reply arrives
/// within `timeout`.
pub fn query_upstream(
    request: &[u8],
    upstream: SocketAddr,
    timeout: Duration,
) -> Result<Vec<u8>, DnsError> {
    let sock = UdpSocket::bind(SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0)))
        .map_err(|e| DnsError::UpstreamUnreachable(format!("error binding socket: {}", e)))?;
    sock.set_read_timeout(Some(timeout))
        .map_err(|e| DnsError::UpstreamUnreachable(format!("error setting timeout: {}", e)))?;
    sock.send_to(request, upstream)
        .map_err(|e| DnsError::UpstreamUnreachable(format!("error sending to {}: {}", upstream, e)))?;
    let mut buf = [0_u8; DATAGRAM_SIZE];
    let (len, _) = sock.recv_from(&mut buf).map_err(|e| match e.kind() {
        ErrorKind::WouldBlock | ErrorKind::TimedOut => DnsError::UpstreamTimeout,
        _ => DnsError::UpstreamUnreachable(format!("error receiving from {}: {}", upstream, e)),
    })?;
    Ok(buf[..len].to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn localhost() -> SocketAddr {
        SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::LOCALHOST, 0))
    }

    #[test]
    fn test_exchange() {
        let upstream = UdpSocket::bind(localhost()).unwrap();
        let upstream_addr = upstream.local_addr().unwrap();
        let responder = std::thread::spawn(move || {
            let mut buf = [0_u8; DATAGRAM_SIZE];
            let (len, peer) = upstream.recv_from(&mut buf).unwrap();
            assert_eq!(&[1, 2, 3], &buf[..len]);
            upstream.send_to(&[4, 5, 6, 7], peer).unwrap();
        });
        let reply = query_upstream(&[1, 2, 3], upstream_addr, Duration::from_secs(5)).unwrap();
        assert_eq!(vec![4, 5, 6, 7], reply);
        responder.join().unwrap();
    }

    #[test]
    fn test_timeout() {
        // Bound but mute.
        let upstream = UdpSocket::bind(localhost()).unwrap();
        let upstream_addr = upstream.local_addr().unwrap();
        assert_eq!(
            Err(DnsError::UpstreamTimeout),
            query_upstream(&[1, 2, 3], upstream_addr, Duration::from_millis(100))
        );
    }
}
