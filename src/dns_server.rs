use crate::worker_pool::{PoolHandle, WorkerPool};
use crate::{query_upstream, write_bytes, DnsCache, DnsError, DnsMessage, DATAGRAM_SIZE};
use fixed_buffer::FixedBuf;
use log::{debug, info, warn};
use permit::Permit;
use std::io::ErrorKind;
use std::net::{SocketAddr, UdpSocket};
use std::sync::Arc;
use std::time::Duration;

/// How long a blocked `recv_from` holds up the accept loop before it
/// re-checks the shutdown permit.
const ACCEPT_TIMEOUT: Duration = Duration::from_millis(200);

/// Cache aging interval, which is also the amount each pass subtracts from
/// record TTLs.
const JANITOR_PERIOD_SECONDS: u32 = 60;

/// Size of the dispatcher's worker pool. The accept task and the janitor
/// occupy two workers for the life of the server, so the floor keeps at
/// least two free for requests.
fn pool_size() -> usize {
    std::thread::available_parallelism()
        .map_or(4, std::num::NonZeroUsize::get)
        .max(4)
}

/// Resolves one datagram: cache hit answers locally with the client's
/// transaction id; a miss asks the upstream, relays the reply verbatim, and
/// caches the decoded reply under the question name.
fn handle_request(
    sock: &UdpSocket,
    cache: &DnsCache,
    upstream: SocketAddr,
    upstream_timeout: Duration,
    mut datagram: FixedBuf<DATAGRAM_SIZE>,
    client: SocketAddr,
) -> Result<(), DnsError> {
    let request_bytes = datagram.readable().to_vec();
    let request = DnsMessage::parse(&mut datagram)?;
    let question = request.questions.first().ok_or(DnsError::NoQuestion)?;
    let name = question.name.clone();
    if let Some(mut cached) = cache.get(&name) {
        debug!("cache hit for {} from {}", name, client);
        cached.header.id = request.header.id;
        let mut out: FixedBuf<DATAGRAM_SIZE> = FixedBuf::new();
        cached.write(&mut out)?;
        sock.send_to(out.readable(), client).map_err(|e| {
            DnsError::Internal(format!("error sending response to {}: {}", client, e))
        })?;
        return Ok(());
    }
    debug!("cache miss for {}, asking {}", name, upstream);
    let reply = query_upstream(&request_bytes, upstream, upstream_timeout)?;
    sock.send_to(&reply, client).map_err(|e| {
        DnsError::Internal(format!("error sending response to {}: {}", client, e))
    })?;
    // Decode the relayed bytes a second time and remember them. The client
    // already has its answer, so a reply that fails to parse costs only the
    // cache entry.
    let mut reply_buf: FixedBuf<DATAGRAM_SIZE> = FixedBuf::new();
    write_bytes(&mut reply_buf, &reply)?;
    let parsed = DnsMessage::parse(&mut reply_buf)?;
    cache.insert(name, parsed);
    Ok(())
}

/// Receives datagrams until `permit` is revoked, posting one per-request job
/// into the pool for each. Runs inside the pool itself.
fn accept_loop(
    permit: &Permit,
    pool: &PoolHandle,
    sock: &Arc<UdpSocket>,
    cache: &Arc<DnsCache>,
    upstream: SocketAddr,
    upstream_timeout: Duration,
) {
    let local_addr = sock.local_addr().ok();
    while !permit.is_revoked() {
        let mut buf: FixedBuf<DATAGRAM_SIZE> = FixedBuf::new();
        let client = match sock.recv_from(buf.writable()) {
            Ok((len, _)) if len > buf.writable().len() => continue,
            Ok((len, addr)) => {
                buf.wrote(len);
                addr
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock || e.kind() == ErrorKind::TimedOut => {
                continue
            }
            Err(e) => {
                if permit.is_revoked() {
                    // Not an error: the socket went away because we are
                    // shutting down.
                    debug!("accept loop exiting: {}", DnsError::SocketClosed);
                    break;
                }
                warn!("error reading socket {:?}: {}", local_addr, e);
                continue;
            }
        };
        let worker_sock = Arc::clone(sock);
        let worker_cache = Arc::clone(cache);
        pool.post(move || {
            if let Err(e) = handle_request(
                &worker_sock,
                &worker_cache,
                upstream,
                upstream_timeout,
                buf,
                client,
            ) {
                warn!("request from {} dropped: {}", client, e);
            }
        });
    }
    // A janitor mid-wait would otherwise sleep out the rest of its minute
    // and hold up the pool join.
    cache.wake_janitor();
    debug!("accept loop on {:?} stopped", local_addr);
}

/// Ages the cache once a minute until `permit` is revoked. A shutdown wakes
/// the wait through [`DnsCache::wake_janitor`] so the exit is prompt. Runs
/// inside the pool.
fn janitor_loop(permit: &Permit, cache: &Arc<DnsCache>) {
    while !permit.is_revoked() {
        cache.wait_wake(Duration::from_secs(u64::from(JANITOR_PERIOD_SECONDS)));
        if permit.is_revoked() {
            break;
        }
        cache.age(JANITOR_PERIOD_SECONDS);
    }
    debug!("janitor stopped");
}

/// Serves DNS on `sock` until `permit` is revoked.
///
/// Owns a fixed-size worker pool; the accept task, the janitor task, and
/// each per-request task are posted into it, so thread count stays capped no
/// matter how fast datagrams arrive. Excess requests queue. Per-request
/// failures are logged and the request is dropped without a reply, matching
/// what DNS clients expect.
///
/// Shutdown: revoke `permit` (and optionally call
/// [`DnsCache::wake_janitor`] to skip the accept loop's receive-timeout
/// latency). Returns only after every queued and in-flight request has
/// finished and the janitor has exited.
///
/// # Errors
/// Returns [`DnsError::Internal`] when the socket cannot be configured;
/// nothing is spawned in that case.
pub fn serve_udp(
    permit: &Permit,
    sock: &Arc<UdpSocket>,
    cache: &Arc<DnsCache>,
    upstream: SocketAddr,
    upstream_timeout: Duration,
) -> Result<(), DnsError> {
    sock.set_read_timeout(Some(ACCEPT_TIMEOUT))
        .map_err(|e| DnsError::Internal(format!("error setting socket read timeout: {}", e)))?;
    let local_addr = sock
        .local_addr()
        .map_err(|e| DnsError::Internal(format!("error getting socket local address: {}", e)))?;
    info!("listening on {}, forwarding misses to {}", local_addr, upstream);
    let pool = WorkerPool::new(pool_size());
    {
        let permit = permit.new_sub();
        let handle = pool.handle();
        let sock = Arc::clone(sock);
        let cache = Arc::clone(cache);
        pool.post(move || {
            accept_loop(&permit, &handle, &sock, &cache, upstream, upstream_timeout);
        });
    }
    {
        let permit = permit.new_sub();
        let cache = Arc::clone(cache);
        pool.post(move || janitor_loop(&permit, &cache));
    }
    pool.join();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{Ipv4Addr, SocketAddrV4};

    fn test_sock() -> UdpSocket {
        UdpSocket::bind(SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::LOCALHOST, 0))).unwrap()
    }

    fn buf_of(bytes: &[u8]) -> FixedBuf<DATAGRAM_SIZE> {
        let mut buf: FixedBuf<DATAGRAM_SIZE> = FixedBuf::new();
        buf.write_bytes(bytes).unwrap();
        buf
    }

    #[test]
    fn test_empty_question_section_is_dropped() {
        let sock = test_sock();
        let client = sock.local_addr().unwrap();
        let cache = DnsCache::new();
        // Valid header, zero questions.
        let datagram = buf_of(&[0x12, 0x34, 0x01, 0x20, 0, 0, 0, 0, 0, 0, 0, 0]);
        let upstream = "127.0.0.1:1".parse().unwrap();
        assert_eq!(
            Err(DnsError::NoQuestion),
            handle_request(
                &sock,
                &cache,
                upstream,
                Duration::from_millis(10),
                datagram,
                client
            )
        );
    }

    #[test]
    fn test_malformed_datagram_is_dropped() {
        let sock = test_sock();
        let client = sock.local_addr().unwrap();
        let cache = DnsCache::new();
        let datagram = buf_of(&[0x12, 0x34, 0x01]);
        let upstream = "127.0.0.1:1".parse().unwrap();
        assert_eq!(
            Err(DnsError::MalformedMessage),
            handle_request(
                &sock,
                &cache,
                upstream,
                Duration::from_millis(10),
                datagram,
                client
            )
        );
    }

    #[test]
    fn test_pool_floor_leaves_room_for_requests() {
        assert!(pool_size() >= 4);
    }
}
