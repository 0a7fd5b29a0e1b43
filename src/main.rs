use clap::Parser;
use dns_proxy::{serve_udp, DnsCache};
use log::{error, info};
use permit::Permit;
use std::io::Read;
use std::net::{SocketAddr, UdpSocket};
use std::sync::Arc;
use std::time::Duration;

/// Caching DNS forwarder: answers from its in-memory cache and forwards
/// misses to the configured upstream resolver.
#[derive(Debug, Parser)]
#[command(name = "dns-proxy", version, about)]
struct Args {
    /// Address and port to listen on.
    #[arg(long, default_value = "0.0.0.0:53")]
    listen: SocketAddr,
    /// Upstream resolver to forward cache misses to.
    #[arg(long, default_value = "5.3.3.3:53")]
    upstream: SocketAddr,
    /// Seconds to wait for an upstream reply.
    #[arg(long, default_value_t = 2)]
    upstream_timeout: u64,
}

fn main() {
    env_logger::init();
    let args = Args::parse();
    let sock = match UdpSocket::bind(args.listen) {
        Ok(sock) => Arc::new(sock),
        Err(e) => {
            error!("error binding {}: {}", args.listen, e);
            std::process::exit(1);
        }
    };
    let cache = Arc::new(DnsCache::new());
    let permit = Permit::new();

    // serve_udp runs its own worker pool (accept task, janitor task, and
    // per-request tasks) and blocks until shutdown drains it.
    let serve_permit = permit.new_sub();
    let serve_sock = Arc::clone(&sock);
    let serve_cache = Arc::clone(&cache);
    let upstream = args.upstream;
    let upstream_timeout = Duration::from_secs(args.upstream_timeout);
    let serve_handle = std::thread::spawn(move || {
        if let Err(e) = serve_udp(
            &serve_permit,
            &serve_sock,
            &serve_cache,
            upstream,
            upstream_timeout,
        ) {
            error!("server stopped: {}", e);
            std::process::exit(1);
        }
    });

    // Shutdown trigger: a supervisor (or a terminal EOF) closes stdin.
    // Installing process signal handlers is left to whatever wraps this
    // binary.
    while std::io::stdin()
        .read(&mut [0_u8])
        .map(|n| n > 0)
        .unwrap_or(false)
    {}
    info!("shutting down");
    permit.revoke();
    cache.wake_janitor();
    let _ = serve_handle.join();
}
