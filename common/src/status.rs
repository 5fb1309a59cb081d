use std::net::{IpAddr, Ipv4Addr, UdpSocket};

use serde::Serialize;
use tracing::debug;

/// Body of `GET /status`.
#[derive(Debug, Clone, Serialize)]
pub struct Status {
    pub status: &'static str,
    pub service: &'static str,
    /// Open MJPEG streams.
    #[serde(rename = "clients")]
    pub viewers: usize,
    /// Configured capture rate; `None` where the producer is remote.
    pub fps: Option<u32>,
    /// Address viewers on the LAN can reach this host at.
    pub ip: Ipv4Addr,
    pub port: u16,
    /// Frames captured or received since start.
    pub frames: u64,
    pub last_frame_ms: Option<i64>,
}

impl Status {
    pub fn running(service: &'static str, ip: Ipv4Addr, port: u16) -> Self {
        Self {
            status: "running",
            service,
            viewers: 0,
            fps: None,
            ip,
            port,
            frames: 0,
            last_frame_ms: None,
        }
    }
}

/// First non-loopback IPv4 address of this host, or `127.0.0.1`.
///
/// Asks the OS which local address it would route outbound traffic from.
/// Connecting a UDP socket sends nothing.
pub fn local_ipv4() -> Ipv4Addr {
    match routed_ipv4() {
        Ok(Some(ip)) => ip,
        Ok(None) => Ipv4Addr::LOCALHOST,
        Err(e) => {
            debug!(error = %e, "no routable interface, reporting loopback");
            Ipv4Addr::LOCALHOST
        }
    }
}

fn routed_ipv4() -> std::io::Result<Option<Ipv4Addr>> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))?;
    socket.connect((Ipv4Addr::new(8, 8, 8, 8), 80))?;
    Ok(match socket.local_addr()?.ip() {
        IpAddr::V4(ip) if !ip.is_loopback() && !ip.is_unspecified() => Some(ip),
        _ => None,
    })
}
