//! Network reachability checks.
//!
//! `ConnectivityProbe::is_online` is synchronous and must stay cheap: it is
//! consulted before every append so an offline device never issues a doomed
//! request.

use std::net::{SocketAddr, UdpSocket};

/// Address used only to ask the OS for a route. Connecting a UDP socket sends
/// no packets.
const ROUTE_CHECK_ADDR: &str = "1.1.1.1:53";

pub trait ConnectivityProbe: Send + Sync {
    fn is_online(&self) -> bool;
}

/// Reports online when the OS has a route to the public internet.
#[derive(Debug, Clone)]
pub struct RouteProbe {
    target: SocketAddr,
}

impl RouteProbe {
    pub fn new() -> Self {
        Self {
            // Literal address, parsing cannot fail
            target: ROUTE_CHECK_ADDR
                .parse()
                .unwrap_or_else(|_| SocketAddr::from(([1, 1, 1, 1], 53))),
        }
    }

    pub fn with_target(target: SocketAddr) -> Self {
        Self { target }
    }
}

impl Default for RouteProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectivityProbe for RouteProbe {
    fn is_online(&self) -> bool {
        let bind_addr: SocketAddr = if self.target.is_ipv4() {
            SocketAddr::from(([0, 0, 0, 0], 0))
        } else {
            SocketAddr::from(([0u16; 8], 0))
        };

        match UdpSocket::bind(bind_addr).and_then(|sock| sock.connect(self.target)) {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(error = %e, target = %self.target, "No route to network");
                false
            }
        }
    }
}

/// Probe with a fixed answer, used for offline mode.
#[derive(Debug, Clone, Copy)]
pub struct FixedProbe(pub bool);

impl ConnectivityProbe for FixedProbe {
    fn is_online(&self) -> bool {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_probe() {
        assert!(FixedProbe(true).is_online());
        assert!(!FixedProbe(false).is_online());
    }

    #[test]
    fn test_route_probe_loopback_is_reachable() {
        let probe = RouteProbe::with_target(SocketAddr::from(([127, 0, 0, 1], 9)));
        assert!(probe.is_online());
    }
}
