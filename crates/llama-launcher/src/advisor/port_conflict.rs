//! Port Conflict Resolver
//!
//! A port counts as taken when a TCP connect to `localhost:<port>` succeeds.
//! Any probe error reads as "free".

use crate::error::Result;
use crate::prompt::{prompt_number, Prompter};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;
use tracing::{debug, warn};

pub trait PortProbe {
    fn is_bound(&self, port: u16) -> bool;
}

#[derive(Debug, Clone, Copy)]
pub struct LocalPortProbe {
    timeout: Duration,
}

impl Default for LocalPortProbe {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(500),
        }
    }
}

impl LocalPortProbe {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    fn addresses(port: u16) -> Vec<SocketAddr> {
        match ("localhost", port).to_socket_addrs() {
            Ok(addrs) => addrs.collect(),
            Err(e) => {
                debug!("Could not resolve localhost: {}", e);
                vec![SocketAddr::from(([127, 0, 0, 1], port))]
            }
        }
    }
}

impl PortProbe for LocalPortProbe {
    fn is_bound(&self, port: u16) -> bool {
        Self::addresses(port).iter().any(|addr| {
            match TcpStream::connect_timeout(addr, self.timeout) {
                Ok(_) => {
                    debug!("Port {} answered on {}", port, addr);
                    true
                }
                Err(e) => {
                    debug!("Port {} probe on {}: {}", port, addr, e);
                    false
                }
            }
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortState {
    /// Seeded by the user's first answer.
    Proposed(u16),
    /// A replacement entered after a declined conflict.
    Retry(u16),
    Accepted(u16),
}

pub struct PortConflictResolver<'a, Q: PortProbe + ?Sized> {
    probe: &'a Q,
}

impl<'a, Q: PortProbe + ?Sized> PortConflictResolver<'a, Q> {
    pub fn new(probe: &'a Q) -> Self {
        Self { probe }
    }

    /// Runs the state machine from `Proposed(port)` until `Accepted`.
    pub fn resolve<P: Prompter + ?Sized>(&self, prompter: &mut P, port: u16) -> Result<u16> {
        let mut state = PortState::Proposed(port);
        loop {
            state = match state {
                PortState::Accepted(port) => return Ok(port),
                PortState::Proposed(port) | PortState::Retry(port) if !self.probe.is_bound(port) => {
                    PortState::Accepted(port)
                }
                PortState::Proposed(port) => {
                    prompter.warn(&format!("[WARNING] Port {} appears to be in use.", port));
                    self.override_or_retry(prompter, port)?
                }
                PortState::Retry(port) => {
                    prompter.warn(&format!("Port {} is also in use.", port));
                    self.override_or_retry(prompter, port)?
                }
            };
        }
    }

    fn override_or_retry<P: Prompter + ?Sized>(&self, prompter: &mut P, port: u16) -> Result<PortState> {
        if prompter.confirm("Use this port anyway?", false, None)? {
            warn!("Port {} accepted despite conflict", port);
            return Ok(PortState::Accepted(port));
        }
        let next = prompt_number(
            prompter,
            "Enter a different port",
            port.checked_add(1).unwrap_or(port),
            None,
            "port",
        )?;
        Ok(PortState::Retry(next))
    }
}
