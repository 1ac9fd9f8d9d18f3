//! Single-instance guard
//!
//! A bound loopback socket acts as a process-wide mutex: the OS releases the
//! port when the holder exits, even after a crash. Acquisition is fail-fast.

use std::io::ErrorKind;
use std::net::{Ipv4Addr, SocketAddr, TcpListener};
use tracing::debug;

use crate::error::Result;

/// Held for the lifetime of the run; dropping it releases the lock
#[derive(Debug)]
pub struct InstanceGuard {
    listener: TcpListener,
}

impl InstanceGuard {
    /// Try to become the only running instance
    ///
    /// Returns `Ok(None)` when another instance already holds the port.
    pub fn acquire(port: u16) -> Result<Option<Self>> {
        let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, port));

        match TcpListener::bind(addr) {
            Ok(listener) => Ok(Some(Self { listener })),
            Err(e) if e.kind() == ErrorKind::AddrInUse => {
                debug!("Another instance is already running");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Address the guard is bound to
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.listener.local_addr().ok()
    }
}
