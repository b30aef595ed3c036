//! Remote command execution.
//!
//! Deployment code only sees these traits; authentication, host keys and the
//! wire protocol belong to the implementation.

mod ssh;

#[cfg(test)]
pub(crate) mod mock;

pub use ssh::SshConnector;

use std::time::Duration;

use crate::error::TransportError;

/// Login credentials for a device's management plane
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: &str, password: &str) -> Self {
        Self {
            username: username.to_string(),
            password: password.to_string(),
        }
    }
}

/// Opens sessions to devices
#[async_trait::async_trait]
pub trait Connector: Send + Sync {
    /// `timeout` bounds the connection itself and every read/write on it.
    async fn connect(
        &self,
        address: &str,
        credentials: &Credentials,
        timeout: Duration,
    ) -> Result<Box<dyn RemoteSession>, TransportError>;
}

/// One live connection to a device
#[async_trait::async_trait]
pub trait RemoteSession: Send {
    /// Run a single command and return its combined stdout and stderr.
    /// A non-zero exit status is an error.
    async fn run(&mut self, command: &str) -> Result<String, TransportError>;

    /// Feed lines to an interactive shell, pausing `pacing` after each one,
    /// then wait for the shell to exit.
    async fn stream(&mut self, lines: &[String], pacing: Duration) -> Result<String, TransportError>;

    /// Best-effort disconnect
    async fn close(&mut self);
}
