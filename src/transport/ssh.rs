use std::io::{Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::{Connector, Credentials, RemoteSession};
use crate::error::TransportError;

/// Keyboard-interactive prompt handler that always responds with the password
struct PasswordPrompt {
    password: String,
}

impl ssh2::KeyboardInteractivePrompt for PasswordPrompt {
    fn prompt<'a>(
        &mut self,
        _username: &str,
        _instructions: &str,
        prompts: &[ssh2::Prompt<'a>],
    ) -> Vec<String> {
        prompts.iter().map(|_| self.password.clone()).collect()
    }
}

/// Connector backed by libssh2. Host keys are not verified.
#[derive(Debug, Clone)]
pub struct SshConnector {
    port: u16,
}

impl SshConnector {
    pub fn new(port: u16) -> Self {
        Self { port }
    }
}

impl Default for SshConnector {
    fn default() -> Self {
        Self::new(22)
    }
}

#[async_trait::async_trait]
impl Connector for SshConnector {
    async fn connect(
        &self,
        address: &str,
        credentials: &Credentials,
        timeout: Duration,
    ) -> Result<Box<dyn RemoteSession>, TransportError> {
        let host = address.to_string();
        let port = self.port;
        let credentials = credentials.clone();

        let session = tokio::task::spawn_blocking(move || {
            ssh_connect(&host, port, &credentials.username, &credentials.password, timeout)
        })
        .await
        .map_err(|e| TransportError::Session(format!("Task join error: {}", e)))??;

        Ok(Box::new(SshSession {
            address: address.to_string(),
            session: Arc::new(Mutex::new(session)),
        }))
    }
}

/// Create an SSH session and authenticate with password + keyboard-interactive.
/// This is blocking, so call from a spawn_blocking context.
fn ssh_connect(
    host: &str,
    port: u16,
    user: &str,
    pass: &str,
    timeout: Duration,
) -> Result<ssh2::Session, TransportError> {
    let connect_err = |message: String| TransportError::Connect {
        address: host.to_string(),
        message,
    };

    let addr = (host, port)
        .to_socket_addrs()
        .map_err(|e| connect_err(format!("Invalid address {}:{}: {}", host, port, e)))?
        .next()
        .ok_or_else(|| connect_err(format!("No address resolved for {}", host)))?;

    let tcp = TcpStream::connect_timeout(&addr, timeout)
        .map_err(|e| connect_err(format!("TCP connection failed: {}", e)))?;

    tcp.set_read_timeout(Some(timeout)).ok();
    tcp.set_write_timeout(Some(timeout)).ok();

    let mut session = ssh2::Session::new()
        .map_err(|e| connect_err(format!("Failed to create SSH session: {}", e)))?;
    session.set_tcp_stream(tcp);
    session.set_timeout(timeout.as_millis().min(u32::MAX as u128) as u32);
    session
        .handshake()
        .map_err(|e| connect_err(format!("SSH handshake failed: {}", e)))?;

    // Try password auth first
    match session.userauth_password(user, pass) {
        Ok(_) if session.authenticated() => return Ok(session),
        _ => {}
    }

    // Keyboard-interactive is what many network OSes offer instead
    let mut prompter = PasswordPrompt {
        password: pass.to_string(),
    };
    let _ = session.userauth_keyboard_interactive(user, &mut prompter);

    if session.authenticated() {
        Ok(session)
    } else {
        Err(TransportError::Auth {
            address: host.to_string(),
            user: user.to_string(),
        })
    }
}

struct SshSession {
    address: String,
    session: Arc<Mutex<ssh2::Session>>,
}

fn session_err(context: &str, e: impl std::fmt::Display) -> TransportError {
    TransportError::Session(format!("{}: {}", context, e))
}

/// Device output as text; invalid UTF-8 sequences become U+FFFD
fn decode_output(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).into_owned()
}

/// Read a channel to completion and turn a non-zero exit into an error
fn finish_channel(mut channel: ssh2::Channel) -> Result<String, TransportError> {
    let mut raw = Vec::new();
    channel
        .read_to_end(&mut raw)
        .map_err(|e| session_err("Failed to read output", e))?;
    let output = decode_output(&raw);

    channel
        .wait_close()
        .map_err(|e| session_err("Failed to close channel", e))?;

    let status = channel
        .exit_status()
        .map_err(|e| session_err("Failed to read exit status", e))?;

    if status != 0 {
        return Err(TransportError::ExitStatus { status, output });
    }
    Ok(output)
}

fn exec_command(session: &ssh2::Session, command: &str) -> Result<String, TransportError> {
    let mut channel = session
        .channel_session()
        .map_err(|e| session_err("Failed to open channel", e))?;

    channel
        .handle_extended_data(ssh2::ExtendedData::Merge)
        .map_err(|e| session_err("Failed to merge stderr", e))?;

    channel
        .exec(command)
        .map_err(|e| session_err("Failed to execute command", e))?;

    finish_channel(channel)
}

fn feed_shell(session: &ssh2::Session, lines: &[String], pacing: Duration) -> Result<String, TransportError> {
    let mut channel = session
        .channel_session()
        .map_err(|e| session_err("Failed to open channel", e))?;

    channel
        .handle_extended_data(ssh2::ExtendedData::Merge)
        .map_err(|e| session_err("Failed to merge stderr", e))?;

    channel
        .request_pty("xterm", None, None)
        .map_err(|e| session_err("Failed to request pty", e))?;

    channel
        .shell()
        .map_err(|e| session_err("Failed to start shell", e))?;

    for line in lines {
        channel
            .write_all(format!("{}\n", line).as_bytes())
            .and_then(|_| channel.flush())
            .map_err(|e| session_err("Failed to write command", e))?;

        if !pacing.is_zero() {
            std::thread::sleep(pacing);
        }
    }

    channel
        .send_eof()
        .map_err(|e| session_err("Failed to send EOF", e))?;

    finish_channel(channel)
}

#[async_trait::async_trait]
impl RemoteSession for SshSession {
    async fn run(&mut self, command: &str) -> Result<String, TransportError> {
        let session = self.session.clone();
        let command = command.to_string();

        tokio::task::spawn_blocking(move || {
            let session = session
                .lock()
                .map_err(|_| TransportError::Session("SSH session lock poisoned".to_string()))?;
            exec_command(&session, &command)
        })
        .await
        .map_err(|e| TransportError::Session(format!("Task join error: {}", e)))?
    }

    async fn stream(&mut self, lines: &[String], pacing: Duration) -> Result<String, TransportError> {
        let session = self.session.clone();
        let lines = lines.to_vec();

        tokio::task::spawn_blocking(move || {
            let session = session
                .lock()
                .map_err(|_| TransportError::Session("SSH session lock poisoned".to_string()))?;
            feed_shell(&session, &lines, pacing)
        })
        .await
        .map_err(|e| TransportError::Session(format!("Task join error: {}", e)))?
    }

    async fn close(&mut self) {
        let session = self.session.clone();
        let address = self.address.clone();

        let result = tokio::task::spawn_blocking(move || match session.lock() {
            Ok(session) => session
                .disconnect(None, "deployment finished", None)
                .map_err(|e| e.to_string()),
            Err(_) => Err("SSH session lock poisoned".to_string()),
        })
        .await;

        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::debug!("Disconnect from {} failed: {}", address, e),
            Err(e) => tracing::debug!("Disconnect task for {} failed: {}", address, e),
        }
    }
}
