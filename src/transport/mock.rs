//! Scriptable in-memory device used by the strategy tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::{Connector, Credentials, RemoteSession};
use crate::error::TransportError;

#[derive(Debug, Default)]
pub struct MockDevice {
    /// Returned for any `show ...` command without a matching rule
    pub running_config: String,
    /// First rule whose pattern is contained in the command decides the response
    pub rules: Vec<(String, Result<String, String>)>,
    /// Per-connect outcome, popped front; empty means succeed
    pub connect_results: VecDeque<Result<(), String>>,
    /// Per-stream outcome, popped front; empty means succeed
    pub stream_results: VecDeque<Result<(), String>>,
    /// Replace `running_config` with what a successful stream pushed
    pub replace_on_stream: bool,

    pub commands: Vec<String>,
    pub streams: Vec<Vec<String>>,
    pub pacing: Vec<Duration>,
    pub connects: usize,
    pub open_sessions: usize,
    pub max_open_sessions: usize,
}

impl MockDevice {
    pub fn respond(mut self, pattern: &str, response: Result<&str, &str>) -> Self {
        self.rules.push((
            pattern.to_string(),
            response.map(str::to_string).map_err(str::to_string),
        ));
        self
    }
}

#[derive(Clone, Default)]
pub struct MockConnector {
    pub device: Arc<Mutex<MockDevice>>,
}

impl MockConnector {
    pub fn new(device: MockDevice) -> Self {
        Self {
            device: Arc::new(Mutex::new(device)),
        }
    }

    pub fn state(&self) -> std::sync::MutexGuard<'_, MockDevice> {
        self.device.lock().unwrap()
    }
}

#[async_trait::async_trait]
impl Connector for MockConnector {
    async fn connect(
        &self,
        address: &str,
        _credentials: &Credentials,
        _timeout: Duration,
    ) -> Result<Box<dyn RemoteSession>, TransportError> {
        let mut device = self.device.lock().unwrap();
        device.connects += 1;
        if let Some(Err(message)) = device.connect_results.pop_front() {
            return Err(TransportError::Connect {
                address: address.to_string(),
                message,
            });
        }
        device.open_sessions += 1;
        device.max_open_sessions = device.max_open_sessions.max(device.open_sessions);

        Ok(Box::new(MockSession {
            device: self.device.clone(),
            open: true,
        }))
    }
}

struct MockSession {
    device: Arc<Mutex<MockDevice>>,
    open: bool,
}

#[async_trait::async_trait]
impl RemoteSession for MockSession {
    async fn run(&mut self, command: &str) -> Result<String, TransportError> {
        let mut device = self.device.lock().unwrap();
        device.commands.push(command.to_string());

        let rule = device
            .rules
            .iter()
            .find(|(pattern, _)| command.contains(pattern.as_str()))
            .map(|(_, response)| response.clone());

        match rule {
            Some(Ok(output)) => Ok(output),
            Some(Err(output)) => Err(TransportError::ExitStatus { status: 1, output }),
            None if command.starts_with("show") => Ok(device.running_config.clone()),
            None => Ok(String::new()),
        }
    }

    async fn stream(&mut self, lines: &[String], pacing: Duration) -> Result<String, TransportError> {
        let mut device = self.device.lock().unwrap();
        device.streams.push(lines.to_vec());
        device.pacing.push(pacing);

        if let Some(Err(message)) = device.stream_results.pop_front() {
            return Err(TransportError::Session(message));
        }

        if device.replace_on_stream {
            // Everything between "configure replace terminal" and "end" becomes the running config
            let body: Vec<&str> = lines
                .iter()
                .skip(1)
                .take_while(|l| l.as_str() != "end")
                .map(String::as_str)
                .collect();
            device.running_config = body.join("\n");
        }
        Ok(String::new())
    }

    async fn close(&mut self) {
        if self.open {
            self.open = false;
            self.device.lock().unwrap().open_sessions -= 1;
        }
    }
}

impl Drop for MockSession {
    fn drop(&mut self) {
        if self.open {
            if let Ok(mut device) = self.device.lock() {
                device.open_sessions -= 1;
            }
        }
    }
}
