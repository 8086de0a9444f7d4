//! Transport seam between the bridge and the real data channel
//!
//! The core only ever needs one capability from the channel: send a command.
//! Inbound traffic flows the other way through [`crate::TeleopBridge::handle_inbound`].
//! Adapters here do no buffering, retry or reordering; whatever the underlying
//! channel guarantees is all the bridge gets.

use crate::command::Command;
use crate::{BridgeError, Result};
use std::io::Write;
use std::sync::Mutex;
use tracing::debug;

/// Outbound half of the robot channel
///
/// Implementations must be cheap to call from the UI thread: `send` hands the
/// command to the channel and returns, it never waits for the robot.
pub trait Transport: Send + Sync {
    fn send(&self, command: &Command) -> Result<()>;
}

/// Transport backed by a plain closure
pub struct FnTransport<F> {
    send_fn: F,
}

impl<F> FnTransport<F>
where
    F: Fn(&Command) -> Result<()> + Send + Sync,
{
    pub fn new(send_fn: F) -> Self {
        Self { send_fn }
    }
}

impl<F> Transport for FnTransport<F>
where
    F: Fn(&Command) -> Result<()> + Send + Sync,
{
    fn send(&self, command: &Command) -> Result<()> {
        (self.send_fn)(command)
    }
}

/// In-memory transport that keeps every sent command in order
#[derive(Debug, Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<Command>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything sent so far
    pub fn sent(&self) -> Vec<Command> {
        self.sent
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Drain the sent log
    pub fn take(&self) -> Vec<Command> {
        std::mem::take(&mut *self.sent.lock().unwrap_or_else(|poisoned| poisoned.into_inner()))
    }

    pub fn len(&self) -> usize {
        self.sent.lock().map(|sent| sent.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Transport for RecordingTransport {
    fn send(&self, command: &Command) -> Result<()> {
        self.sent
            .lock()
            .map_err(|_| BridgeError::Transport("recording log poisoned".to_string()))?
            .push(command.clone());
        Ok(())
    }
}

/// Writes each command as one JSON document per line on stdout
///
/// Useful when the real channel is another process reading our output.
#[derive(Debug, Clone, Default)]
pub struct JsonLinesTransport {
    pub pretty_print: bool,
}

impl JsonLinesTransport {
    pub fn new() -> Self {
        Self { pretty_print: false }
    }

    pub fn pretty() -> Self {
        Self { pretty_print: true }
    }

    /// JSON text written for `command`, without the trailing newline
    pub fn encode(&self, command: &Command) -> Result<String> {
        let line = if self.pretty_print {
            serde_json::to_string_pretty(command)?
        } else {
            serde_json::to_string(command)?
        };
        Ok(line)
    }
}

impl Transport for JsonLinesTransport {
    fn send(&self, command: &Command) -> Result<()> {
        let line = self.encode(command)?;
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "{}", line)?;
        stdout.flush()?;
        debug!("Sent {} command", command.kind());
        Ok(())
    }
}

#[cfg(feature = "zenoh-integration")]
pub use self::zenoh_transport::ZenohTransport;

#[cfg(feature = "zenoh-integration")]
mod zenoh_transport {
    use super::Transport;
    use crate::command::Command;
    use crate::{BridgeError, Result};
    use tracing::{debug, info, warn};
    use zenoh::pubsub::{Publisher, Subscriber};
    use zenoh::{Session, Wait};

    /// Zenoh pub/sub transport
    ///
    /// Commands are published as JSON on `{prefix}/command`. Samples arriving on
    /// `{prefix}/telemetry` are handed to the inbound callback as UTF-8 text.
    pub struct ZenohTransport {
        publisher: Publisher<'static>,
        _subscriber: Subscriber<()>,
        _session: Session,
    }

    impl ZenohTransport {
        pub fn open<F>(key_prefix: &str, on_inbound: F) -> Result<Self>
        where
            F: Fn(String) + Send + Sync + 'static,
        {
            info!("Opening Zenoh session for teleop bridge");
            let session = zenoh::open(zenoh::Config::default())
                .wait()
                .map_err(|e| BridgeError::Transport(format!("Failed to open Zenoh session: {}", e)))?;

            let command_topic = format!("{}/command", key_prefix);
            let telemetry_topic = format!("{}/telemetry", key_prefix);

            let publisher = session
                .declare_publisher(command_topic.clone())
                .wait()
                .map_err(|e| BridgeError::Transport(format!("Failed to create command publisher: {}", e)))?;

            let subscriber = session
                .declare_subscriber(telemetry_topic.clone())
                .callback(move |sample| {
                    match String::from_utf8(sample.payload().to_bytes().into_owned()) {
                        Ok(text) => on_inbound(text),
                        Err(e) => warn!("Dropping non UTF-8 telemetry sample: {}", e),
                    }
                })
                .wait()
                .map_err(|e| BridgeError::Transport(format!("Failed to subscribe to telemetry: {}", e)))?;

            debug!("  - Command publisher: {}", command_topic);
            debug!("  - Telemetry subscriber: {}", telemetry_topic);

            Ok(Self {
                publisher,
                _subscriber: subscriber,
                _session: session,
            })
        }
    }

    impl Transport for ZenohTransport {
        fn send(&self, command: &Command) -> Result<()> {
            let payload = serde_json::to_vec(command)?;
            self.publisher
                .put(payload)
                .wait()
                .map_err(|e| BridgeError::Transport(format!("Failed to publish {}: {}", command.kind(), e)))?;
            debug!("Published {} command", command.kind());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_recording_transport_keeps_order() {
        let transport = RecordingTransport::new();
        transport.send(&Command::drive(0.1, 0.0)).unwrap();
        transport.send(&Command::Stop).unwrap();

        assert_eq!(transport.len(), 2);
        assert_eq!(transport.sent(), vec![Command::drive(0.1, 0.0), Command::Stop]);
        assert_eq!(transport.take().len(), 2);
        assert!(transport.is_empty());
    }

    #[test]
    fn test_fn_transport_forwards_and_propagates_errors() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let transport = FnTransport::new(move |command: &Command| {
            sink.lock().unwrap().push(command.kind());
            Ok(())
        });
        transport.send(&Command::LookAtGripper).unwrap();
        assert_eq!(*seen.lock().unwrap(), vec!["lookAtGripper"]);

        let failing = FnTransport::new(|_: &Command| Err(BridgeError::Transport("channel closed".into())));
        assert!(matches!(failing.send(&Command::Stop), Err(BridgeError::Transport(_))));
    }

    #[test]
    fn test_json_lines_encoding() {
        let plain = JsonLinesTransport::new();
        let line = plain.encode(&Command::drive(0.5, -0.25)).unwrap();
        assert!(!line.contains('\n'));
        assert_eq!(
            serde_json::from_str::<serde_json::Value>(&line).unwrap(),
            serde_json::json!({"type": "driveBase", "modifier": {"linVel": 0.5, "angVel": -0.25}})
        );

        let pretty = JsonLinesTransport::pretty().encode(&Command::Stop).unwrap();
        assert_eq!(pretty, "{\n  \"type\": \"stop\"\n}");
        assert!(JsonLinesTransport::pretty().send(&Command::Stop).is_ok());
    }
}
