//! IPC Server module
//!
//! Reads control messages from stdin and writes notifications to stdout,
//! each on its own background thread.

use std::io::{BufRead, Write};
use std::thread;

use anyhow::{Context, Result};
use crossbeam_channel::{Receiver, Sender};
use tracing::{debug, error, info, warn};

use super::protocol::{error_codes, IpcMessage};

/// Parses inbound lines and forwards them to the application
pub struct IpcServer {
    /// Channel to send messages to the main thread
    to_app: Sender<IpcMessage>,
    /// Channel for replies produced by the server itself (parse errors)
    replies: Sender<IpcMessage>,
}

impl IpcServer {
    /// Create a new IPC server
    pub fn new(to_app: Sender<IpcMessage>, replies: Sender<IpcMessage>) -> Self {
        Self { to_app, replies }
    }

    /// Read line-delimited JSON until EOF, `shutdown`, or the app goes away
    pub fn run<R: BufRead>(&self, reader: R) -> Result<()> {
        for line in reader.lines() {
            let line = line.context("Failed to read IPC input")?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            debug!("Received: {}", trimmed);

            match IpcMessage::from_json(trimmed) {
                Ok(msg) => {
                    let shutdown = matches!(msg, IpcMessage::Shutdown);
                    if self.to_app.send(msg).is_err() {
                        warn!("Application closed, stopping IPC reader");
                        break;
                    }
                    if shutdown {
                        info!("Received shutdown command");
                        break;
                    }
                }
                Err(e) => {
                    warn!("Failed to parse message: {}", e);
                    let _ = self.replies.send(IpcMessage::error(
                        error_codes::PARSE_ERROR,
                        format!("Parse error: {}", e),
                    ));
                }
            }
        }

        info!("IPC reader stopped");
        Ok(())
    }
}

/// Write every outgoing message as one JSON line until the channel closes
pub fn write_messages<W: Write>(from_app: Receiver<IpcMessage>, mut out: W) -> Result<()> {
    for msg in from_app {
        let json = msg.to_json().context("Failed to encode IPC message")?;
        writeln!(out, "{}", json).context("Failed to write IPC message")?;
        out.flush().context("Failed to flush IPC output")?;
    }
    Ok(())
}

/// IPC message receiver for the main application
pub struct IpcReceiver {
    rx: Receiver<IpcMessage>,
}

impl IpcReceiver {
    pub fn new(rx: Receiver<IpcMessage>) -> Self {
        Self { rx }
    }

    /// Try to receive a message without blocking
    pub fn try_recv(&self) -> Option<IpcMessage> {
        self.rx.try_recv().ok()
    }
}

/// IPC message sender for the main application
#[derive(Clone)]
pub struct IpcSender {
    tx: Sender<IpcMessage>,
}

impl IpcSender {
    pub fn new(tx: Sender<IpcMessage>) -> Self {
        Self { tx }
    }

    /// Queue a message for the controller
    pub fn send(&self, msg: IpcMessage) -> bool {
        self.tx.send(msg).is_ok()
    }
}

/// Start the stdin reader and stdout writer threads
pub fn start_ipc_server() -> (IpcReceiver, IpcSender) {
    let (to_app_tx, to_app_rx) = crossbeam_channel::unbounded();
    let (from_app_tx, from_app_rx) = crossbeam_channel::unbounded();

    let _ = from_app_tx.send(IpcMessage::Ready);

    thread::spawn(move || {
        if let Err(e) = write_messages(from_app_rx, std::io::stdout()) {
            error!("IPC writer error: {:#}", e);
        }
    });

    let replies = from_app_tx.clone();
    thread::spawn(move || {
        info!("Starting stdio IPC server");
        let server = IpcServer::new(to_app_tx, replies);
        if let Err(e) = server.run(std::io::stdin().lock()) {
            error!("IPC reader error: {:#}", e);
        }
    });

    (IpcReceiver::new(to_app_rx), IpcSender::new(from_app_tx))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ipc::protocol::ControlCommand;
    use std::io::Cursor;

    #[test]
    fn test_forwards_messages_until_shutdown() {
        let (to_app_tx, to_app_rx) = crossbeam_channel::unbounded();
        let (replies_tx, _replies_rx) = crossbeam_channel::unbounded();
        let server = IpcServer::new(to_app_tx, replies_tx);

        let input = concat!(
            "{\"type\":\"control\",\"payload\":\"play\"}\n",
            "\n",
            "{\"type\":\"shutdown\"}\n",
            "{\"type\":\"control\",\"payload\":\"pause\"}\n",
        );
        server.run(Cursor::new(input)).unwrap();

        let received: Vec<IpcMessage> = to_app_rx.try_iter().collect();
        assert_eq!(
            received,
            vec![
                IpcMessage::Control(ControlCommand::Play),
                IpcMessage::Shutdown
            ]
        );
    }

    #[test]
    fn test_parse_error_is_reported_back() {
        let (to_app_tx, to_app_rx) = crossbeam_channel::unbounded();
        let (replies_tx, replies_rx) = crossbeam_channel::unbounded();
        let server = IpcServer::new(to_app_tx, replies_tx);

        server.run(Cursor::new("not json\n")).unwrap();

        assert!(to_app_rx.try_recv().is_err());
        match replies_rx.try_recv().unwrap() {
            IpcMessage::Error { code, .. } => assert_eq!(code, error_codes::PARSE_ERROR),
            other => panic!("unexpected reply {:?}", other),
        }
    }

    #[test]
    fn test_write_messages_as_lines() {
        let (tx, rx) = crossbeam_channel::unbounded();
        tx.send(IpcMessage::Ready).unwrap();
        tx.send(IpcMessage::error(error_codes::OPEN_FAILED, "bad file"))
            .unwrap();
        drop(tx);

        let mut out = Vec::new();
        write_messages(rx, &mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(IpcMessage::from_json(lines[0]).unwrap(), IpcMessage::Ready);
        assert!(lines[1].contains("bad file"));
    }
}
