//! Background reader for the newline-delimited JSON input stream.
//!
//! The reader owns the only blocking boundary in the program: it reads lines
//! from a file or stdin on its own thread and forwards parsed events over a
//! bounded channel. Everything downstream runs on the caller's thread, one
//! event at a time, in input order.

use crate::source::types::InputEvent;
use crossbeam_channel::{bounded, Receiver, Sender};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use thiserror::Error;

/// Channel capacity between the reader thread and the frame loop.
pub const CHANNEL_CAPACITY: usize = 1024;

/// Where input events come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    Stdin,
    File(PathBuf),
}

impl InputSource {
    /// `-` selects stdin, anything else is a file path.
    pub fn from_arg(arg: &str) -> Self {
        if arg == "-" {
            InputSource::Stdin
        } else {
            InputSource::File(PathBuf::from(arg))
        }
    }
}

impl std::fmt::Display for InputSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InputSource::Stdin => write!(f, "<stdin>"),
            InputSource::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Errors that can occur while reading input.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Reader is already running")]
    AlreadyRunning,
    #[error("Could not open {path}: {source}")]
    Open { path: PathBuf, source: io::Error },
    #[error("Read error: {0}")]
    Read(#[from] io::Error),
    #[error("Malformed input on line {line}: {message}")]
    Malformed { line: usize, message: String },
}

/// Message delivered to the frame loop.
pub type SourceMessage = Result<InputEvent, SourceError>;

/// Reads input events on a background thread.
pub struct FrameReader {
    source: InputSource,
    sender: Option<Sender<SourceMessage>>,
    receiver: Receiver<SourceMessage>,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl FrameReader {
    /// Create a new reader. Nothing is read until [`FrameReader::start`].
    pub fn new(source: InputSource) -> Self {
        let (sender, receiver) = bounded(CHANNEL_CAPACITY);
        Self {
            source,
            sender: Some(sender),
            receiver,
            running: Arc::new(AtomicBool::new(false)),
            handle: None,
        }
    }

    /// Open the input and start the reader thread.
    ///
    /// The channel disconnects once the input is exhausted or the reader is
    /// stopped.
    pub fn start(&mut self) -> Result<(), SourceError> {
        if self.sender.is_none() || self.running.load(Ordering::SeqCst) {
            return Err(SourceError::AlreadyRunning);
        }

        let input: Box<dyn BufRead + Send> = match &self.source {
            InputSource::Stdin => Box::new(BufReader::new(io::stdin())),
            InputSource::File(path) => {
                let file = File::open(path).map_err(|source| SourceError::Open {
                    path: path.clone(),
                    source,
                })?;
                Box::new(BufReader::new(file))
            }
        };

        let Some(sender) = self.sender.take() else {
            return Err(SourceError::AlreadyRunning);
        };
        self.running.store(true, Ordering::SeqCst);
        let running = self.running.clone();
        tracing::debug!(source = %self.source, "starting frame reader");

        self.handle = Some(std::thread::spawn(move || {
            pump_lines(input, &sender, &running);
            running.store(false, Ordering::SeqCst);
        }));

        Ok(())
    }

    /// Ask the reader thread to stop after the line it is currently reading.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Check if the reader thread is still producing events.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Get the receiver for input events.
    pub fn receiver(&self) -> &Receiver<SourceMessage> {
        &self.receiver
    }
}

impl Drop for FrameReader {
    fn drop(&mut self) {
        self.stop();
        // A thread blocked on stdin cannot be interrupted; detach it.
        let _ = self.handle.take();
    }
}

/// Forward every line of `input` as a parsed event until EOF, a closed
/// channel, or a stop request.
///
/// Lines are read as raw bytes so that a line which is not valid UTF-8 is
/// reported as malformed instead of ending the stream.
fn pump_lines(
    mut input: Box<dyn BufRead + Send>,
    sender: &Sender<SourceMessage>,
    running: &AtomicBool,
) {
    let mut buf = Vec::new();
    let mut line = 0;

    while running.load(Ordering::SeqCst) {
        buf.clear();
        match input.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => {
                line += 1;
                let Some(message) = decode_line(line, &buf) else {
                    continue;
                };
                if sender.send(message).is_err() {
                    break;
                }
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                let _ = sender.send(Err(SourceError::Read(e)));
                break;
            }
        }
    }
}

/// Decode one raw input line. Blank lines yield `None`.
fn decode_line(line: usize, raw: &[u8]) -> Option<SourceMessage> {
    let text = match std::str::from_utf8(raw) {
        Ok(text) => text,
        Err(e) => {
            return Some(Err(SourceError::Malformed {
                line,
                message: format!("invalid UTF-8: {e}"),
            }))
        }
    };

    InputEvent::parse_line(text).map(|parsed| {
        parsed.map_err(|e| SourceError::Malformed {
            line,
            message: e.to_string(),
        })
    })
}

/// Parse a whole input buffer synchronously.
///
/// Used by tests and by callers that already hold the input in memory.
/// Accepts raw bytes so undecodable lines are reported like any other
/// malformed line.
pub fn parse_events(input: impl AsRef<[u8]>) -> Vec<SourceMessage> {
    input
        .as_ref()
        .split(|&b| b == b'\n')
        .enumerate()
        .filter_map(|(index, raw)| decode_line(index + 1, raw))
        .collect()
}
