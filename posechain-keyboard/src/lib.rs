//! [`posechain::OperatorGate`] implementation reading single keys from the
//! terminal.
#![cfg(unix)]
#![warn(missing_docs, rust_2018_idioms)]

use std::io::{self, Read, Write};

use posechain::{Error, GateSignal, OperatorGate};
use termios::{tcsetattr, Termios};
use tracing::debug;

/// Key that ends the session.
pub const ESC: u8 = 0x1b;

const STDIN: i32 = 0;

/// Maps a key press to a gate signal: ESC quits, anything else advances.
pub fn key_to_signal(key: u8) -> GateSignal {
    if key == ESC {
        GateSignal::Quit
    } else {
        GateSignal::Advance
    }
}

/// Prompts on stdout and blocks on a single unbuffered key press.
#[derive(Debug, Clone)]
pub struct KeyboardGate {
    prompt: String,
}

impl KeyboardGate {
    /// Creates a new `KeyboardGate`.
    pub fn new() -> Self {
        Self {
            prompt: "Press any key to continue! (or press ESC to quit!)".to_owned(),
        }
    }

    /// Replaces the line printed before each key read.
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }
}

impl Default for KeyboardGate {
    fn default() -> Self {
        Self::new()
    }
}

impl OperatorGate for KeyboardGate {
    fn wait_for_signal(&mut self) -> Result<GateSignal, Error> {
        let mut stdout = io::stdout().lock();
        writeln!(stdout, "{}", self.prompt).map_err(gate_error)?;
        stdout.flush().map_err(gate_error)?;
        drop(stdout);

        let key = read_key().map_err(gate_error)?;
        debug!("key: {key:#04x}");
        Ok(key_to_signal(key))
    }
}

// Reads one byte with echo and line buffering off, restoring the terminal
// before returning.
fn read_key() -> io::Result<u8> {
    let saved = Termios::from_fd(STDIN)?;
    let mut raw = saved;
    raw.c_lflag &= !(termios::ICANON | termios::ECHO);
    tcsetattr(STDIN, termios::TCSANOW, &raw)?;

    let mut buffer = [0; 1];
    let result = io::stdin().lock().read_exact(&mut buffer);
    tcsetattr(STDIN, termios::TCSADRAIN, &saved)?;
    result.map(|()| buffer[0])
}

fn gate_error(e: io::Error) -> Error {
    Error::Gate {
        message: e.to_string(),
    }
}
