//! Output and diagnostic text.
//!
//! Program output (`print`) and diagnostics (syntax errors, uncaught
//! exceptions) go through one [`DiagnosticSink`]. The enum keeps dispatch
//! static; the buffered variant exists for tests and for hosts that display
//! output themselves.

use std::sync::Arc;

use parking_lot::Mutex;

/// Collects output and diagnostics in memory.
#[derive(Default)]
pub struct BufferSink {
    output: Mutex<String>,
    diagnostics: Mutex<String>,
}

impl BufferSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything printed so far.
    pub fn output(&self) -> String {
        self.output.lock().clone()
    }

    /// Every diagnostic reported so far, one per line.
    pub fn diagnostics(&self) -> String {
        self.diagnostics.lock().clone()
    }

    pub fn clear(&self) {
        self.output.lock().clear();
        self.diagnostics.lock().clear();
    }
}

/// Destination for text produced by a runtime.
pub enum DiagnosticSink {
    /// Output to stdout, diagnostics to stderr.
    Stdio,
    /// Captured in memory.
    Buffer(BufferSink),
    /// Discarded.
    Silent,
}

impl DiagnosticSink {
    /// A line of program output.
    pub fn print_line(&self, text: &str) {
        match self {
            Self::Stdio => println!("{text}"),
            Self::Buffer(b) => {
                let mut out = b.output.lock();
                out.push_str(text);
                out.push('\n');
            }
            Self::Silent => {}
        }
    }

    /// A diagnostic line.
    pub fn report(&self, text: &str) {
        match self {
            Self::Stdio => eprintln!("{text}"),
            Self::Buffer(b) => {
                let mut out = b.diagnostics.lock();
                out.push_str(text);
                out.push('\n');
            }
            Self::Silent => {}
        }
    }

    /// Captured output; empty unless buffered.
    pub fn output(&self) -> String {
        match self {
            Self::Buffer(b) => b.output(),
            _ => String::new(),
        }
    }

    /// Captured diagnostics; empty unless buffered.
    pub fn diagnostics(&self) -> String {
        match self {
            Self::Buffer(b) => b.diagnostics(),
            _ => String::new(),
        }
    }
}

/// Sink shared between a runtime and its host.
pub type SharedSink = Arc<DiagnosticSink>;

pub fn stdio_sink() -> SharedSink {
    Arc::new(DiagnosticSink::Stdio)
}

pub fn buffer_sink() -> SharedSink {
    Arc::new(DiagnosticSink::Buffer(BufferSink::new()))
}

pub fn silent_sink() -> SharedSink {
    Arc::new(DiagnosticSink::Silent)
}
