//! Host callbacks: where text goes, what time it is, and whether to stop.
//!
//! These are the only channels from the evaluator to its embedding besides
//! native functions. All three are cheap to clone and may be shared with
//! other threads: an interrupt is typically raised from a signal handler or
//! watchdog while the evaluator runs.

mod clock;
mod interrupt;
mod sink;

pub use clock::{HostClock, ManualClock};
pub use interrupt::InterruptHandle;
pub use sink::{buffer_sink, silent_sink, stdio_sink, BufferSink, DiagnosticSink, SharedSink};
