//! Converting a caught handler panic into a recordable error string.

use std::any::Any;
use std::backtrace::Backtrace;
use std::fmt;

/// Upper bound on the stack text stored on a job.
pub const MAX_STACK_BYTES: usize = 1024;

/// Payload and truncated stack of a handler panic.
///
/// The stack is captured where the panic is caught, not where it was raised,
/// so it is best-effort: it shows the worker frames around the handler call.
#[derive(Debug, Clone)]
pub struct PanicReport {
    message: String,
    stack: String,
}

impl PanicReport {
    pub fn capture(payload: Box<dyn Any + Send>) -> Self {
        Self::new(
            panic_message(payload.as_ref()),
            Backtrace::force_capture().to_string(),
        )
    }

    fn new(message: String, stack: String) -> Self {
        Self {
            message,
            stack: truncate_to_boundary(stack, MAX_STACK_BYTES),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn stack(&self) -> &str {
        &self.stack
    }
}

impl fmt::Display for PanicReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.message)?;
        writeln!(f, "{}", self.stack)?;
        write!(f, "[...]")
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

fn truncate_to_boundary(mut text: String, max: usize) -> String {
    if text.len() > max {
        let mut cut = max;
        while !text.is_char_boundary(cut) {
            cut -= 1;
        }
        text.truncate(cut);
    }
    text
}
