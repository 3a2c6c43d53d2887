//! Everything related to the events that stream workers hand to the
//! coordinator.

use std::fmt;
use std::io;

/// How a stream's sequence of lines came to an end.
#[derive(Debug)]
pub enum EndReason {
    /// Ordinary end-of-stream.
    Eof,
    /// Any other read failure.
    Fault(io::Error),
}

impl EndReason {
    pub fn is_eof(&self) -> bool {
        matches!(self, EndReason::Eof)
    }
}

impl fmt::Display for EndReason {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        match self {
            EndReason::Eof => write!(f, "EOF"),
            EndReason::Fault(err) => write!(f, "{}", err),
        }
    }
}

#[derive(Debug)]
pub enum EventKind {
    /// A newline-terminated line, with trailing whitespace removed.
    Line(String),
    /// The stream terminated; no further events follow for its index.
    Ended(EndReason),
}

/// Unit of work passed from a stream worker to the coordinator.
#[derive(Debug)]
pub struct Event {
    /// Identity of the stream that produced the event.
    index: usize,
    kind: EventKind,
}

impl Event {
    pub fn line(index: usize, text: impl Into<String>) -> Self {
        Event {
            index,
            kind: EventKind::Line(text.into()),
        }
    }

    pub fn ended(index: usize, reason: EndReason) -> Self {
        Event {
            index,
            kind: EventKind::Ended(reason),
        }
    }

    /// Returns the index of the originating stream.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn kind(&self) -> &EventKind {
        &self.kind
    }

    /// Returns `true` if this is the final event of its stream.
    pub fn is_end(&self) -> bool {
        matches!(self.kind, EventKind::Ended(_))
    }

    /// Returns the internal components that make up an `Event`.
    pub fn into_inner(self) -> (usize, EventKind) {
        let Event { index, kind } = self;

        (index, kind)
    }
}
