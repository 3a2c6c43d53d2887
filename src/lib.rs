//! A library for multiplexing the latest line of many streams into one
//! continuously re-rendered template line.
//!
//! Each input stream owns the `%N` markers of a format string, `N` being the
//! stream's index. Whenever any stream produces a new line, the whole
//! template is rendered again, so a downstream consumer always sees the
//! latest composite state.
//!
//! ## Example
//!
//! ```no_run
//! use muxline::{open_inputs, KillSet, Mux, Template};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let template = Template::compile("cpu: %0 | mem: %1")?;
//!
//!     // Indices follow argument position; inputs that fail to open are
//!     // reported and skipped.
//!     let inputs = open_inputs(["/tmp/cpu.fifo", "/tmp/mem.fifo"]).await;
//!
//!     // Stop as soon as the cpu feed closes.
//!     let kill: KillSet = "0".parse()?;
//!
//!     let outcome = Mux::new(template, kill)
//!         .run(inputs, tokio::io::stdout())
//!         .await?;
//!     eprintln!("done: {:?}", outcome);
//!     Ok(())
//! }
//! ```
//!
//! ## Caveats
//!
//! A stream that reaches end-of-stream is finished for good; its slot shows
//! `(EOF)` from then on (or the text of the read error). Plain files are thus
//! read to their current end and then closed, which makes FIFOs the natural
//! input for long-running use.

mod config;
mod error;
mod events;
mod mux;
mod reader;
mod template;

pub use config::KillSet;
pub use error::{Error, ParseError};
pub use events::{EndReason, Event, EventKind};
pub use mux::{Mux, Outcome, Step};
pub use reader::{
    open_input, open_inputs, spawn_source, BoxedSource, Delivery, LineSource, StreamHandle,
    OPEN_TARGET,
};
pub use template::{Fragment, Template};

#[cfg(doctest)]
doc_comment::doctest!("../README.md");
