//! Everything related to fanning events from many streams into one template.

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

use crate::config::KillSet;
use crate::error::Error;
use crate::events::{EndReason, Event, EventKind};
use crate::reader::{spawn_source, StreamHandle};
use crate::template::Template;

/// Depth of the queue shared by all stream workers. Each worker also waits
/// for its event to be acknowledged, so this only bounds how many streams
/// can be queued at once.
const QUEUE_DEPTH: usize = 1;

/// What the coordinator does after applying one event.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Step {
    /// Emit the re-rendered template and keep going.
    Render,
    /// A kill-set stream closed; stop without rendering.
    Stop(usize),
}

/// Why [`Mux::run`] returned.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Outcome {
    /// The stream with this index reached end-of-stream and is in the kill set.
    Killed(usize),
    /// Every stream terminated without triggering the kill set.
    Exhausted,
}

/// Owns the [`Template`] and applies events from all streams to it.
///
/// All template mutation happens here, on the coordinator's own task, so the
/// workers never share state beyond the event queue.
#[derive(Debug)]
pub struct Mux {
    template: Template,
    kill_set: KillSet,
}

impl Mux {
    pub fn new(template: Template, kill_set: KillSet) -> Self {
        Mux { template, kill_set }
    }

    pub fn template(&self) -> &Template {
        &self.template
    }

    /// Applies a single event to the template.
    ///
    /// Lines for streams without a slot are dropped but still answer
    /// [`Step::Render`], so the caller re-emits an unchanged line.
    pub fn apply(&mut self, event: Event) -> Step {
        let (index, kind) = event.into_inner();

        match kind {
            EventKind::Line(text) => {
                if !self.template.set(index, text) {
                    tracing::trace!(index, "line for unmapped input dropped");
                }
            }
            EventKind::Ended(EndReason::Eof) if self.kill_set.contains(index) => {
                tracing::debug!(index, "kill-set input closed, stopping");
                return Step::Stop(index);
            }
            EventKind::Ended(reason) => {
                match &reason {
                    EndReason::Eof => tracing::debug!(index, "input reached end of stream"),
                    EndReason::Fault(err) => tracing::warn!(index, error = %err, "input failed"),
                }
                self.template.set(index, format!("({})", reason));
            }
        }

        Step::Render
    }

    /// Spawns one worker per handle and renders the template to `out` after
    /// every event until a kill-set stream closes or all streams are done.
    ///
    /// A worker's next read is released only after its previous event has
    /// been applied and rendered.
    pub async fn run<W>(mut self, handles: Vec<StreamHandle>, mut out: W) -> Result<Outcome, Error>
    where
        W: AsyncWrite + Unpin,
    {
        let (tx, mut rx) = mpsc::channel(QUEUE_DEPTH);

        for handle in handles {
            tracing::debug!(index = handle.index(), "spawning input worker");
            // Workers are detached; they exit once their stream ends or the
            // queue is dropped.
            let _ = spawn_source(handle, tx.clone());
        }
        drop(tx);

        while let Some((event, ack)) = rx.recv().await {
            match self.apply(event) {
                Step::Stop(index) => return Ok(Outcome::Killed(index)),
                Step::Render => {
                    let mut line = self.template.render();
                    line.push('\n');
                    out.write_all(line.as_bytes()).await?;
                    out.flush().await?;
                }
            }
            // The worker may read its next line now.
            let _ = ack.send(());
        }

        Ok(Outcome::Exhausted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::time::Duration;
    use tokio::io::{AsyncBufReadExt, BufReader, DuplexStream, Lines};
    use tokio::task::JoinHandle;
    use tokio::time::timeout;

    const TIMEOUT: Duration = Duration::from_secs(2);

    fn mux(format: &str, kill: &str) -> Mux {
        let kill_set = if kill.is_empty() {
            KillSet::new()
        } else {
            kill.parse().unwrap()
        };
        Mux::new(Template::compile(format).unwrap(), kill_set)
    }

    /// Starts `mux` over `count` in-memory inputs, returning their write ends,
    /// the rendered output and the coordinator task.
    fn start(
        mux: Mux,
        count: usize,
    ) -> (
        Vec<DuplexStream>,
        Lines<BufReader<DuplexStream>>,
        JoinHandle<Result<Outcome, Error>>,
    ) {
        let mut writers = Vec::new();
        let mut handles = Vec::new();
        for index in 0..count {
            let (writer, reader) = tokio::io::duplex(256);
            writers.push(writer);
            handles.push(StreamHandle::new(index, reader));
        }

        let (out_writer, out_reader) = tokio::io::duplex(4096);
        let task = tokio::spawn(mux.run(handles, out_writer));

        (writers, BufReader::new(out_reader).lines(), task)
    }

    async fn next_output(output: &mut Lines<BufReader<DuplexStream>>) -> Option<String> {
        timeout(TIMEOUT, output.next_line())
            .await
            .expect("timed out waiting for output")
            .unwrap()
    }

    #[test]
    fn test_apply_line_updates_slot() {
        let mut mux = mux("A%0B%1C", "");

        assert_eq!(mux.apply(Event::line(0, "x")), Step::Render);
        assert_eq!(mux.apply(Event::line(1, "y")), Step::Render);
        assert_eq!(mux.apply(Event::line(0, "z")), Step::Render);
        assert_eq!(mux.template().render(), "AzByC");
    }

    #[test]
    fn test_apply_unmapped_still_renders() {
        let mut mux = mux("%0", "");
        mux.apply(Event::line(0, "kept"));

        assert_eq!(mux.apply(Event::line(3, "dropped")), Step::Render);
        assert_eq!(mux.template().render(), "kept");
    }

    #[test]
    fn test_apply_eof_in_kill_set_stops() {
        let mut mux = mux("A%0B%1C", "1");
        mux.apply(Event::line(0, "x"));

        assert_eq!(mux.apply(Event::ended(1, EndReason::Eof)), Step::Stop(1));
        assert_eq!(mux.template().render(), "AxBC");
    }

    #[test]
    fn test_apply_eof_outside_kill_set_marks_slot() {
        let mut mux = mux("A%0B%1C", "");

        assert_eq!(mux.apply(Event::ended(1, EndReason::Eof)), Step::Render);
        assert_eq!(mux.template().slot(1), Some("(EOF)"));
        assert_eq!(mux.template().render(), "AB(EOF)C");
    }

    #[test]
    fn test_apply_fault_never_kills() {
        let mut mux = mux("[%0]", "0");
        let fault = io::Error::new(io::ErrorKind::Other, "bad sector");

        assert_eq!(
            mux.apply(Event::ended(0, EndReason::Fault(fault))),
            Step::Render
        );
        assert_eq!(mux.template().render(), "[(bad sector)]");
    }

    #[tokio::test]
    async fn test_run_kill_set_terminates() {
        let (mut writers, mut output, task) = start(mux("A%0B%1C", "1"), 2);

        writers[0].write_all(b"x\n").await.unwrap();
        assert_eq!(next_output(&mut output).await.as_deref(), Some("AxBC"));

        // Closing input 1 is an ordinary end-of-stream.
        drop(writers.remove(1));

        let outcome = timeout(TIMEOUT, task).await.unwrap().unwrap().unwrap();
        assert_eq!(outcome, Outcome::Killed(1));
        assert_eq!(next_output(&mut output).await, None);
    }

    #[tokio::test]
    async fn test_run_eof_without_kill_continues() {
        let (mut writers, mut output, task) = start(mux("A%0B%1C", ""), 2);

        drop(writers.remove(1));
        assert_eq!(
            next_output(&mut output).await.as_deref(),
            Some("AB(EOF)C")
        );

        writers[0].write_all(b"still here\n").await.unwrap();
        assert_eq!(
            next_output(&mut output).await.as_deref(),
            Some("Astill hereB(EOF)C")
        );

        drop(writers);
        assert_eq!(
            next_output(&mut output).await.as_deref(),
            Some("A(EOF)B(EOF)C")
        );

        let outcome = timeout(TIMEOUT, task).await.unwrap().unwrap().unwrap();
        assert_eq!(outcome, Outcome::Exhausted);
        assert_eq!(next_output(&mut output).await, None);
    }

    #[tokio::test]
    async fn test_run_unmapped_input_repeats_line() {
        let (mut writers, mut output, _task) = start(mux("<%0>", ""), 2);

        writers[0].write_all(b"x\n").await.unwrap();
        assert_eq!(next_output(&mut output).await.as_deref(), Some("<x>"));

        writers[1].write_all(b"ignored\n").await.unwrap();
        assert_eq!(next_output(&mut output).await.as_deref(), Some("<x>"));
    }

    #[tokio::test]
    async fn test_run_per_stream_order() {
        let (mut writers, mut output, _task) = start(mux("%0", ""), 1);

        writers[0].write_all(b"1\n2\n3\n").await.unwrap();
        for expected in ["1", "2", "3"].iter() {
            assert_eq!(next_output(&mut output).await.as_deref(), Some(*expected));
        }
    }

    #[tokio::test]
    async fn test_run_without_inputs() {
        let (_writers, mut output, task) = start(mux("%0", "0"), 0);

        let outcome = timeout(TIMEOUT, task).await.unwrap().unwrap().unwrap();
        assert_eq!(outcome, Outcome::Exhausted);
        assert_eq!(next_output(&mut output).await, None);
    }

    #[tokio::test]
    async fn test_run_missing_input_keeps_slot_empty() {
        let mut writers = Vec::new();
        let (writer, reader) = tokio::io::duplex(64);
        writers.push(writer);
        // Input 1 never opened.
        let handles = vec![StreamHandle::new(0, reader)];
        let (out_writer, out_reader) = tokio::io::duplex(1024);
        let mut output = BufReader::new(out_reader).lines();
        let _task = tokio::spawn(mux("%0|%1", "").run(handles, out_writer));

        writers[0].write_all(b"a\nb\n").await.unwrap();
        assert_eq!(next_output(&mut output).await.as_deref(), Some("a|"));
        assert_eq!(next_output(&mut output).await.as_deref(), Some("b|"));
    }
}
