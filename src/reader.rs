//! Everything related to reading lines from a single input stream.

use std::fmt;
use std::mem;
use std::path::Path;
use std::pin::Pin;
use std::task;

use futures_util::ready;
use futures_util::stream::{Stream as FuturesStream, StreamExt};
use pin_project_lite::pin_project;
use tokio::fs::File;
use tokio::io::{AsyncBufRead, AsyncRead, BufReader};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::error::Error;
use crate::events::{EndReason, Event};

/// Any readable byte stream a worker can own.
pub type BoxedSource = Box<dyn AsyncRead + Send + Unpin>;

/// An event paired with the acknowledgement its worker waits on before
/// reading again.
pub type Delivery = (Event, oneshot::Sender<()>);

/// Tracing target of input open failures. These are always reported.
pub const OPEN_TARGET: &str = "muxline::open";

/// An opened input, tagged with the index it was given on the command line.
pub struct StreamHandle {
    index: usize,
    source: BoxedSource,
}

impl StreamHandle {
    pub fn new(index: usize, source: impl AsyncRead + Send + Unpin + 'static) -> Self {
        StreamHandle {
            index,
            source: Box::new(source),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Returns the internal components that make up a `StreamHandle`.
    pub fn into_inner(self) -> (usize, BoxedSource) {
        let StreamHandle { index, source } = self;

        (index, source)
    }
}

impl fmt::Debug for StreamHandle {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        f.debug_struct("StreamHandle")
            .field("index", &self.index)
            .field("source", &"<elided>")
            .finish()
    }
}

/// Opens the file at `path` as the input with the given index.
pub async fn open_input(index: usize, path: impl AsRef<Path>) -> Result<StreamHandle, Error> {
    let path = path.as_ref();
    let file = File::open(path).await.map_err(|source| Error::Open {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(StreamHandle::new(index, file))
}

/// Opens every path in order, assigning indices by position.
///
/// Paths that fail to open are reported and skipped; the indices of the
/// remaining inputs are unaffected.
pub async fn open_inputs<I, P>(paths: I) -> Vec<StreamHandle>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    let mut handles = Vec::new();

    for (index, path) in paths.into_iter().enumerate() {
        match open_input(index, path.as_ref()).await {
            Ok(handle) => {
                tracing::debug!(index, path = %path.as_ref().display(), "opened input");
                handles.push(handle);
            }
            Err(err) => tracing::error!(target: OPEN_TARGET, index, error = %err, "input not opened"),
        }
    }

    handles
}

pin_project! {
/// Lazy, non-restartable sequence of [`Event`]s read from one stream.
///
/// Yields one `Line` per newline-terminated read, followed by exactly one
/// `Ended` once the underlying read reports end-of-stream or fails. Bytes
/// after the last newline are discarded. The stream yields `None` forever
/// after the `Ended` event.
pub struct LineSource<R> {
    index: usize,
    #[pin]
    reader: BufReader<R>,
    buf: Vec<u8>,
    ended: bool,
}
}

impl<R: AsyncRead> LineSource<R> {
    pub fn new(index: usize, source: R) -> Self {
        LineSource {
            index,
            reader: BufReader::new(source),
            buf: Vec::new(),
            ended: false,
        }
    }
}

impl<R> fmt::Debug for LineSource<R> {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        f.debug_struct("LineSource")
            .field("index", &self.index)
            .field("pending", &self.buf.len())
            .field("ended", &self.ended)
            .finish()
    }
}

impl<R: AsyncRead> FuturesStream for LineSource<R> {
    type Item = Event;

    fn poll_next(
        self: Pin<&mut Self>,
        cx: &mut task::Context<'_>,
    ) -> task::Poll<Option<Self::Item>> {
        let mut this = self.project();

        if *this.ended {
            return task::Poll::Ready(None);
        }

        loop {
            let (found, used) = {
                let available = match ready!(this.reader.as_mut().poll_fill_buf(cx)) {
                    Ok(available) => available,
                    Err(err) => {
                        *this.ended = true;
                        this.buf.clear();
                        let event = Event::ended(*this.index, EndReason::Fault(err));
                        return task::Poll::Ready(Some(event));
                    }
                };

                if available.is_empty() {
                    // Partial trailing line, if any, is dropped.
                    *this.ended = true;
                    this.buf.clear();
                    let event = Event::ended(*this.index, EndReason::Eof);
                    return task::Poll::Ready(Some(event));
                }

                match available.iter().position(|b| *b == b'\n') {
                    Some(pos) => {
                        this.buf.extend_from_slice(&available[..=pos]);
                        (true, pos + 1)
                    }
                    None => {
                        this.buf.extend_from_slice(available);
                        (false, available.len())
                    }
                }
            };

            this.reader.as_mut().consume(used);

            if found {
                let raw = mem::take(this.buf);
                let text = String::from_utf8_lossy(&raw).trim_end().to_owned();
                return task::Poll::Ready(Some(Event::line(*this.index, text)));
            }
        }
    }
}

/// Moves `handle` into a new task that forwards its events to `tx`.
///
/// Every event travels with a oneshot sender; the task issues its next read
/// only once the receiver has acknowledged the previous event. The source is
/// dropped before the final `Ended` event is sent.
pub fn spawn_source(handle: StreamHandle, tx: mpsc::Sender<Delivery>) -> JoinHandle<()> {
    let (index, source) = handle.into_inner();

    tokio::spawn(async move {
        let mut lines = Box::pin(LineSource::new(index, source));

        loop {
            let event = match lines.next().await {
                Some(event) => event,
                None => return,
            };

            let (ack, acked) = oneshot::channel();

            if event.is_end() {
                drop(lines);
                tracing::debug!(index, "input closed");
                let _ = tx.send((event, ack)).await;
                return;
            }

            // Either error means the coordinator is gone.
            if tx.send((event, ack)).await.is_err() || acked.await.is_err() {
                return;
            }
        }
    })
}
