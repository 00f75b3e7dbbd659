use tapcast_core::{
    READER_EVENT_CAPACITY, ReaderBackend, ReaderError, ReaderEvent,
    ReaderEvents,
};
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt, BufReader},
    sync::mpsc,
};
use tracing::debug;

/// Read errors in a row after which the source is considered gone.
const MAX_CONSECUTIVE_IO_ERRORS: usize = 3;

/// Reads one card id per line, for keyboard-wedge readers and demos.
///
/// Blank lines are skipped and lines that are not UTF-8 are reported as device
/// faults. End of input closes the event stream, as do repeated read errors.
pub struct LineReader<R> {
    name: &'static str,
    source: R,
}

impl<R> std::fmt::Debug for LineReader<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineReader").field("name", &self.name).finish()
    }
}

impl LineReader<BufReader<tokio::io::Stdin>> {
    pub fn stdin() -> Self {
        Self::new("stdin", BufReader::new(tokio::io::stdin()))
    }
}

impl<R> LineReader<R>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    pub fn new(name: &'static str, source: R) -> Self {
        Self { name, source }
    }
}

impl<R> ReaderBackend for LineReader<R>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn start(self: Box<Self>) -> Result<ReaderEvents, ReaderError> {
        let handle = tokio::runtime::Handle::try_current().map_err(|e| {
            ReaderError::Init(format!("no async runtime for {}: {e}", self.name))
        })?;
        let (tx, rx) = mpsc::channel(READER_EVENT_CAPACITY);
        let LineReader { name, source } = *self;

        handle.spawn(async move {
            if tx.send(ReaderEvent::Ready { reader: name.to_string() }).await.is_err() {
                return;
            }

            let mut source = source;
            let mut line = Vec::new();
            let mut failures = 0;
            loop {
                line.clear();
                let event = match source.read_until(b'\n', &mut line).await {
                    Ok(0) => break,
                    Ok(_) => {
                        failures = 0;
                        match std::str::from_utf8(&line) {
                            Ok(text) => {
                                let uid = text.trim();
                                if uid.is_empty() {
                                    continue;
                                }
                                ReaderEvent::card(name, uid)
                            }
                            Err(err) => ReaderEvent::Error(ReaderError::device(
                                name,
                                format!("discarded unreadable line: {err}"),
                            )),
                        }
                    }
                    Err(err) => {
                        failures += 1;
                        ReaderEvent::Error(ReaderError::device(name, err.to_string()))
                    }
                };
                if tx.send(event).await.is_err() || failures >= MAX_CONSECUTIVE_IO_ERRORS {
                    break;
                }
            }
            debug!(reader = name, "line reader finished");
        });

        Ok(rx)
    }
}
