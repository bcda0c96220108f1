//! Output pump.
//!
//! Owns an OS pipe whose write end is handed to a child as its stdout and
//! stderr. Once started, a blocking worker moves everything that arrives on
//! the read end into the sink, so the child never stalls on a full pipe
//! buffer no matter how much it prints.
//!
//! The pump goes through two states. An [`OutputPump`] exposes the write end
//! for spawning; [`OutputPump::start`] consumes it and returns a
//! [`RunningPump`], which can be stopped and joined but never restarted.

mod state;

use std::io::{self, PipeReader, PipeWriter, Read, Write};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use self::state::PumpState;

/// Bytes requested from the pipe per read.
const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Errors raised by the pump itself, as opposed to failures it records.
#[derive(Error, Debug)]
pub enum PumpError {
    /// The sink rejected a zero-length write.
    #[error("output sink is not writable / closed: {0}")]
    SinkUnwritable(#[source] io::Error),

    /// The OS pipe could not be created.
    #[error("failed to create output pipe: {0}")]
    Pipe(#[source] io::Error),

    /// The worker did not return the sink.
    #[error("output pump worker failed: {0}")]
    Worker(String),
}

/// A pump that has not started draining yet.
pub struct OutputPump<W> {
    reader: PipeReader,
    writer: PipeWriter,
    sink: W,
}

impl<W: Write + Send + 'static> OutputPump<W> {
    /// Create a pump writing into `sink`.
    ///
    /// The sink is probed with a zero-length write so that closed or
    /// read-only sinks are rejected before anything is spawned.
    pub fn new(mut sink: W) -> Result<Self, PumpError> {
        sink.write(&[]).map_err(PumpError::SinkUnwritable)?;
        let (reader, writer) = io::pipe().map_err(PumpError::Pipe)?;
        Ok(Self {
            reader,
            writer,
            sink,
        })
    }

    /// Duplicates of the pipe's write end, for a child's stdout and stderr.
    pub fn child_stdio(&self) -> io::Result<(Stdio, Stdio)> {
        Ok((
            self.writer.try_clone()?.into(),
            self.writer.try_clone()?.into(),
        ))
    }

    /// Start draining on a blocking worker.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(self) -> RunningPump<W> {
        let state = Arc::new(PumpState::default());
        let worker_state = Arc::clone(&state);
        let Self {
            reader,
            writer,
            sink,
        } = self;

        let handle = tokio::task::spawn_blocking(move || drain(reader, sink, &worker_state));

        RunningPump {
            state,
            writer: Some(writer),
            handle: Some(handle),
            result: None,
        }
    }
}

/// A pump whose worker has been started.
pub struct RunningPump<W> {
    state: Arc<PumpState>,
    writer: Option<PipeWriter>,
    handle: Option<JoinHandle<W>>,
    result: Option<Result<W, PumpError>>,
}

impl<W> RunningPump<W> {
    /// Check if the worker recorded a failure.
    pub fn is_error(&self) -> bool {
        self.state.error().is_some()
    }

    /// The recorded failure, if any.
    pub fn error_message(&self) -> Option<String> {
        self.state.error().map(str::to_owned)
    }

    /// Check if the worker has finished draining.
    pub fn is_finished(&self) -> bool {
        self.state.is_finished()
    }

    /// Signal the worker to stop and close the pump's copy of the write end.
    ///
    /// The worker still drains whatever the kernel has buffered. Calling this
    /// more than once has no further effect.
    pub fn stop(&mut self) {
        if self.state.request_stop() {
            debug!("output pump stop requested");
        }
        self.writer.take();
    }

    /// Wait for the worker to finish, for at most `limit` when given.
    ///
    /// Returns `false` if the limit elapsed first. The worker only finishes
    /// once every copy of the write end is closed, so a descendant that keeps
    /// the pipe open keeps the pump running.
    pub async fn wait(&mut self, limit: Option<Duration>) -> bool {
        let Some(handle) = self.handle.as_mut() else {
            return true;
        };

        let joined = match limit {
            Some(limit) => match tokio::time::timeout(limit, handle).await {
                Ok(joined) => joined,
                Err(_) => return false,
            },
            None => handle.await,
        };

        self.handle = None;
        self.result = Some(joined.map_err(|e| PumpError::Worker(e.to_string())));
        true
    }

    /// Stop, join the worker and hand the sink back.
    pub async fn finish(mut self) -> Result<W, PumpError> {
        self.stop();
        self.wait(None).await;
        self.result
            .take()
            .unwrap_or_else(|| Err(PumpError::Worker("sink already taken".into())))
    }
}

impl<W> Drop for RunningPump<W> {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Worker body: move bytes from `reader` into `sink` until stopped, then
/// run one final pass to pick up what is still buffered in the pipe.
fn drain<W: Write>(mut reader: PipeReader, mut sink: W, state: &PumpState) -> W {
    let mut buf = vec![0u8; READ_BUFFER_SIZE];
    let mut total: u64 = 0;
    let mut eof = false;

    while !state.stop_requested() {
        match burst(&mut reader, &mut sink, &mut buf) {
            Ok(Some(n)) => total += n as u64,
            Ok(None) => {
                eof = true;
                break;
            }
            Err(message) => {
                warn!(bytes = total, "{}", message);
                state.fail(message);
                state.mark_finished();
                return sink;
            }
        }
    }

    if !eof {
        trace!("output pump final drain pass");
        loop {
            match burst(&mut reader, &mut sink, &mut buf) {
                Ok(Some(n)) => total += n as u64,
                Ok(None) => break,
                Err(message) => {
                    warn!(bytes = total, "{}", message);
                    state.fail(message);
                    break;
                }
            }
        }
    }

    debug!(bytes = total, "output pump finished");
    state.mark_finished();
    sink
}

/// One blocking read, written through to the sink and flushed.
///
/// `Ok(None)` means every write end is closed.
fn burst<W: Write>(
    reader: &mut PipeReader,
    sink: &mut W,
    buf: &mut [u8],
) -> Result<Option<usize>, String> {
    let n = loop {
        match reader.read(buf) {
            Ok(n) => break n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(format!("output pipe read failed: {}", e)),
        }
    };

    if n == 0 {
        return Ok(None);
    }

    trace!(bytes = n, "output pump burst");
    sink.write_all(&buf[..n])
        .and_then(|()| sink.flush())
        .map_err(|e| format!("output sink write failed: {}", e))?;
    Ok(Some(n))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Rejects every write, including the zero-length probe.
    struct ClosedSink;

    impl Write for ClosedSink {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "sink closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// Accepts the probe but fails on real data.
    struct FailingSink;

    impl Write for FailingSink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if buf.is_empty() {
                return Ok(0);
            }
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "sink went away"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_rejects_closed_sink() {
        let result = OutputPump::new(ClosedSink);
        assert!(matches!(result, Err(PumpError::SinkUnwritable(_))));
    }

    #[tokio::test]
    async fn test_drains_buffered_bytes() {
        let pump = OutputPump::new(Vec::new()).unwrap();
        let mut producer = pump.writer.try_clone().unwrap();
        producer.write_all(b"hello\nworld\n").unwrap();
        drop(producer);

        let mut running = pump.start();
        running.stop();
        let sink = running.finish().await.unwrap();

        assert_eq!(sink, b"hello\nworld\n");
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let mut running = OutputPump::new(Vec::new()).unwrap().start();
        running.stop();
        running.stop();

        assert!(running.wait(Some(Duration::from_secs(5))).await);
        assert!(running.is_finished());
        assert!(!running.is_error());
        assert!(running.finish().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_keeps_draining_until_write_ends_close() {
        let pump = OutputPump::new(Vec::new()).unwrap();
        let producer = pump.writer.try_clone().unwrap();

        let mut running = pump.start();
        running.stop();
        assert!(!running.wait(Some(Duration::from_millis(200))).await);
        assert!(!running.is_finished());

        let writer = std::thread::spawn(move || {
            let mut producer = producer;
            producer.write_all(b"late").unwrap();
        });
        writer.join().unwrap();

        assert_eq!(running.finish().await.unwrap(), b"late");
    }

    #[tokio::test]
    async fn test_sink_failure_sets_error() {
        let pump = OutputPump::new(FailingSink).unwrap();
        let mut producer = pump.writer.try_clone().unwrap();
        producer.write_all(b"doomed").unwrap();
        drop(producer);

        let mut running = pump.start();
        running.stop();
        assert!(running.wait(Some(Duration::from_secs(5))).await);

        assert!(running.is_error());
        let message = running.error_message().unwrap();
        assert!(message.contains("sink write failed"), "{}", message);
        assert!(running.finish().await.is_ok());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_child_output_larger_than_pipe_buffer() {
        let pump = OutputPump::new(Vec::new()).unwrap();
        let (stdout, stderr) = pump.child_stdio().unwrap();

        let mut cmd = tokio::process::Command::new("/bin/sh");
        cmd.arg("-c")
            .arg("head -c 1000000 /dev/zero; echo done >&2")
            .stdout(stdout)
            .stderr(stderr);
        let mut child = cmd.spawn().unwrap();
        drop(cmd);

        let mut running = pump.start();
        assert!(child.wait().await.unwrap().success());
        running.stop();
        let sink = running.finish().await.unwrap();

        assert_eq!(sink.len(), 1_000_000 + "done\n".len());
        assert!(sink.ends_with(b"done\n"));
    }
}
