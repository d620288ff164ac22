//! Bounded capture of child process output streams.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::task::JoinHandle;
use tracing::debug;

/// How long to keep draining a pipe after its process has exited.
pub const DRAIN_GRACE: Duration = Duration::from_millis(500);

/// Wait up to `grace` for a drain task to reach EOF, then abort it.
///
/// A descendant that inherited the pipe can hold it open indefinitely;
/// whatever was captured by then is kept. Returns whether EOF was reached.
pub async fn finish_drain(mut drain: JoinHandle<()>, grace: Duration) -> bool {
    if tokio::time::timeout(grace, &mut drain).await.is_ok() {
        return true;
    }
    debug!("output pipe still open after exit");
    drain.abort();
    false
}

/// A shared, capacity-limited byte buffer.
///
/// Bytes past the capacity are read and discarded so the writer never
/// blocks on a full pipe.
#[derive(Clone, Debug)]
pub struct CapturedOutput {
    buffer: Arc<Mutex<Vec<u8>>>,
    capacity: usize,
}

impl CapturedOutput {
    /// Create an empty buffer holding at most `capacity` bytes.
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: Arc::new(Mutex::new(Vec::new())),
            capacity,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<u8>> {
        // A poisoned buffer still holds valid bytes.
        self.buffer.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Append as much of `chunk` as fits; returns the number of bytes kept.
    pub fn append(&self, chunk: &[u8]) -> usize {
        let mut buffer = self.lock();
        let room = self.capacity.saturating_sub(buffer.len());
        let kept = room.min(chunk.len());
        buffer.extend_from_slice(&chunk[..kept]);
        kept
    }

    /// Get the captured output as bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.lock().clone()
    }

    /// Get the captured output as a string.
    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(&self.lock()).into_owned()
    }

    /// Get the length of captured data.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check if the buffer reached its capacity.
    pub fn is_full(&self) -> bool {
        self.len() >= self.capacity
    }

    /// Drain `reader` into this buffer on a background task until EOF.
    pub fn spawn_drain<R>(&self, mut reader: R) -> JoinHandle<()>
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let sink = self.clone();
        tokio::spawn(async move {
            let mut chunk = [0u8; 4096];
            loop {
                match reader.read(&mut chunk).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => {
                        sink.append(&chunk[..n]);
                    }
                }
            }
        })
    }
}

/// Captured stdout and stderr of one child process.
#[derive(Clone, Debug)]
pub struct StreamCapture {
    /// Captured stdout.
    pub stdout: CapturedOutput,
    /// Captured stderr.
    pub stderr: CapturedOutput,
}

impl StreamCapture {
    /// Two independent buffers of `capacity` bytes each.
    pub fn new(capacity: usize) -> Self {
        Self {
            stdout: CapturedOutput::new(capacity),
            stderr: CapturedOutput::new(capacity),
        }
    }

    /// Get the captured stdout as a string.
    pub fn stdout_str(&self) -> String {
        self.stdout.to_string_lossy()
    }

    /// Get the captured stderr as a string.
    pub fn stderr_str(&self) -> String {
        self.stderr.to_string_lossy()
    }
}
