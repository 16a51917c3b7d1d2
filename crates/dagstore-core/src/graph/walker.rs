//! Cancellable, incrementally produced enumerations.
//!
//! A [`VertexStream`] runs its query on a dedicated producer thread and
//! hands keys over a zero-capacity channel, so the producer only computes the
//! next key once the consumer has taken the previous one. Errors met along
//! the way go to a separate unbounded channel and do not stop production.
//!
//! ```text
//! producer thread ──key (rendezvous)──▶ VertexStream::next()
//!                 ──error (unbounded)─▶ VertexStream::errors()
//!                 ◀──cancel (flag + wake)── CancelHandle::cancel()
//! ```

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{bounded, select, unbounded, Receiver, Sender};
use tracing::{debug, warn};

use crate::error::{Error, Result};

use super::types::VertexKey;

/// Source of a stream: a fallible sequence of keys.
pub type ItemCursor = Box<dyn Iterator<Item = Result<VertexKey>> + Send>;

/// Cancels a [`VertexStream`] from any thread.
#[derive(Clone)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
    wake: Sender<()>,
}

impl CancelHandle {
    /// Asks the producer to stop. Idempotent.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
        // Full or disconnected both mean the producer needs no extra wake-up.
        let _ = self.wake.try_send(());
    }

    /// Returns true once cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

impl fmt::Debug for CancelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelHandle")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Lazy, finite, non-restartable sequence of vertex keys.
///
/// Iterating yields keys until the enumeration completes or the stream is
/// cancelled; no key is yielded after [`VertexStream::cancel`] returns.
/// Dropping the stream cancels it.
///
/// # Example
///
/// ```rust
/// use dagstore_core::graph::walker::{ItemCursor, VertexStream};
/// use dagstore_core::graph::VertexKey;
///
/// let cursor: ItemCursor = Box::new(vec![VertexKey::new("a"), VertexKey::new("b")].into_iter());
/// let mut stream = VertexStream::spawn("demo", move || Ok(cursor)).unwrap();
/// assert_eq!(stream.next().unwrap().as_str(), "a");
/// stream.cancel();
/// assert!(stream.next().is_none());
/// ```
pub struct VertexStream {
    keys: Receiver<VertexKey>,
    errors: Receiver<Error>,
    cancel: CancelHandle,
}

impl VertexStream {
    /// Starts a producer thread that opens the cursor with `open` and feeds
    /// its keys to the returned stream.
    ///
    /// A failure of `open` is reported on the error channel and both channels
    /// close right away.
    ///
    /// # Errors
    ///
    /// Returns `Error::Spawn` if the producer thread cannot be started.
    pub fn spawn<F>(name: &str, open: F) -> Result<Self>
    where
        F: FnOnce() -> Result<ItemCursor> + Send + 'static,
    {
        let (key_tx, key_rx) = bounded(0);
        let (error_tx, error_rx) = unbounded();
        let (wake_tx, wake_rx) = bounded(1);
        let flag = Arc::new(AtomicBool::new(false));

        let producer = Producer {
            keys: key_tx,
            errors: error_tx,
            cancelled: Arc::clone(&flag),
            wake: wake_rx,
        };
        let stream = name.to_string();
        thread::Builder::new()
            .name(format!("dagstore-{name}"))
            .spawn(move || producer.run(&stream, open))
            .map_err(Error::Spawn)?;

        Ok(Self {
            keys: key_rx,
            errors: error_rx,
            cancel: CancelHandle {
                flag,
                wake: wake_tx,
            },
        })
    }

    /// Errors met during enumeration. The channel disconnects once the
    /// producer has finished.
    #[must_use]
    pub fn errors(&self) -> &Receiver<Error> {
        &self.errors
    }

    /// Errors reported so far, without blocking.
    #[must_use]
    pub fn drain_errors(&self) -> Vec<Error> {
        self.errors.try_iter().collect()
    }

    /// Stops the stream. Later calls to `next` return `None`.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// A handle that can cancel this stream from another thread.
    #[must_use]
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }
}

impl Iterator for VertexStream {
    type Item = VertexKey;

    fn next(&mut self) -> Option<VertexKey> {
        if self.cancel.is_cancelled() {
            return None;
        }
        let key = self.keys.recv().ok()?;
        // A cancel from another thread may race with the handoff.
        if self.cancel.is_cancelled() {
            return None;
        }
        Some(key)
    }
}

impl Drop for VertexStream {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl fmt::Debug for VertexStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VertexStream")
            .field("cancel", &self.cancel)
            .field("pending_errors", &self.errors.len())
            .finish_non_exhaustive()
    }
}

struct Producer {
    keys: Sender<VertexKey>,
    errors: Sender<Error>,
    cancelled: Arc<AtomicBool>,
    wake: Receiver<()>,
}

impl Producer {
    fn run<F>(self, stream: &str, open: F)
    where
        F: FnOnce() -> Result<ItemCursor>,
    {
        let cursor = match open() {
            Ok(cursor) => cursor,
            Err(err) => {
                warn!(stream, error = %err, "Stream query failed to start");
                let _ = self.errors.send(err);
                return;
            }
        };

        let mut produced = 0usize;
        for item in cursor {
            if self.cancelled.load(Ordering::Acquire) {
                debug!(stream, produced, "Stream cancelled");
                return;
            }
            match item {
                Ok(key) => {
                    select! {
                        send(self.keys, key) -> sent => {
                            if sent.is_err() {
                                return;
                            }
                            produced += 1;
                        }
                        recv(self.wake) -> _ => {
                            debug!(stream, produced, "Stream cancelled");
                            return;
                        }
                    }
                }
                Err(err @ Error::DepthExceeded(_)) => {
                    warn!(stream, produced, error = %err, "Walk stopped at depth ceiling");
                    let _ = self.errors.send(err);
                    return;
                }
                Err(err) => {
                    warn!(stream, error = %err, "Skipping item that failed to load");
                    if self.errors.send(err).is_err() {
                        return;
                    }
                }
            }
        }
        debug!(stream, produced, "Stream exhausted");
    }
}
