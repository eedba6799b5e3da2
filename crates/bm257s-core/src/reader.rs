use bm257s_decode::{Frame, FRAME_LEN};
use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError};
use parking_lot::{Condvar, Mutex};
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::aligner::FrameAligner;
use crate::serial::ByteSource;

const IDLE_BACKOFF: Duration = Duration::from_millis(5);

#[derive(Debug, thiserror::Error)]
pub enum ReaderError {
    #[error("reader is already running")]
    AlreadyRunning,
    #[error("reader is not running")]
    NotRunning,
    #[error("failed to spawn reader thread: {0}")]
    Spawn(#[source] io::Error),
    #[error("reader thread panicked")]
    WorkerPanicked,
    #[error("byte source was lost by an earlier failure")]
    SourceUnavailable,
    #[error("byte source failed: {0}")]
    Source(#[source] io::Error),
}

enum Command {
    Stop,
}

/// Holds the newest frame until a consumer takes it.
#[derive(Default)]
struct Mailbox {
    slot: Mutex<Option<Frame>>,
    available: Condvar,
}

impl Mailbox {
    fn publish(&self, frame: Frame) {
        let mut slot = self.slot.lock();
        *slot = Some(frame);
        self.available.notify_all();
    }

    fn take(&self) -> Option<Frame> {
        self.slot.lock().take()
    }

    fn clear(&self) {
        self.slot.lock().take();
    }

    /// Wakes waiters without publishing, so they re-check `interrupted`.
    fn wake(&self) {
        let _slot = self.slot.lock();
        self.available.notify_all();
    }

    /// Waits for a frame; gives up early once `interrupted` returns true.
    fn wait(&self, timeout: Duration, interrupted: impl Fn() -> bool) -> bool {
        let mut slot = self.slot.lock();
        if slot.is_none() {
            self.available
                .wait_while_for(&mut slot, |pending| pending.is_none() && !interrupted(), timeout);
        }
        slot.is_some()
    }
}

#[derive(Default)]
struct Shared {
    mailbox: Mailbox,
    running: AtomicBool,
    // Lock order: mailbox slot, then failure.
    failure: Mutex<Option<io::Error>>,
}

impl Shared {
    fn wait(&self, timeout: Duration) -> bool {
        self.mailbox.wait(timeout, || self.has_failed())
    }

    fn has_failed(&self) -> bool {
        self.failure.lock().is_some()
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

/// Clears `running` when the reader thread exits, including by panic.
struct RunningGuard<'a>(&'a Shared);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.running.store(false, Ordering::Release);
        self.0.mailbox.wake();
    }
}

/// Consumer side of a `PackageReader`, cheap to clone across threads.
#[derive(Clone)]
pub struct PackageHandle {
    shared: Arc<Shared>,
}

impl PackageHandle {
    /// Takes the latest frame, leaving the mailbox empty.
    pub fn next_package(&self) -> Option<Frame> {
        self.shared.mailbox.take()
    }

    /// Blocks until a frame is pending or `timeout` passes. Returns early,
    /// with `false`, if the byte source fails meanwhile.
    pub fn wait_for_package(&self, timeout: Duration) -> bool {
        self.shared.wait(timeout)
    }

    /// False once stopped or once the reader thread ended on its own.
    pub fn is_running(&self) -> bool {
        self.shared.is_running()
    }

    /// True when the reader thread ended because the byte source failed.
    pub fn has_failed(&self) -> bool {
        self.shared.has_failed()
    }
}

struct Worker<S> {
    tx_cmd: Sender<Command>,
    handle: JoinHandle<S>,
}

/// Reads frames from a `ByteSource` on a background thread.
///
/// Only the most recent frame is kept; frames nobody picked up in time are
/// overwritten. The source is handed back to the reader when the thread
/// stops, so `start` can be called again after `stop`.
///
/// Read timeouts and interruptions are retried. Any other source error ends
/// the thread: `is_running` turns false and the error comes back from the
/// next `stop` (or `start`).
pub struct PackageReader<S: ByteSource> {
    source: Option<S>,
    worker: Option<Worker<S>>,
    shared: Arc<Shared>,
}

impl<S: ByteSource> PackageReader<S> {
    pub fn new(source: S) -> Self {
        Self {
            source: Some(source),
            worker: None,
            shared: Arc::default(),
        }
    }

    pub fn start(&mut self) -> Result<(), ReaderError> {
        if self.worker.is_some() {
            if self.is_running() {
                return Err(ReaderError::AlreadyRunning);
            }
            // The thread ended on its own; collect it and report why.
            self.stop()?;
        }
        let source = self.source.take().ok_or(ReaderError::SourceUnavailable)?;

        self.shared.mailbox.clear();
        *self.shared.failure.lock() = None;
        let (tx_cmd, rx_cmd) = bounded::<Command>(1);
        let shared = Arc::clone(&self.shared);

        self.shared.running.store(true, Ordering::Release);
        let spawned = thread::Builder::new()
            .name("bm257s-reader".to_string())
            .spawn(move || {
                let _running = RunningGuard(&shared);
                run(source, rx_cmd, &shared)
            });
        let handle = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                self.shared.running.store(false, Ordering::Release);
                return Err(ReaderError::Spawn(e));
            }
        };

        self.worker = Some(Worker { tx_cmd, handle });
        log::debug!("package reader started");
        Ok(())
    }

    /// Stops the thread and waits for it; blocks for up to one source read.
    ///
    /// If the thread had already ended because the source failed, the reader
    /// is stopped all the same and the source error is returned.
    pub fn stop(&mut self) -> Result<(), ReaderError> {
        let worker = self.worker.take().ok_or(ReaderError::NotRunning)?;
        let _ = worker.tx_cmd.send(Command::Stop);

        let source = worker.handle.join().map_err(|_| ReaderError::WorkerPanicked)?;
        self.source = Some(source);
        log::debug!("package reader stopped");

        match self.shared.failure.lock().take() {
            Some(e) => Err(ReaderError::Source(e)),
            None => Ok(()),
        }
    }

    pub fn is_running(&self) -> bool {
        self.shared.is_running()
    }

    pub fn handle(&self) -> PackageHandle {
        PackageHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn next_package(&self) -> Option<Frame> {
        self.shared.mailbox.take()
    }

    pub fn wait_for_package(&self, timeout: Duration) -> bool {
        self.shared.wait(timeout)
    }

    /// The byte source, available while the reader is stopped.
    pub fn source(&self) -> Option<&S> {
        self.source.as_ref()
    }
}

impl<S: ByteSource> Drop for PackageReader<S> {
    fn drop(&mut self) {
        if self.worker.is_some() {
            if let Err(e) = self.stop() {
                log::warn!("stopping package reader on drop: {e}");
            }
        }
    }
}

fn is_transient(kind: io::ErrorKind) -> bool {
    matches!(
        kind,
        io::ErrorKind::TimedOut | io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock
    )
}

fn run<S: ByteSource>(mut source: S, rx_cmd: Receiver<Command>, shared: &Shared) -> S {
    let mut aligner = FrameAligner::new();
    let mut buf = [0u8; FRAME_LEN];

    loop {
        match rx_cmd.try_recv() {
            Ok(Command::Stop) | Err(TryRecvError::Disconnected) => break,
            Err(TryRecvError::Empty) => {}
        }

        let need = aligner.need();
        match source.read_bytes(&mut buf[..need]) {
            Ok(0) => thread::sleep(IDLE_BACKOFF),
            Ok(n) => {
                if let Some(frame) = aligner.feed(&buf[..n]).pop() {
                    shared.mailbox.publish(frame);
                }
            }
            Err(e) if is_transient(e.kind()) => {
                log::debug!("byte source read interrupted: {e}");
                thread::sleep(IDLE_BACKOFF);
            }
            Err(e) => {
                log::error!("byte source failed, reader stopping: {e}");
                *shared.failure.lock() = Some(e);
                break;
            }
        }
    }

    source
}
