use bm257s_core::{decode, ByteSource, Frame, PackageReader, ReaderError};
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const EXAMPLE: [u8; 15] = [
    0x02, 0x1A, 0x20, 0x3C, 0x47, 0x50, 0x6A, 0x78, 0x8F, 0x9F, 0xA7, 0xB0, 0xC0, 0xD0, 0xE5,
];

const WAIT: Duration = Duration::from_secs(5);

/// Hands out bytes pushed from the test, a few at a time.
struct ScriptedSource {
    pending: Vec<u8>,
    incoming: Receiver<io::Result<Vec<u8>>>,
}

impl ScriptedSource {
    fn new() -> (Self, Sender<io::Result<Vec<u8>>>) {
        let (tx, rx) = unbounded();
        (
            Self {
                pending: Vec::new(),
                incoming: rx,
            },
            tx,
        )
    }

    fn all_data_used(&self) -> bool {
        self.pending.is_empty() && self.incoming.is_empty()
    }
}

impl ByteSource for ScriptedSource {
    fn read_bytes(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.pending.is_empty() {
            match self.incoming.recv_timeout(Duration::from_millis(10)) {
                Ok(chunk) => self.pending = chunk?,
                Err(_) => return Ok(0),
            }
        }
        let n = buf.len().min(self.pending.len());
        buf[..n].copy_from_slice(&self.pending[..n]);
        self.pending.drain(..n);
        Ok(n)
    }
}

/// A transport whose device is gone: every read fails.
struct UnpluggedSource {
    reads: Arc<AtomicUsize>,
}

impl ByteSource for UnpluggedSource {
    fn read_bytes(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "device unplugged"))
    }
}

struct PanickingSource;

impl ByteSource for PanickingSource {
    fn read_bytes(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        panic!("driver bug");
    }
}

fn wait_until_stopped(is_running: impl Fn() -> bool) {
    let deadline = Instant::now() + WAIT;
    while is_running() {
        assert!(Instant::now() < deadline, "reader did not stop");
        thread::sleep(Duration::from_millis(5));
    }
}

fn example() -> Frame {
    decode(&EXAMPLE).unwrap()
}

#[test]
fn test_reads_frame_from_stream() {
    let (source, feed) = ScriptedSource::new();
    let mut reader = PackageReader::new(source);
    reader.start().unwrap();

    feed.send(Ok(EXAMPLE.to_vec())).unwrap();
    assert!(reader.wait_for_package(WAIT));
    assert_eq!(reader.next_package(), Some(example()));
    assert_eq!(reader.next_package(), None);

    reader.stop().unwrap();
    assert!(reader.source().unwrap().all_data_used());
}

#[test]
fn test_resyncs_after_rotated_frame() {
    for shift in [1, 7, 14] {
        let (source, feed) = ScriptedSource::new();
        let mut reader = PackageReader::new(source);
        reader.start().unwrap();

        let mut data = EXAMPLE.to_vec();
        data.rotate_left(shift);
        data.extend_from_slice(&EXAMPLE);
        feed.send(Ok(data)).unwrap();

        assert!(reader.wait_for_package(WAIT), "shift {shift}");
        assert_eq!(reader.next_package(), Some(example()), "shift {shift}");

        reader.stop().unwrap();
        assert!(reader.source().unwrap().all_data_used());
    }
}

#[test]
fn test_bad_frames_do_not_stop_reader() {
    let (source, feed) = ScriptedSource::new();
    let mut reader = PackageReader::new(source);
    reader.start().unwrap();

    let mut corrupt = EXAMPLE;
    corrupt[4] = 0xF0;
    feed.send(Ok(vec![0xFF, 0x00, 0x13])).unwrap();
    feed.send(Ok(corrupt.to_vec())).unwrap();
    feed.send(Err(io::Error::new(io::ErrorKind::Interrupted, "signal")))
        .unwrap();
    feed.send(Ok(EXAMPLE.to_vec())).unwrap();

    assert!(reader.wait_for_package(WAIT));
    assert_eq!(reader.next_package(), Some(example()));
    assert!(reader.is_running());
    reader.stop().unwrap();
}

#[test]
fn test_restart_clears_pending_frame() {
    let (source, feed) = ScriptedSource::new();
    let mut reader = PackageReader::new(source);
    reader.start().unwrap();

    feed.send(Ok(EXAMPLE.to_vec())).unwrap();
    assert!(reader.wait_for_package(WAIT));

    reader.stop().unwrap();
    reader.start().unwrap();
    assert_eq!(reader.next_package(), None);
    assert!(!reader.wait_for_package(Duration::from_millis(50)));

    feed.send(Ok(EXAMPLE.to_vec())).unwrap();
    assert!(reader.wait_for_package(WAIT));
    assert_eq!(reader.next_package(), Some(example()));
    reader.stop().unwrap();
}

#[test]
fn test_lifecycle_misuse_is_an_error() {
    let (source, _feed) = ScriptedSource::new();
    let mut reader = PackageReader::new(source);

    assert!(matches!(reader.stop(), Err(ReaderError::NotRunning)));
    assert!(!reader.is_running());

    reader.start().unwrap();
    assert!(matches!(reader.start(), Err(ReaderError::AlreadyRunning)));
    assert!(reader.is_running());

    reader.stop().unwrap();
    assert!(matches!(reader.stop(), Err(ReaderError::NotRunning)));
    assert!(!reader.is_running());
}

#[test]
fn test_handle_from_consumer_thread() {
    let (source, feed) = ScriptedSource::new();
    let mut reader = PackageReader::new(source);
    let handle = reader.handle();
    assert!(!handle.is_running());

    reader.start().unwrap();
    assert!(handle.is_running());

    let consumer = {
        let handle = handle.clone();
        thread::spawn(move || {
            assert!(handle.wait_for_package(WAIT));
            handle.next_package()
        })
    };
    feed.send(Ok(EXAMPLE.to_vec())).unwrap();

    assert_eq!(consumer.join().unwrap(), Some(example()));
    reader.stop().unwrap();
    assert!(!handle.is_running());
}

#[test]
fn test_drop_stops_running_reader() {
    let (source, feed) = ScriptedSource::new();
    let handle = {
        let mut reader = PackageReader::new(source);
        reader.start().unwrap();
        reader.handle()
    };
    assert!(!handle.is_running());
    // The source went away with the reader thread.
    assert!(feed.send(Ok(EXAMPLE.to_vec())).is_err());
}

#[test]
fn test_failed_source_ends_reader() {
    let reads = Arc::new(AtomicUsize::new(0));
    let mut reader = PackageReader::new(UnpluggedSource {
        reads: Arc::clone(&reads),
    });
    let handle = reader.handle();
    reader.start().unwrap();

    let started = Instant::now();
    assert!(!handle.wait_for_package(WAIT));
    assert!(started.elapsed() < WAIT);
    wait_until_stopped(|| handle.is_running());
    assert!(handle.has_failed());
    assert!(!reader.is_running());
    assert_eq!(reads.load(Ordering::SeqCst), 1);

    match reader.stop() {
        Err(ReaderError::Source(e)) => assert_eq!(e.kind(), io::ErrorKind::BrokenPipe),
        other => panic!("unexpected {other:?}"),
    }
    assert!(!handle.has_failed());
    assert!(matches!(reader.stop(), Err(ReaderError::NotRunning)));
}

#[test]
fn test_start_after_failure_reports_then_restarts() {
    let reads = Arc::new(AtomicUsize::new(0));
    let mut reader = PackageReader::new(UnpluggedSource {
        reads: Arc::clone(&reads),
    });
    reader.start().unwrap();
    wait_until_stopped(|| reader.is_running());

    assert!(matches!(reader.start(), Err(ReaderError::Source(_))));
    assert!(!reader.is_running());

    // The source came back with the failed thread, so a new start works.
    reader.start().unwrap();
    wait_until_stopped(|| reader.is_running());
    assert_eq!(reads.load(Ordering::SeqCst), 2);
    assert!(matches!(reader.stop(), Err(ReaderError::Source(_))));
}

#[test]
fn test_panicked_worker_is_not_running() {
    let mut reader = PackageReader::new(PanickingSource);
    reader.start().unwrap();
    wait_until_stopped(|| reader.is_running());

    assert!(matches!(reader.stop(), Err(ReaderError::WorkerPanicked)));
    assert!(matches!(reader.start(), Err(ReaderError::SourceUnavailable)));
}
