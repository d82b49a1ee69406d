/// Background serial listener
///
/// One thread per connection. It polls the port, pushes every decoded line
/// onto the inbound queue and exits on a stop request or the first I/O error.
/// Stopping waits a bounded time for the thread; one that overruns is left to
/// finish on its own.

use std::io::Read;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use log::{debug, error, warn};

use crate::error::PanelError;
use crate::transport::LineReader;

// Sleep between empty polls when the port returns without waiting
const IDLE_BACKOFF: Duration = Duration::from_millis(10);

pub struct ReaderHandle {
    stop: Arc<AtomicBool>,
    exited: Receiver<()>,
    thread: Option<JoinHandle<()>>,
    join_timeout: Duration,
}

/// Start the listener thread over `io`.
pub fn spawn<R>(io: R, queue: Sender<String>, join_timeout: Duration) -> std::io::Result<ReaderHandle>
where
    R: Read + Send + 'static,
{
    let stop = Arc::new(AtomicBool::new(false));
    // Never sent on; the receiver sees a disconnect once the thread returns
    let (exit_tx, exited) = bounded::<()>(0);
    let thread_stop = Arc::clone(&stop);
    let thread = thread::Builder::new()
        .name("serial-reader".into())
        .spawn(move || {
            let _exit = exit_tx;
            let mut lines = LineReader::new(io);
            run(&mut lines, &thread_stop, &queue);
        })?;
    Ok(ReaderHandle {
        stop,
        exited,
        thread: Some(thread),
        join_timeout,
    })
}

/// Listener loop body. Returns when stopped, on a read error, or when the
/// queue has no consumer left.
pub fn run<R: Read>(lines: &mut LineReader<R>, stop: &AtomicBool, queue: &Sender<String>) {
    debug!(target: "reader", "Listener started");
    while !stop.load(Ordering::SeqCst) {
        match lines.poll_line() {
            Ok(Some(line)) => {
                if queue.send(line).is_err() {
                    warn!(target: "reader", "Inbound queue closed; listener exiting");
                    return;
                }
            }
            Ok(None) => thread::sleep(IDLE_BACKOFF),
            Err(e) => {
                let err = PanelError::Read(e);
                error!(target: "reader", "{}", err);
                let _ = queue.send(err.log_line());
                return;
            }
        }
    }
    debug!(target: "reader", "Listener stopped");
}

impl ReaderHandle {
    /// Signal the thread and wait up to the join timeout.
    ///
    /// Returns `false` if the thread was still running when the wait ran out.
    /// Calling again after a stop is a no-op that returns `true`.
    pub fn stop(&mut self) -> bool {
        self.stop.store(true, Ordering::SeqCst);
        let Some(thread) = self.thread.take() else {
            return true;
        };
        match self.exited.recv_timeout(self.join_timeout) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                if thread.join().is_err() {
                    error!(target: "reader", "Listener thread panicked");
                }
                true
            }
            Err(RecvTimeoutError::Timeout) => false,
        }
    }

    #[cfg(test)]
    fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl Drop for ReaderHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;
    use std::io;
    use std::time::Instant;

    /// Emits each line once, then idles like a quiet port.
    struct Chatty {
        lines: Vec<&'static str>,
        wait: Duration,
    }

    impl Read for Chatty {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.lines.is_empty() {
                thread::sleep(self.wait);
                return Err(io::ErrorKind::TimedOut.into());
            }
            let line = format!("{}\n", self.lines.remove(0));
            buf[..line.len()].copy_from_slice(line.as_bytes());
            Ok(line.len())
        }
    }

    struct Unplugged;

    impl Read for Unplugged {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "device unplugged"))
        }
    }

    #[test]
    fn test_lines_are_queued_in_order() {
        let (tx, rx) = unbounded();
        let io = Chatty { lines: vec!["READY", "PINMAP:22,23,24,25,26,27,28"], wait: Duration::from_millis(20) };
        let mut handle = spawn(io, tx, Duration::from_millis(800)).unwrap();
        assert_eq!(rx.recv_timeout(Duration::from_secs(2)).unwrap(), "READY");
        assert_eq!(rx.recv_timeout(Duration::from_secs(2)).unwrap(), "PINMAP:22,23,24,25,26,27,28");
        assert!(handle.stop());
        assert!(!handle.is_running());
    }

    #[test]
    fn test_read_error_ends_listener_with_log_line() {
        let (tx, rx) = unbounded();
        let mut handle = spawn(Unplugged, tx, Duration::from_millis(800)).unwrap();
        let line = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(line, "! Read error: device unplugged");
        assert!(handle.stop());
    }

    #[test]
    fn test_stop_within_join_window() {
        let (tx, _rx) = unbounded();
        let io = Chatty { lines: vec![], wait: Duration::from_millis(100) };
        let mut handle = spawn(io, tx, Duration::from_millis(800)).unwrap();
        thread::sleep(Duration::from_millis(30));
        let started = Instant::now();
        assert!(handle.stop());
        assert!(started.elapsed() < Duration::from_millis(800));
        // Second stop is a no-op
        assert!(handle.stop());
    }

    #[test]
    fn test_stuck_listener_is_abandoned() {
        let (tx, _rx) = unbounded();
        let io = Chatty { lines: vec![], wait: Duration::from_millis(1500) };
        let mut handle = spawn(io, tx, Duration::from_millis(50)).unwrap();
        thread::sleep(Duration::from_millis(20));
        let started = Instant::now();
        assert!(!handle.stop());
        assert!(started.elapsed() < Duration::from_millis(1000));
    }
}
