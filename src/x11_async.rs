//! X11 event source
//!
//! A poller thread watches the connection socket with mio and wakes the
//! async main loop. Events are handed out in batches: pending requests are
//! flushed first, then everything x11rb has buffered is drained, and the
//! loop only sleeps once nothing is left.

use std::io;
use std::os::unix::io::AsRawFd;
use std::sync::Arc;

use anyhow::{Context, Result};
use mio::unix::SourceFd;
use mio::{Events, Interest, Poll, Token, Waker};
use tokio::sync::Notify;
use tracing::{debug, trace, warn};
use x11rb::connection::Connection;
use x11rb::protocol::Event;
use x11rb::rust_connection::RustConnection;

const SOCKET: Token = Token(0);
const SHUTDOWN: Token = Token(1);

pub struct X11EventStream {
    conn: Arc<RustConnection>,
    readable: Arc<Notify>,
    /// Stops the poller thread when the stream goes away
    shutdown: Waker,
}

impl X11EventStream {
    pub fn new(conn: Arc<RustConnection>) -> Result<Self> {
        let fd = conn.stream().as_raw_fd();
        let poll = Poll::new().context("Failed to create mio Poll")?;
        poll.registry()
            .register(&mut SourceFd(&fd), SOCKET, Interest::READABLE)
            .context("Failed to register X11 socket with mio")?;
        let shutdown = Waker::new(poll.registry(), SHUTDOWN).context("Failed to create poll waker")?;

        let readable = Arc::new(Notify::new());
        let notify = readable.clone();
        std::thread::Builder::new()
            .name("x11-poll".into())
            .spawn(move || watch_socket(poll, notify))
            .context("Failed to spawn X11 poll thread")?;

        Ok(Self { conn, readable, shutdown })
    }

    /// Flush our requests, then return every buffered event. Waits for the
    /// socket to turn readable only when nothing is buffered.
    pub async fn next_batch(&self) -> Result<Vec<Event>> {
        let conn = self.conn.as_ref();
        loop {
            conn.flush()?;
            let mut batch = Vec::new();
            while let Some(event) = conn.poll_for_event()? {
                batch.push(event);
            }
            if !batch.is_empty() {
                trace!("{} X11 events", batch.len());
                return Ok(batch);
            }
            self.readable.notified().await;
        }
    }
}

impl Drop for X11EventStream {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown.wake() {
            warn!("Failed to stop X11 poll thread: {}", e);
        }
    }
}

/// Poller thread body. A stored `Notify` permit covers readiness that
/// arrives while the main loop is busy routing.
fn watch_socket(mut poll: Poll, readable: Arc<Notify>) {
    let mut events = Events::with_capacity(4);
    loop {
        match poll.poll(&mut events, None) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                warn!("X11 socket poll failed: {}", e);
                // Let the main loop find the broken connection on its next flush.
                readable.notify_one();
                return;
            }
        }
        for event in events.iter() {
            match event.token() {
                SOCKET => readable.notify_one(),
                SHUTDOWN => {
                    debug!("X11 poll thread stopping");
                    return;
                }
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::os::unix::net::UnixStream;
    use std::time::Duration;

    fn poller(fd: &std::os::unix::io::RawFd) -> (Poll, Waker) {
        let poll = Poll::new().unwrap();
        poll.registry()
            .register(&mut SourceFd(fd), SOCKET, Interest::READABLE)
            .unwrap();
        let waker = Waker::new(poll.registry(), SHUTDOWN).unwrap();
        (poll, waker)
    }

    #[tokio::test]
    async fn test_readable_socket_wakes_loop() {
        let (mut writer, reader) = UnixStream::pair().unwrap();
        let (poll, waker) = poller(&reader.as_raw_fd());
        let readable = Arc::new(Notify::new());
        let thread = std::thread::spawn({
            let readable = readable.clone();
            move || watch_socket(poll, readable)
        });

        writer.write_all(b"x").unwrap();
        let woke = tokio::time::timeout(Duration::from_secs(5), readable.notified()).await;
        assert!(woke.is_ok());

        waker.wake().unwrap();
        thread.join().unwrap();
    }

    #[test]
    fn test_poller_stops_on_shutdown() {
        let (_writer, reader) = UnixStream::pair().unwrap();
        let (poll, waker) = poller(&reader.as_raw_fd());
        let thread = std::thread::spawn(move || watch_socket(poll, Arc::new(Notify::new())));
        waker.wake().unwrap();
        thread.join().unwrap();
    }
}
