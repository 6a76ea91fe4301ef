// Transport - Client connection with a dedicated reader thread
//
// The reader thread only moves bytes: it reads from the socket and pushes
// each chunk into a bounded channel, in order. When the channel is full the
// thread blocks, so back-pressure never drops data. All parsing happens on
// the consumer side.

use std::io::{self, Read};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info};

/// Size of the socket read buffer
pub const RECV_BUFFER_SIZE: usize = 256 * 1024;

/// What the reader thread hands to the consumer
#[derive(Debug)]
pub enum TransportEvent {
    /// A chunk of bytes, exactly as received
    Data(Vec<u8>),
    /// The peer closed the connection (or it was shut down locally)
    Closed,
    /// Reading failed; the reader has stopped
    Failed(io::Error),
}

/// Connection to the relay
///
/// Dropping the connection shuts it down and joins the reader thread.
#[derive(Debug)]
pub struct Connection {
    peer: SocketAddr,
    stream: TcpStream,
    receiver: Receiver<TransportEvent>,
    stop: Arc<AtomicBool>,
    reader: Option<JoinHandle<()>>,
}

impl Connection {
    /// Connect and start the reader thread
    ///
    /// # Arguments
    /// * `addr` - Relay address
    /// * `capacity` - Chunks buffered before the reader blocks (at least 1)
    pub fn connect(addr: impl ToSocketAddrs, capacity: usize) -> io::Result<Self> {
        let stream = TcpStream::connect(addr)?;
        let peer = stream.peer_addr()?;
        info!(%peer, "connected");
        Self::from_stream(stream, capacity)
    }

    /// Wrap an already connected stream
    pub fn from_stream(stream: TcpStream, capacity: usize) -> io::Result<Self> {
        let peer = stream.peer_addr()?;
        let reader_stream = stream.try_clone()?;
        let (sender, receiver) = mpsc::sync_channel(capacity.max(1));
        let stop = Arc::new(AtomicBool::new(false));

        let reader = thread::Builder::new()
            .name("vga-view-reader".to_string())
            .spawn({
                let stop = Arc::clone(&stop);
                move || read_loop(reader_stream, sender, stop)
            })?;

        Ok(Self {
            peer,
            stream,
            receiver,
            stop,
            reader: Some(reader),
        })
    }

    /// Address of the relay
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Independent write half for outbound records
    pub fn writer(&self) -> io::Result<TcpStream> {
        self.stream.try_clone()
    }

    /// Next event if one is queued, without blocking
    ///
    /// Returns `None` both when the queue is empty and after the reader has
    /// exited and everything was drained.
    pub fn try_recv(&self) -> Option<TransportEvent> {
        match self.receiver.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Block until the next event; `None` once the reader has exited
    pub fn recv(&self) -> Option<TransportEvent> {
        self.receiver.recv().ok()
    }

    /// Whether the reader thread is still running
    pub fn is_active(&self) -> bool {
        self.reader.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    /// Stop the reader and close the socket
    ///
    /// Sets the stop flag, shuts the socket down both ways, discards
    /// anything still queued and joins the reader thread. Idempotent.
    pub fn shutdown(&mut self) {
        let Some(reader) = self.reader.take() else {
            return;
        };

        self.stop.store(true, Ordering::Release);
        if let Err(err) = self.stream.shutdown(Shutdown::Both) {
            debug!(error = %err, "socket shutdown");
        }

        // Unblocks a reader waiting on a full channel; ends once it drops its sender
        while self.receiver.recv().is_ok() {}

        if reader.join().is_err() {
            error!("reader thread panicked");
        }
        info!(peer = %self.peer, "disconnected");
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn read_loop(mut stream: TcpStream, sender: SyncSender<TransportEvent>, stop: Arc<AtomicBool>) {
    let mut buffer = vec![0u8; RECV_BUFFER_SIZE];
    loop {
        match stream.read(&mut buffer) {
            Ok(0) => {
                let _ = sender.send(TransportEvent::Closed);
                break;
            }
            Ok(n) => {
                if stop.load(Ordering::Acquire) {
                    break;
                }
                if sender.send(TransportEvent::Data(buffer[..n].to_vec())).is_err() {
                    break;
                }
            }
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => {
                let event = if stop.load(Ordering::Acquire) {
                    TransportEvent::Closed
                } else {
                    error!(error = %err, "transport read failed");
                    TransportEvent::Failed(err)
                };
                let _ = sender.send(event);
                break;
            }
        }
    }
    debug!("reader thread exiting");
}
