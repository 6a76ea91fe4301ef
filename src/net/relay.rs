// Relay - N-to-N broadcast server between simulation models and viewers
//
// Every chunk received from one peer is written verbatim to every other
// connected peer. The relay never looks at the bytes, so records may be
// split or merged arbitrarily on the way through.
//
// Each peer has a reader thread and a writer thread fed by a bounded queue.
// Forwarding only touches the peer list to clone queue handles, so a peer
// that stops reading holds up nobody but the senders feeding its full queue,
// and only until its socket write times out and it is dropped.

use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Default maximum number of concurrent peers
pub const DEFAULT_MAX_CLIENTS: usize = 5;

/// How long a peer may refuse data before it is disconnected
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(2);

const CHUNK_SIZE: usize = 64 * 1024;

/// Chunks queued per peer before senders wait
const OUTBOX_DEPTH: usize = 64;

type Chunk = Arc<[u8]>;

/// Errors that can occur while running the relay
#[derive(Debug, Error)]
pub enum RelayError {
    /// The listening socket could not be created
    #[error("cannot listen on {addr}: {source}")]
    Bind {
        /// Requested address
        addr: String,
        /// Underlying error
        source: io::Error,
    },

    /// Socket error on the listener
    #[error("relay I/O error: {0}")]
    Io(#[from] io::Error),

    /// The accept thread panicked
    #[error("relay thread panicked")]
    ThreadPanicked,
}

struct Peer {
    id: u64,
    addr: SocketAddr,
    stream: TcpStream,
    outbox: SyncSender<Chunk>,
}

type PeerList = Arc<Mutex<Vec<Peer>>>;

fn lock(peers: &PeerList) -> MutexGuard<'_, Vec<Peer>> {
    peers.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Broadcast relay bound to a local address
pub struct Relay {
    listener: TcpListener,
    local_addr: SocketAddr,
    max_clients: usize,
    write_timeout: Duration,
    peers: PeerList,
    stop: Arc<AtomicBool>,
    next_id: AtomicU64,
}

impl Relay {
    /// Bind the listening socket
    ///
    /// # Arguments
    /// * `addr` - Address to listen on (port 0 picks a free port)
    /// * `max_clients` - Concurrent peers; connections beyond this are closed
    pub fn bind(addr: impl ToSocketAddrs + ToString, max_clients: usize) -> Result<Self, RelayError> {
        let listener = TcpListener::bind(&addr).map_err(|source| RelayError::Bind {
            addr: addr.to_string(),
            source,
        })?;
        let local_addr = listener.local_addr()?;
        info!(%local_addr, max_clients, "relay listening");

        Ok(Self {
            listener,
            local_addr,
            max_clients: max_clients.max(1),
            write_timeout: DEFAULT_WRITE_TIMEOUT,
            peers: Arc::new(Mutex::new(Vec::new())),
            stop: Arc::new(AtomicBool::new(false)),
            next_id: AtomicU64::new(0),
        })
    }

    /// Set how long a peer may refuse data before it is disconnected
    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout.max(Duration::from_millis(1));
        self
    }

    /// Address the relay is listening on
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Accept and serve peers until stopped
    ///
    /// Blocks the calling thread. Returns after [`RelayHandle::stop`] or an
    /// accept error.
    pub fn serve(self) -> Result<(), RelayError> {
        let mut workers: Vec<JoinHandle<()>> = Vec::new();

        let result = loop {
            let (stream, addr) = match self.listener.accept() {
                Ok(accepted) => accepted,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => break Err(RelayError::Io(err)),
            };
            if self.stop.load(Ordering::Acquire) {
                break Ok(());
            }
            workers.retain(|worker| !worker.is_finished());

            if let Err(err) = self.admit(stream, addr, &mut workers) {
                warn!(%addr, error = %err, "could not admit peer");
            }
        };

        // Dropping the queues ends the writers; the shutdown ends the readers
        for peer in lock(&self.peers).drain(..) {
            let _ = peer.stream.shutdown(Shutdown::Both);
        }
        for worker in workers {
            if worker.join().is_err() {
                error!("peer thread panicked");
            }
        }
        info!(local_addr = %self.local_addr, "relay stopped");
        result
    }

    /// Serve on a background thread
    pub fn spawn(self) -> Result<RelayHandle, RelayError> {
        let local_addr = self.local_addr;
        let peers = Arc::clone(&self.peers);
        let stop = Arc::clone(&self.stop);
        let thread = thread::Builder::new()
            .name("vga-view-relay".to_string())
            .spawn(move || self.serve())?;

        Ok(RelayHandle {
            local_addr,
            peers,
            stop,
            thread: Some(thread),
        })
    }

    fn admit(
        &self,
        stream: TcpStream,
        addr: SocketAddr,
        workers: &mut Vec<JoinHandle<()>>,
    ) -> io::Result<()> {
        let mut peers = lock(&self.peers);
        if peers.len() >= self.max_clients {
            warn!(%addr, max_clients = self.max_clients, "relay full, closing connection");
            let _ = stream.shutdown(Shutdown::Both);
            return Ok(());
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let reader = stream.try_clone()?;
        let writer = stream.try_clone()?;
        writer.set_write_timeout(Some(self.write_timeout))?;
        let (outbox, inbox) = mpsc::sync_channel(OUTBOX_DEPTH);
        peers.push(Peer {
            id,
            addr,
            stream,
            outbox,
        });
        info!(%addr, peers = peers.len(), "peer connected");
        drop(peers);

        let spawned = self.spawn_peer_threads(id, addr, reader, writer, inbox);
        match spawned {
            Ok((read_worker, write_worker)) => {
                workers.push(read_worker);
                workers.push(write_worker);
                Ok(())
            }
            Err(err) => {
                disconnect(&self.peers, id);
                Err(err)
            }
        }
    }

    fn spawn_peer_threads(
        &self,
        id: u64,
        addr: SocketAddr,
        reader: TcpStream,
        writer: TcpStream,
        inbox: Receiver<Chunk>,
    ) -> io::Result<(JoinHandle<()>, JoinHandle<()>)> {
        let peers = Arc::clone(&self.peers);
        let write_worker = thread::Builder::new()
            .name(format!("vga-view-peer-{id}-tx"))
            .spawn(move || write_loop(id, addr, writer, inbox, peers))?;

        let peers = Arc::clone(&self.peers);
        let read_worker = thread::Builder::new()
            .name(format!("vga-view-peer-{id}-rx"))
            .spawn(move || forward_loop(id, addr, reader, peers))?;
        Ok((read_worker, write_worker))
    }
}

/// Read from one peer and broadcast to the others until it disconnects
fn forward_loop(id: u64, addr: SocketAddr, mut stream: TcpStream, peers: PeerList) {
    let mut buffer = vec![0u8; CHUNK_SIZE];
    loop {
        let n = match stream.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => {
                debug!(%addr, error = %err, "peer read failed");
                break;
            }
        };
        debug!(%addr, bytes = n, "forwarding chunk");
        broadcast(id, Chunk::from(&buffer[..n]), &peers);
    }

    disconnect(&peers, id);
    info!(%addr, "peer closed");
}

/// Queue `chunk` for every peer except `from`
///
/// The peer list is only locked to clone the queue handles. Waiting on a
/// full queue ends when its writer drains it or gives up on the peer.
fn broadcast(from: u64, chunk: Chunk, peers: &PeerList) {
    let targets: Vec<(u64, SyncSender<Chunk>)> = lock(peers)
        .iter()
        .filter(|peer| peer.id != from)
        .map(|peer| (peer.id, peer.outbox.clone()))
        .collect();

    for (id, outbox) in targets {
        if outbox.send(Arc::clone(&chunk)).is_err() {
            disconnect(peers, id);
        }
    }
}

/// Drain one peer's queue onto its socket until the peer goes away
fn write_loop(
    id: u64,
    addr: SocketAddr,
    mut stream: TcpStream,
    inbox: Receiver<Chunk>,
    peers: PeerList,
) {
    for chunk in inbox {
        if let Err(err) = stream.write_all(&chunk) {
            match err.kind() {
                io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => {
                    warn!(%addr, "peer stopped reading, dropping it")
                }
                _ => warn!(%addr, error = %err, "dropping peer after write error"),
            }
            break;
        }
    }
    let _ = stream.shutdown(Shutdown::Both);
    disconnect(&peers, id);
}

/// Remove a peer and close its socket; both of its threads then exit
fn disconnect(peers: &PeerList, id: u64) {
    let removed = {
        let mut peers = lock(peers);
        peers
            .iter()
            .position(|peer| peer.id == id)
            .map(|index| peers.swap_remove(index))
    };
    if let Some(peer) = removed {
        let _ = peer.stream.shutdown(Shutdown::Both);
    }
}

/// Control handle for a relay running on a background thread
pub struct RelayHandle {
    local_addr: SocketAddr,
    peers: PeerList,
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<Result<(), RelayError>>>,
}

impl RelayHandle {
    /// Address the relay is listening on
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Number of currently connected peers
    pub fn peer_count(&self) -> usize {
        lock(&self.peers).len()
    }

    /// Stop accepting, disconnect all peers and join the relay thread
    pub fn stop(mut self) -> Result<(), RelayError> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<(), RelayError> {
        let Some(thread) = self.thread.take() else {
            return Ok(());
        };
        self.stop.store(true, Ordering::Release);
        // Wake the blocking accept
        let _ = TcpStream::connect(self.local_addr);
        thread.join().map_err(|_| RelayError::ThreadPanicked)?
    }
}

impl Drop for RelayHandle {
    fn drop(&mut self) {
        if let Err(err) = self.shutdown() {
            error!(error = %err, "relay shutdown failed");
        }
    }
}
