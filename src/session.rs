// Session - Consumer side of a live connection
//
// Drains transport events from the reader thread and feeds them to the
// engine. The session is the only code that touches the engine, so the
// engine itself stays lock-free.

use crate::config::ViewerConfig;
use crate::display::Framebuffer;
use crate::engine::{EngineStats, IngestReport, ReconstructionEngine};
use crate::net::{Connection, TransportEvent};
use std::io;
use std::net::TcpStream;
use thiserror::Error;
use tracing::{error, info, warn};

/// Errors that can occur while opening a session
#[derive(Debug, Error)]
pub enum SessionError {
    /// The configuration does not describe a valid raster
    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),

    /// The relay could not be reached
    #[error("cannot connect to {endpoint}: {source}")]
    Connect {
        /// Relay endpoint
        endpoint: String,
        /// Underlying error
        source: io::Error,
    },
}

/// What one [`Session::pump`] call did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PumpReport {
    /// Byte chunks consumed
    pub chunks: usize,
    /// Events applied
    pub events: u32,
    /// Records dropped as undecodable
    pub dropped: u32,
    /// Whether the redraw cadence elapsed
    pub redraw_due: bool,
    /// Whether the transport closed during this call
    pub closed: bool,
}

/// How a headless run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadlessOutcome {
    /// The relay closed the connection
    Closed,
    /// The event limit was reached
    LimitReached,
    /// Reading from the relay failed
    Failed,
}

/// A connected engine
///
/// Fields drop in order: the reader thread is joined before the engine goes.
pub struct Session {
    connection: Connection,
    engine: ReconstructionEngine,
    closed: bool,
}

impl Session {
    /// Pair an engine with an open connection
    pub fn new(engine: ReconstructionEngine, connection: Connection) -> Self {
        Self {
            connection,
            engine,
            closed: false,
        }
    }

    /// Build the engine from `config` and connect to its relay
    pub fn connect(config: &ViewerConfig) -> Result<Self, SessionError> {
        let geometry = config.geometry()?;
        let engine = ReconstructionEngine::new(geometry, config.connection.source_tag.clone())
            .with_redraw_every(config.display.redraw_every);

        let endpoint = config.connection.endpoint();
        let connection = Connection::connect(endpoint.as_str(), config.connection.channel_capacity)
            .map_err(|source| SessionError::Connect { endpoint, source })?;

        Ok(Self::new(engine, connection))
    }

    /// Consume up to `budget` queued chunks without blocking
    pub fn pump(&mut self, budget: usize) -> PumpReport {
        let mut report = PumpReport::default();
        if self.closed {
            return report;
        }

        while report.chunks < budget {
            let Some(event) = self.connection.try_recv() else {
                break;
            };
            report.chunks += 1;
            match self.handle(event) {
                Some(ingest) => {
                    report.events += ingest.events;
                    report.dropped += ingest.dropped;
                    report.redraw_due |= ingest.redraw_due;
                }
                None => {
                    report.closed = true;
                    break;
                }
            }
        }
        report
    }

    /// Block on the transport until it closes or `limit` events were applied
    pub fn run_headless(&mut self, limit: Option<u64>) -> HeadlessOutcome {
        loop {
            if limit.is_some_and(|limit| self.engine.stats().events >= limit) {
                return HeadlessOutcome::LimitReached;
            }
            let Some(event) = self.connection.recv() else {
                self.closed = true;
                return HeadlessOutcome::Closed;
            };
            let failed = matches!(event, TransportEvent::Failed(_));
            if self.handle(event).is_none() {
                return if failed {
                    HeadlessOutcome::Failed
                } else {
                    HeadlessOutcome::Closed
                };
            }
        }
    }

    /// Apply one transport event; `None` once the transport has ended
    fn handle(&mut self, event: TransportEvent) -> Option<IngestReport> {
        match event {
            TransportEvent::Data(bytes) => Some(self.engine.ingest(&bytes)),
            TransportEvent::Closed => {
                info!(peer = %self.connection.peer_addr(), "relay closed the connection");
                self.finish();
                None
            }
            TransportEvent::Failed(err) => {
                error!(error = %err, "connection lost");
                self.finish();
                None
            }
        }
    }

    fn finish(&mut self) {
        self.closed = true;
        if self.engine.pending_bytes() > 0 {
            warn!(
                bytes = self.engine.pending_bytes(),
                "discarding incomplete record at end of stream"
            );
        }
    }

    /// Whether the transport has ended
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// The engine being fed
    pub fn engine(&self) -> &ReconstructionEngine {
        &self.engine
    }

    /// Copy of the current picture
    pub fn snapshot(&self) -> Framebuffer {
        self.engine.snapshot()
    }

    /// Engine totals
    pub fn stats(&self) -> EngineStats {
        self.engine.stats()
    }

    /// Write half of the connection, for outbound records
    pub fn writer(&self) -> io::Result<TcpStream> {
        self.connection.writer()
    }

    /// Close the connection and keep the engine with its last picture
    pub fn into_engine(mut self) -> ReconstructionEngine {
        self.connection.shutdown();
        self.engine
    }
}
