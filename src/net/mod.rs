// Network module - TCP plumbing between the simulation, the relay and viewers
//
// This module provides:
// - A client connection with a background reader thread feeding a bounded channel
// - The N-to-N broadcast relay that forwards raw bytes between peers

pub mod relay;
pub mod transport;

pub use relay::{Relay, RelayError, RelayHandle, DEFAULT_MAX_CLIENTS};
pub use transport::{Connection, TransportEvent, RECV_BUFFER_SIZE};
