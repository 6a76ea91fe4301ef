// Frame Decoder - Reassembles newline-delimited records and parses events
//
// The transport delivers arbitrary chunks: a record may be split across
// several chunks and one chunk may hold many records. Complete records are
// `<source-tag><json>`; records for other sub-streams sharing the connection
// are skipped by tag.

use super::clock::Timestamp;
use super::event::{ColorSample, Event, SyncEdge};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// Source tag used by the VGA model
pub const DEFAULT_SOURCE_TAG: &str = "[displayvga]-";

/// Longest partial record kept while waiting for its terminator
pub const MAX_RECORD_LEN: usize = 64 * 1024;

const RECORD_TERMINATOR: u8 = b'\n';

/// Discriminants this decoder understands
const KNOWN_TYPES: [&str; 3] = ["hs", "vs", "rgb"];

/// Why a tagged record did not produce an event
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The payload is not valid JSON, or a required field is missing or mistyped
    #[error("malformed event: {0}")]
    MalformedEvent(#[from] serde_json::Error),

    /// The payload has no `type` field
    #[error("record has no 'type' field")]
    MissingType,

    /// The `type` field names an event kind this decoder does not know
    #[error("unknown event type '{0}'")]
    UnknownType(String),

    /// The record is not UTF-8 text
    #[error("record is not valid UTF-8")]
    InvalidUtf8,

    /// A record grew past [`MAX_RECORD_LEN`] without a terminator
    #[error("record exceeds {MAX_RECORD_LEN} bytes")]
    Oversized,
}

/// Outcome of decoding one complete record
#[derive(Debug)]
pub enum Decoded {
    /// A well-formed event for this sub-stream
    Event(Event),
    /// A record belonging to another sub-stream (no matching source tag)
    Foreign,
    /// A record for this sub-stream that was dropped
    Rejected(DecodeError),
}

/// Sync level as sent by the model: JSON bool, or 0/1 from C-side encoders
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireLevel {
    Bool(bool),
    Int(u64),
}

impl WireLevel {
    fn level(&self) -> bool {
        match *self {
            WireLevel::Bool(level) => level,
            WireLevel::Int(value) => value != 0,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum WireRecord {
    #[serde(rename = "hs")]
    HSync { value: WireLevel, timestamp: Timestamp },
    #[serde(rename = "vs")]
    VSync { value: WireLevel, timestamp: Timestamp },
    #[serde(rename = "rgb")]
    Color {
        r: u32,
        g: u32,
        b: u32,
        timestamp: Timestamp,
    },
}

impl From<WireRecord> for Event {
    fn from(record: WireRecord) -> Self {
        match record {
            WireRecord::HSync { value, timestamp } => Event::HSync(SyncEdge {
                level: value.level(),
                at: timestamp,
            }),
            WireRecord::VSync { value, timestamp } => Event::VSync(SyncEdge {
                level: value.level(),
                at: timestamp,
            }),
            WireRecord::Color { r, g, b, timestamp } => Event::Color(ColorSample {
                r,
                g,
                b,
                at: timestamp,
            }),
        }
    }
}

/// Parse a JSON payload (source tag already removed) into an event
///
/// The discriminant is checked before the fields, so a missing or unknown
/// `type` is reported as such rather than as a generic parse failure.
pub fn parse_payload(payload: &str) -> Result<Event, DecodeError> {
    let value: Value = serde_json::from_str(payload)?;

    match value.get("type") {
        None => return Err(DecodeError::MissingType),
        Some(Value::String(kind)) if KNOWN_TYPES.contains(&kind.as_str()) => {}
        Some(Value::String(kind)) => return Err(DecodeError::UnknownType(kind.clone())),
        Some(other) => return Err(DecodeError::UnknownType(other.to_string())),
    }

    let record: WireRecord = serde_json::from_value(value)?;
    Ok(record.into())
}

/// Stateful record reassembler and parser
#[derive(Debug)]
pub struct FrameDecoder {
    /// Source tag records of interest start with
    tag: Vec<u8>,
    /// Received bytes not yet consumed
    buffer: Vec<u8>,
    /// Start of the unconsumed region of `buffer`
    cursor: usize,
    /// Discarding bytes up to the next terminator after an oversized record
    skipping: bool,
}

impl FrameDecoder {
    /// Create a decoder that accepts records starting with `tag`
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into().into_bytes(),
            buffer: Vec::new(),
            cursor: 0,
            skipping: false,
        }
    }

    /// Source tag this decoder filters on
    pub fn tag(&self) -> &[u8] {
        &self.tag
    }

    /// Number of buffered bytes belonging to an incomplete record
    pub fn pending_len(&self) -> usize {
        self.buffer.len() - self.cursor
    }

    /// Append raw bytes from the transport
    pub fn push(&mut self, bytes: &[u8]) {
        if self.cursor > 0 {
            self.buffer.drain(..self.cursor);
            self.cursor = 0;
        }
        self.buffer.extend_from_slice(bytes);
    }

    /// Decode the next complete record, if one is buffered
    ///
    /// Returns `None` once only a partial record (or nothing) remains; the
    /// partial bytes are kept for the next [`push`](Self::push).
    pub fn next_frame(&mut self) -> Option<Decoded> {
        loop {
            let pending = &self.buffer[self.cursor..];
            let Some(end) = pending.iter().position(|&b| b == RECORD_TERMINATOR) else {
                if pending.len() > MAX_RECORD_LEN && !self.skipping {
                    self.cursor = self.buffer.len();
                    self.skipping = true;
                    return Some(Decoded::Rejected(DecodeError::Oversized));
                }
                if self.skipping {
                    self.cursor = self.buffer.len();
                }
                return None;
            };

            let start = self.cursor;
            self.cursor += end + 1;
            if self.skipping {
                // Tail of a record already reported as oversized
                self.skipping = false;
                continue;
            }

            let mut record = &self.buffer[start..start + end];
            if let Some(stripped) = record.strip_suffix(b"\r") {
                record = stripped;
            }
            return Some(decode_record(&self.tag, record));
        }
    }

    /// Iterate over every complete record currently buffered
    pub fn frames(&mut self) -> Frames<'_> {
        Frames { decoder: self }
    }

    /// Drop buffered bytes, including any partial record
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.cursor = 0;
        self.skipping = false;
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new(DEFAULT_SOURCE_TAG)
    }
}

/// Iterator returned by [`FrameDecoder::frames`]
pub struct Frames<'a> {
    decoder: &'a mut FrameDecoder,
}

impl Iterator for Frames<'_> {
    type Item = Decoded;

    fn next(&mut self) -> Option<Self::Item> {
        self.decoder.next_frame()
    }
}

fn decode_record(tag: &[u8], record: &[u8]) -> Decoded {
    let Some(payload) = record.strip_prefix(tag) else {
        return Decoded::Foreign;
    };
    let Ok(payload) = std::str::from_utf8(payload) else {
        return Decoded::Rejected(DecodeError::InvalidUtf8);
    };
    match parse_payload(payload) {
        Ok(event) => Decoded::Event(event),
        Err(err) => Decoded::Rejected(err),
    }
}
