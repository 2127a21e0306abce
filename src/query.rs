//! Query envelope and the server-side metadata frames.

use std::fmt;

/// A query about to be sent: its SQL text and wire id.
#[derive(Debug, Clone)]
pub struct Query {
    text: String,
    id: String,
}

impl Query {
    /// Wrap SQL text with a fresh random 64-bit query id.
    pub fn new(text: impl Into<String>) -> Self {
        // Derived from a v4 UUID; the server only needs uniqueness.
        let id = format!("{:016x}", uuid::Uuid::new_v4().as_u128() as u64);
        Self {
            text: text.into(),
            id,
        }
    }

    /// The SQL text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The query id sent on the wire.
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl From<&str> for Query {
    fn from(s: &str) -> Self {
        Query::new(s)
    }
}

impl From<String> for Query {
    fn from(s: String) -> Self {
        Query::new(s)
    }
}

/// Server identity established by the handshake.
///
/// The revision gates which optional fields appear on the wire for the rest
/// of the connection's life.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServerInfo {
    /// Server display name, e.g. "ClickHouse".
    pub name: String,
    /// Major version.
    pub version_major: u64,
    /// Minor version.
    pub version_minor: u64,
    /// Protocol revision advertised by the server.
    pub revision: u64,
    /// Server timezone, present for revisions that send it.
    pub timezone: Option<String>,
}

/// An exception reported by the server.
#[derive(Debug, Clone, PartialEq)]
pub struct Exception {
    /// ClickHouse error code.
    pub code: u32,
    /// Exception class name, e.g. "DB::Exception".
    pub name: String,
    /// Human-readable message.
    pub display_text: String,
    /// Server-side stack trace.
    pub stack_trace: String,
    /// Chained cause, if the server attached one.
    pub nested: Option<Box<Exception>>,
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code {}): {}", self.name, self.code, self.display_text)?;
        if let Some(nested) = &self.nested {
            write!(f, "; caused by: {}", nested)?;
        }
        Ok(())
    }
}

/// Query execution progress.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Progress {
    /// Rows read so far.
    pub rows: u64,
    /// Bytes read so far.
    pub bytes: u64,
    /// Estimated total rows, when the server's revision sends it.
    pub total_rows: Option<u64>,
}

/// Post-query profiling counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProfileInfo {
    /// Rows produced.
    pub rows: u64,
    /// Blocks produced.
    pub blocks: u64,
    /// Bytes produced.
    pub bytes: u64,
    /// Whether a LIMIT was applied.
    pub applied_limit: bool,
    /// Row count before the LIMIT.
    pub rows_before_limit: u64,
    /// Whether `rows_before_limit` was actually calculated.
    pub calculated_rows_before_limit: bool,
}
