//! Protocol constants: packet opcodes and revision gates.

use crate::{Error, Result};

/// Name this client advertises in the Hello packet.
pub const CLIENT_NAME: &str = "clickhouse-conn";

/// Client version, sent in Hello and in the query client-info block.
pub const CLIENT_VERSION_MAJOR: u64 = 1;
/// Minor part of the advertised client version.
pub const CLIENT_VERSION_MINOR: u64 = 1;
/// Protocol revision advertised by this client.
pub const CLIENT_REVISION: u64 = 54126;

/// Servers at or above this revision exchange a temporary-table name before
/// each data block.
pub const DBMS_MIN_REVISION_WITH_TEMPORARY_TABLES: u64 = 50264;
/// Servers at or above this revision include total rows in Progress packets.
pub const DBMS_MIN_REVISION_WITH_TOTAL_ROWS_IN_PROGRESS: u64 = 51554;
/// Servers at or above this revision prefix data blocks with a block-info
/// header.
pub const DBMS_MIN_REVISION_WITH_BLOCK_INFO: u64 = 51903;
/// Servers at or above this revision expect a client-info block in Query.
pub const DBMS_MIN_REVISION_WITH_CLIENT_INFO: u64 = 54032;
/// Servers at or above this revision send their timezone in Hello.
pub const DBMS_MIN_REVISION_WITH_SERVER_TIMEZONE: u64 = 54058;
/// Servers at or above this revision expect a quota key in client-info.
pub const DBMS_MIN_REVISION_WITH_QUOTA_KEY_IN_CLIENT_INFO: u64 = 54060;

/// Types of packets sent by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u64)]
pub enum ClientCode {
    /// Client handshake containing name, version, and default database.
    Hello = 0,
    /// Query packet with query id, client info, stage, compression, and
    /// query text.
    Query = 1,
    /// Data block (e.g. INSERT data).
    Data = 2,
    /// Ping the server to check the connection is alive.
    Ping = 4,
}

/// Types of packets received from the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u64)]
pub enum ServerCode {
    /// Server handshake response containing name, version, and revision.
    Hello = 0,
    /// Block of data.
    Data = 1,
    /// Exception that occurred during query execution.
    Exception = 2,
    /// Query execution progress: rows and bytes read.
    Progress = 3,
    /// Response to a client Ping request.
    Pong = 4,
    /// Signals that all packets for the current operation have been sent.
    EndOfStream = 5,
    /// Profiling data for query execution.
    ProfileInfo = 6,
    /// Block of totals.
    Totals = 7,
    /// Block of extremes (mins and maxs).
    Extremes = 8,
}

impl TryFrom<u64> for ServerCode {
    type Error = Error;

    fn try_from(value: u64) -> Result<Self> {
        match value {
            0 => Ok(ServerCode::Hello),
            1 => Ok(ServerCode::Data),
            2 => Ok(ServerCode::Exception),
            3 => Ok(ServerCode::Progress),
            4 => Ok(ServerCode::Pong),
            5 => Ok(ServerCode::EndOfStream),
            6 => Ok(ServerCode::ProfileInfo),
            7 => Ok(ServerCode::Totals),
            8 => Ok(ServerCode::Extremes),
            _ => Err(Error::Protocol(format!("Unknown server code: {}", value))),
        }
    }
}

/// Whether blocks of data are compressed on the wire.
///
/// This client always negotiates `Disable`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u64)]
pub enum CompressionState {
    /// Block compression is disabled.
    Disable = 0,
    /// Block compression is enabled.
    Enable = 1,
}

/// Query processing stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u64)]
pub enum Stage {
    /// Fully process the query and return the final result.
    Complete = 2,
}
