//! Message codec: outbound frame encoder and the streaming inbound decoder.
//!
//! The decoder is byte-to-message: it parses the next frame on a copy of
//! the read cursor and only commits consumed bytes on success. A partial
//! payload yields `Ok(None)` and the caller waits for more bytes; malformed
//! data and unknown opcodes are fatal protocol errors.

use crate::block::{Block, BlockInfo};
use crate::column::{Column, ColumnData};
use crate::protocol::{
    ClientCode, CompressionState, ServerCode, Stage, CLIENT_NAME, CLIENT_REVISION,
    CLIENT_VERSION_MAJOR, CLIENT_VERSION_MINOR, DBMS_MIN_REVISION_WITH_BLOCK_INFO,
    DBMS_MIN_REVISION_WITH_CLIENT_INFO, DBMS_MIN_REVISION_WITH_QUOTA_KEY_IN_CLIENT_INFO,
    DBMS_MIN_REVISION_WITH_SERVER_TIMEZONE, DBMS_MIN_REVISION_WITH_TEMPORARY_TABLES,
    DBMS_MIN_REVISION_WITH_TOTAL_ROWS_IN_PROGRESS,
};
use crate::query::{Exception, ProfileInfo, Progress, Query, ServerInfo};
use crate::types::Type;
use crate::wire::{self, DecodeError, DecodeResult};
use crate::{Error, Result};
use bytes::{Buf, BufMut, BytesMut};
use tracing::trace;

/// Interface type written in the client-info block: 1 = TCP.
const INTERFACE_TCP: u8 = 1;
/// Query kind written in the client-info block: 1 = initial query.
const QUERY_KIND_INITIAL: u8 = 1;

/// A decoded inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerPacket {
    /// Handshake response.
    Hello(ServerInfo),
    /// A data block.
    Data(Block),
    /// A server-side exception.
    Exception(Exception),
    /// Progress counters for the running query.
    Progress(Progress),
    /// Reply to Ping.
    Pong,
    /// All packets for the current operation have been sent.
    EndOfStream,
    /// Profiling counters for the finished query.
    ProfileInfo(ProfileInfo),
}

/// Encode the client Hello handshake.
pub fn encode_hello(buffer: &mut BytesMut, database: &str, user: &str, password: &str) {
    wire::write_varint64(buffer, ClientCode::Hello as u64);
    wire::write_string(buffer, CLIENT_NAME);
    wire::write_varint64(buffer, CLIENT_VERSION_MAJOR);
    wire::write_varint64(buffer, CLIENT_VERSION_MINOR);
    wire::write_varint64(buffer, CLIENT_REVISION);
    wire::write_string(buffer, database);
    wire::write_string(buffer, user);
    wire::write_string(buffer, password);
}

/// Encode a Query frame followed by the empty block that ends the query
/// preamble.
pub fn encode_query(buffer: &mut BytesMut, query: &Query, revision: u64) -> Result<()> {
    wire::write_varint64(buffer, ClientCode::Query as u64);
    wire::write_string(buffer, query.id());

    if revision >= DBMS_MIN_REVISION_WITH_CLIENT_INFO {
        buffer.put_u8(QUERY_KIND_INITIAL);
        wire::write_string(buffer, ""); // initial user
        wire::write_string(buffer, ""); // initial query id
        wire::write_string(buffer, ""); // initial address
        buffer.put_u8(INTERFACE_TCP);
        wire::write_string(buffer, ""); // os user
        wire::write_string(buffer, ""); // client hostname
        wire::write_string(buffer, CLIENT_NAME);
        wire::write_varint64(buffer, CLIENT_VERSION_MAJOR);
        wire::write_varint64(buffer, CLIENT_VERSION_MINOR);
        wire::write_varint64(buffer, CLIENT_REVISION);
        if revision >= DBMS_MIN_REVISION_WITH_QUOTA_KEY_IN_CLIENT_INFO {
            wire::write_string(buffer, ""); // quota key
        }
    }

    wire::write_string(buffer, ""); // end of settings
    wire::write_varint64(buffer, Stage::Complete as u64);
    wire::write_varint64(buffer, CompressionState::Disable as u64);
    wire::write_string(buffer, query.text());

    // An empty data block marks the end of the query preamble.
    encode_data(buffer, &Block::new(), revision)
}

/// Encode a Data frame carrying `block`.
pub fn encode_data(buffer: &mut BytesMut, block: &Block, revision: u64) -> Result<()> {
    wire::write_varint64(buffer, ClientCode::Data as u64);
    write_block_body(buffer, block, revision)
}

/// Encode a Ping frame.
pub fn encode_ping(buffer: &mut BytesMut) {
    wire::write_varint64(buffer, ClientCode::Ping as u64);
}

/// Serialize a block without the leading opcode; shared by the encoder and
/// the decoder tests.
pub fn write_block_body(buffer: &mut BytesMut, block: &Block, revision: u64) -> Result<()> {
    if revision >= DBMS_MIN_REVISION_WITH_TEMPORARY_TABLES {
        wire::write_string(buffer, "");
    }
    if revision >= DBMS_MIN_REVISION_WITH_BLOCK_INFO {
        wire::write_varint64(buffer, 1);
        buffer.put_u8(block.info().is_overflows);
        wire::write_varint64(buffer, 2);
        buffer.put_i32_le(block.info().bucket_num);
        wire::write_varint64(buffer, 0);
    }

    wire::write_varint64(buffer, block.column_count() as u64);
    wire::write_varint64(buffer, block.row_count() as u64);

    for column in block.columns() {
        wire::write_string(buffer, column.name());
        wire::write_string(buffer, &column.column_type().to_string());
        column.data().save_to_buffer(column.column_type(), buffer)?;
    }
    Ok(())
}

/// Streaming decoder from raw bytes to [`ServerPacket`]s.
///
/// The revision gates are taken from the server Hello, which the decoder
/// itself observes; until then only Hello and Exception frames are
/// expected on the wire.
#[derive(Debug, Default)]
pub struct PacketDecoder {
    revision: u64,
}

impl PacketDecoder {
    /// New decoder with no negotiated revision yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Negotiated server revision, zero before the handshake completes.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Try to decode one frame from `buffer`. Returns `Ok(None)` when the
    /// buffered bytes end mid-frame; consumed bytes are only committed on a
    /// full frame.
    pub fn decode(&mut self, buffer: &mut BytesMut) -> Result<Option<ServerPacket>> {
        if buffer.is_empty() {
            return Ok(None);
        }

        let mut cursor: &[u8] = &buffer[..];
        match self.parse_packet(&mut cursor) {
            Ok(packet) => {
                let consumed = buffer.len() - cursor.len();
                buffer.advance(consumed);
                trace!(consumed, "decoded server packet");
                if let ServerPacket::Hello(info) = &packet {
                    self.revision = info.revision;
                }
                Ok(Some(packet))
            }
            Err(DecodeError::Incomplete) => Ok(None),
            Err(DecodeError::Corrupt(e)) => Err(e),
        }
    }

    fn parse_packet(&self, cursor: &mut &[u8]) -> DecodeResult<ServerPacket> {
        let opcode = wire::read_varint64(cursor)?;
        let code = ServerCode::try_from(opcode).map_err(DecodeError::Corrupt)?;

        match code {
            ServerCode::Hello => Ok(ServerPacket::Hello(self.parse_hello(cursor)?)),
            ServerCode::Data => Ok(ServerPacket::Data(self.parse_block(cursor)?)),
            ServerCode::Exception => {
                Ok(ServerPacket::Exception(parse_exception(cursor)?))
            }
            ServerCode::Progress => Ok(ServerPacket::Progress(self.parse_progress(cursor)?)),
            ServerCode::Pong => Ok(ServerPacket::Pong),
            ServerCode::EndOfStream => Ok(ServerPacket::EndOfStream),
            ServerCode::ProfileInfo => {
                Ok(ServerPacket::ProfileInfo(parse_profile_info(cursor)?))
            }
            ServerCode::Totals | ServerCode::Extremes => {
                Err(DecodeError::Corrupt(Error::Protocol(format!(
                    "{:?} blocks are not supported",
                    code
                ))))
            }
        }
    }

    fn parse_hello(&self, cursor: &mut &[u8]) -> DecodeResult<ServerInfo> {
        let name = wire::read_string(cursor)?;
        let version_major = wire::read_varint64(cursor)?;
        let version_minor = wire::read_varint64(cursor)?;
        let revision = wire::read_varint64(cursor)?;
        let timezone = if revision >= DBMS_MIN_REVISION_WITH_SERVER_TIMEZONE {
            Some(wire::read_string(cursor)?)
        } else {
            None
        };

        Ok(ServerInfo {
            name,
            version_major,
            version_minor,
            revision,
            timezone,
        })
    }

    fn parse_block(&self, cursor: &mut &[u8]) -> DecodeResult<Block> {
        if self.revision >= DBMS_MIN_REVISION_WITH_TEMPORARY_TABLES {
            let _table_name = wire::read_string(cursor)?;
        }

        let mut block = Block::new();
        if self.revision >= DBMS_MIN_REVISION_WITH_BLOCK_INFO {
            let _field1 = wire::read_varint64(cursor)?;
            let is_overflows = wire::read_u8(cursor)?;
            let _field2 = wire::read_varint64(cursor)?;
            let bucket_num = wire::read_i32(cursor)?;
            let _terminator = wire::read_varint64(cursor)?;
            block.set_info(BlockInfo {
                is_overflows,
                bucket_num,
            });
        }

        let num_columns = wire::read_varint64(cursor)? as usize;
        let num_rows = wire::read_varint64(cursor)? as usize;

        for _ in 0..num_columns {
            let name = wire::read_string(cursor)?;
            let type_name = wire::read_string(cursor)?;
            let column_type = Type::parse(&type_name).map_err(DecodeError::Corrupt)?;
            let data = ColumnData::load_from_buffer(&column_type, cursor, num_rows)?;
            let column =
                Column::with_type(name, column_type, data).map_err(DecodeError::Corrupt)?;
            block.append_column(column).map_err(DecodeError::Corrupt)?;
        }

        Ok(block)
    }

    fn parse_progress(&self, cursor: &mut &[u8]) -> DecodeResult<Progress> {
        let rows = wire::read_varint64(cursor)?;
        let bytes = wire::read_varint64(cursor)?;
        let total_rows = if self.revision >= DBMS_MIN_REVISION_WITH_TOTAL_ROWS_IN_PROGRESS {
            Some(wire::read_varint64(cursor)?)
        } else {
            None
        };

        Ok(Progress {
            rows,
            bytes,
            total_rows,
        })
    }
}

fn parse_exception(cursor: &mut &[u8]) -> DecodeResult<Exception> {
    let code = wire::read_u32(cursor)?;
    let name = wire::read_string(cursor)?;
    let display_text = wire::read_string(cursor)?;
    let stack_trace = wire::read_string(cursor)?;
    let has_nested = wire::read_u8(cursor)?;
    let nested = if has_nested != 0 {
        Some(Box::new(parse_exception(cursor)?))
    } else {
        None
    };

    Ok(Exception {
        code,
        name,
        display_text,
        stack_trace,
        nested,
    })
}

fn parse_profile_info(cursor: &mut &[u8]) -> DecodeResult<ProfileInfo> {
    let rows = wire::read_varint64(cursor)?;
    let blocks = wire::read_varint64(cursor)?;
    let bytes = wire::read_varint64(cursor)?;
    let applied_limit = wire::read_u8(cursor)?;
    let rows_before_limit = wire::read_varint64(cursor)?;
    let calculated_rows_before_limit = wire::read_u8(cursor)?;

    Ok(ProfileInfo {
        rows,
        blocks,
        bytes,
        applied_limit: applied_limit != 0,
        rows_before_limit,
        calculated_rows_before_limit: calculated_rows_before_limit != 0,
    })
}
