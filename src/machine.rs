//! The connection state machine.
//!
//! Every outbound command and inbound frame is a total transition
//! `(state, event) -> (state', reaction)`. Commands produce the bytes to
//! write; frames may produce a terminal emission for the correlator and,
//! for the insert round-trip, more bytes to write. Server exceptions are
//! terminal for the running command but return the machine to `Ready` --
//! the connection survives them.

use crate::block::{merge_result_blocks, Block};
use crate::codec::{self, ServerPacket};
use crate::column::Column;
use crate::query::{Query, ServerInfo};
use crate::{Error, Result};
use bytes::BytesMut;
use tracing::{debug, warn};

/// Connection lifecycle states.
#[derive(Debug)]
pub enum ConnectionState {
    /// Socket established, Hello not yet sent.
    NotConnected,
    /// Hello sent, waiting for the server handshake.
    Connecting,
    /// Idle; the only state that accepts a new command.
    Ready,
    /// Query sent; accumulating result blocks.
    AwaitingQueryResult {
        /// Blocks received so far, schema block first.
        blocks: Vec<Block>,
    },
    /// Empty data marker seen; waiting for end-of-stream.
    AwaitingQueryResultEndOfStream {
        /// The merged result, or the merge failure to report.
        result: Result<Block>,
    },
    /// Insert query sent; waiting for the server to declare the schema.
    AwaitingToSendData {
        /// The caller's columns, in insertion order.
        columns: Vec<Column>,
    },
    /// Waiting for the end-of-stream that confirms execution.
    AwaitingQueryConfirmation {
        /// Set when the terminal emission already happened (failed insert);
        /// the confirmation is then swallowed.
        suppress_confirmation: bool,
    },
    /// Ping sent.
    AwaitingPong,
    /// Terminal; every frame is dropped silently.
    Closed,
}

/// An outbound command from the connection facade.
#[derive(Debug)]
pub enum Command {
    /// Send the Hello handshake.
    Connect,
    /// Run a statement that produces rows.
    Query(String),
    /// Run a statement with no result rows.
    Command(String),
    /// Stream columns into a table.
    Insert {
        /// Target table name.
        table: String,
        /// Columns in insertion order; names must match the server schema.
        columns: Vec<Column>,
    },
    /// Liveness check.
    Ping,
}

/// A terminal outcome handed to the correlator.
#[derive(Debug)]
pub enum Emission {
    /// Handshake completed.
    ServerInfo(ServerInfo),
    /// A query finished with this merged result.
    Result(Block),
    /// A command or insert was executed.
    Executed,
    /// Ping answered.
    Pong,
    /// The running command failed; the connection stays usable unless the
    /// error is fatal.
    Error(Error),
}

/// What a frame transition produced.
#[derive(Debug, Default)]
pub struct Reaction {
    /// Terminal emission for the correlator, if the frame completed a
    /// command.
    pub emission: Option<Emission>,
    /// Bytes to write out (the insert data round-trip).
    pub write: Option<BytesMut>,
}

impl Reaction {
    fn none() -> Self {
        Reaction::default()
    }

    fn emit(emission: Emission) -> Self {
        Reaction {
            emission: Some(emission),
            write: None,
        }
    }
}

/// The protocol state machine for one connection.
#[derive(Debug)]
pub struct Machine {
    state: ConnectionState,
    revision: u64,
    database: String,
    user: String,
    password: String,
}

impl Machine {
    /// New machine in `NotConnected` holding the handshake credentials.
    pub fn new(
        database: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            state: ConnectionState::NotConnected,
            revision: 0,
            database: database.into(),
            user: user.into(),
            password: password.into(),
        }
    }

    /// Current state.
    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    /// True when a new command can be issued.
    pub fn is_ready(&self) -> bool {
        matches!(self.state, ConnectionState::Ready)
    }

    /// True once the machine reached its terminal state.
    pub fn is_closed(&self) -> bool {
        matches!(self.state, ConnectionState::Closed)
    }

    /// Negotiated server revision, zero before the handshake.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Force the terminal state; subsequent frames are dropped.
    pub fn close(&mut self) {
        self.state = ConnectionState::Closed;
    }

    /// Apply an outbound command, returning the bytes to write.
    pub fn on_command(&mut self, command: Command) -> Result<BytesMut> {
        if self.is_closed() {
            return Err(Error::Closed);
        }

        let mut buffer = BytesMut::new();
        match (&self.state, command) {
            (ConnectionState::NotConnected, Command::Connect) => {
                codec::encode_hello(&mut buffer, &self.database, &self.user, &self.password);
                self.state = ConnectionState::Connecting;
            }
            (_, Command::Connect) => return Err(Error::NotReady),
            (ConnectionState::Ready, Command::Query(sql)) => {
                codec::encode_query(&mut buffer, &Query::new(sql), self.revision)?;
                self.state = ConnectionState::AwaitingQueryResult { blocks: Vec::new() };
            }
            (ConnectionState::Ready, Command::Command(sql)) => {
                codec::encode_query(&mut buffer, &Query::new(sql), self.revision)?;
                self.state = ConnectionState::AwaitingQueryConfirmation {
                    suppress_confirmation: false,
                };
            }
            (ConnectionState::Ready, Command::Insert { table, columns }) => {
                let sql = insert_statement(&table, &columns)?;
                codec::encode_query(&mut buffer, &Query::new(sql), self.revision)?;
                self.state = ConnectionState::AwaitingToSendData { columns };
            }
            (ConnectionState::Ready, Command::Ping) => {
                codec::encode_ping(&mut buffer);
                self.state = ConnectionState::AwaitingPong;
            }
            (_, _) => return Err(Error::NotReady),
        }
        Ok(buffer)
    }

    /// Apply an inbound frame. `Err` means a fatal protocol violation; the
    /// driver closes the connection.
    pub fn on_packet(&mut self, packet: ServerPacket) -> Result<Reaction> {
        if self.is_closed() {
            return Ok(Reaction::none());
        }

        // A server exception ends the running command but not the
        // connection.
        let packet = match packet {
            ServerPacket::Exception(exception) => {
                if matches!(self.state, ConnectionState::NotConnected) {
                    return Err(Error::Protocol(
                        "Exception received before handshake".to_string(),
                    ));
                }
                debug!(code = exception.code, name = %exception.name, "server exception");
                self.state = ConnectionState::Ready;
                return Ok(Reaction::emit(Emission::Error(Error::Server(exception))));
            }
            other => other,
        };

        match std::mem::replace(&mut self.state, ConnectionState::Ready) {
            ConnectionState::NotConnected => Err(Error::Protocol(
                "Frame received before handshake".to_string(),
            )),

            ConnectionState::Connecting => match packet {
                ServerPacket::Hello(info) => {
                    debug!(
                        server = %info.name,
                        revision = info.revision,
                        timezone = info.timezone.as_deref().unwrap_or(""),
                        "handshake complete"
                    );
                    self.revision = info.revision;
                    self.state = ConnectionState::Ready;
                    Ok(Reaction::emit(Emission::ServerInfo(info)))
                }
                other => Err(unexpected(&other, "Connecting")),
            },

            ConnectionState::Ready => Err(unexpected(&packet, "Ready")),

            ConnectionState::AwaitingQueryResult { mut blocks } => match packet {
                ServerPacket::Progress(_) | ServerPacket::ProfileInfo(_) => {
                    self.state = ConnectionState::AwaitingQueryResult { blocks };
                    Ok(Reaction::none())
                }
                ServerPacket::Data(block) if block.column_count() == 0 => {
                    let result = merge_result_blocks(blocks);
                    self.state = ConnectionState::AwaitingQueryResultEndOfStream { result };
                    Ok(Reaction::none())
                }
                ServerPacket::Data(block) => {
                    blocks.push(block);
                    self.state = ConnectionState::AwaitingQueryResult { blocks };
                    Ok(Reaction::none())
                }
                other => Err(unexpected(&other, "AwaitingQueryResult")),
            },

            ConnectionState::AwaitingQueryResultEndOfStream { result } => match packet {
                ServerPacket::Progress(_) | ServerPacket::ProfileInfo(_) => {
                    self.state = ConnectionState::AwaitingQueryResultEndOfStream { result };
                    Ok(Reaction::none())
                }
                ServerPacket::EndOfStream => {
                    self.state = ConnectionState::Ready;
                    Ok(Reaction::emit(match result {
                        Ok(block) => Emission::Result(block),
                        Err(e) => Emission::Error(e),
                    }))
                }
                other => Err(unexpected(&other, "AwaitingQueryResultEndOfStream")),
            },

            ConnectionState::AwaitingToSendData { columns } => match packet {
                ServerPacket::Progress(_) | ServerPacket::ProfileInfo(_) => {
                    self.state = ConnectionState::AwaitingToSendData { columns };
                    Ok(Reaction::none())
                }
                ServerPacket::Data(schema) => self.send_insert_data(schema, columns),
                other => Err(unexpected(&other, "AwaitingToSendData")),
            },

            ConnectionState::AwaitingQueryConfirmation {
                suppress_confirmation,
            } => match packet {
                ServerPacket::Progress(_)
                | ServerPacket::ProfileInfo(_)
                | ServerPacket::Data(_) => {
                    self.state = ConnectionState::AwaitingQueryConfirmation {
                        suppress_confirmation,
                    };
                    Ok(Reaction::none())
                }
                ServerPacket::EndOfStream => {
                    self.state = ConnectionState::Ready;
                    if suppress_confirmation {
                        Ok(Reaction::none())
                    } else {
                        Ok(Reaction::emit(Emission::Executed))
                    }
                }
                other => Err(unexpected(&other, "AwaitingQueryConfirmation")),
            },

            ConnectionState::AwaitingPong => match packet {
                ServerPacket::Pong => {
                    self.state = ConnectionState::Ready;
                    Ok(Reaction::emit(Emission::Pong))
                }
                other => Err(unexpected(&other, "AwaitingPong")),
            },

            ConnectionState::Closed => {
                self.state = ConnectionState::Closed;
                Ok(Reaction::none())
            }
        }
    }

    /// The server answered an insert with the target schema: attach the
    /// declared types to the caller's columns and stream the data out.
    fn send_insert_data(&mut self, schema: Block, columns: Vec<Column>) -> Result<Reaction> {
        match build_insert_block(schema, columns) {
            Ok(block) => {
                let mut buffer = BytesMut::new();
                codec::encode_data(&mut buffer, &block, self.revision)?;
                codec::encode_data(&mut buffer, &Block::new(), self.revision)?;
                self.state = ConnectionState::AwaitingQueryConfirmation {
                    suppress_confirmation: false,
                };
                Ok(Reaction {
                    emission: None,
                    write: Some(buffer),
                })
            }
            Err(e) => {
                warn!(error = %e, "insert schema validation failed");
                // Finish the exchange with an empty block so the stream
                // stays aligned; the confirmation is already consumed by
                // the error emission.
                let mut buffer = BytesMut::new();
                codec::encode_data(&mut buffer, &Block::new(), self.revision)?;
                self.state = ConnectionState::AwaitingQueryConfirmation {
                    suppress_confirmation: true,
                };
                Ok(Reaction {
                    emission: Some(Emission::Error(e)),
                    write: Some(buffer),
                })
            }
        }
    }
}

/// Validate the caller's columns against the server-declared schema and
/// produce the block to send.
fn build_insert_block(schema: Block, columns: Vec<Column>) -> Result<Block> {
    if schema.column_count() != columns.len() {
        return Err(Error::Validation(format!(
            "Insert has {} columns but the table expects {}",
            columns.len(),
            schema.column_count()
        )));
    }

    let mut prepared = Vec::with_capacity(columns.len());
    for (index, (declared, mut column)) in
        schema.columns().iter().zip(columns).enumerate()
    {
        if declared.name() != column.name() {
            return Err(Error::Validation(format!(
                "Insert column {} is named '{}' but the table declares '{}'",
                index,
                column.name(),
                declared.name()
            )));
        }
        column.attach_type(declared.column_type().clone())?;
        prepared.push(column);
    }
    Block::from_columns(prepared)
}

/// `INSERT INTO table (`a`, `b`) VALUES` -- the data itself follows as
/// blocks.
fn insert_statement(table: &str, columns: &[Column]) -> Result<String> {
    if columns.is_empty() {
        return Err(Error::Validation("Insert needs at least one column".to_string()));
    }
    let names: Vec<String> = columns
        .iter()
        .map(|c| format!("`{}`", c.name().replace('`', "``")))
        .collect();
    Ok(format!("INSERT INTO {} ({}) VALUES", table, names.join(", ")))
}

fn unexpected(packet: &ServerPacket, state: &str) -> Error {
    Error::Protocol(format!(
        "Unexpected {} frame in state {}",
        packet_name(packet),
        state
    ))
}

fn packet_name(packet: &ServerPacket) -> &'static str {
    match packet {
        ServerPacket::Hello(_) => "Hello",
        ServerPacket::Data(_) => "Data",
        ServerPacket::Exception(_) => "Exception",
        ServerPacket::Progress(_) => "Progress",
        ServerPacket::Pong => "Pong",
        ServerPacket::EndOfStream => "EndOfStream",
        ServerPacket::ProfileInfo(_) => "ProfileInfo",
    }
}
