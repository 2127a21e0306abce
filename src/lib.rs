//! # ClickHouse native-protocol connection
//!
//! An async Rust client for ClickHouse speaking the native TCP binary
//! protocol over a single pipelined connection, with optional TLS.
//!
//! The crate exposes five operations on a connected [`Client`]: [`query`]
//! (expects result rows), [`command`] (expects none), [`insert`] (streams
//! columnar blocks into a table), [`ping`], and [`close`]. One command may
//! be outstanding at a time; responses are correlated to requests in FIFO
//! order by a dedicated pipeline stage, and transport failures propagate to
//! every outstanding caller. Block compression is negotiated off.
//!
//! [`query`]: Client::query
//! [`command`]: Client::command
//! [`insert`]: Client::insert
//! [`ping`]: Client::ping
//! [`close`]: Client::close
//!
//! # Quick Start
//!
//! ```no_run
//! use clickhouse_conn::{Client, ClientOptions, Column};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Client::connect(ClientOptions::new("localhost", 9000)).await?;
//!
//! client.command("CREATE TABLE IF NOT EXISTS test (id UInt64) ENGINE = Memory").await?;
//!
//! client.insert("test", vec![Column::new("id", vec![1u64, 2, 3])]).await?;
//!
//! let result = client.query("SELECT id FROM test").await?;
//! println!("rows: {}", result.row_count());
//!
//! client.close().await;
//! # Ok(())
//! # }
//! ```
//!
//! # Feature Flags
//!
//! - **`tls`** - TLS connections via `rustls` and `tokio-rustls`.
//!
//! # Modules
//!
//! - [`client`] - Connection facade (`Client`, `ClientOptions`)
//! - [`block`] - Data blocks and result-block merging
//! - [`mod@column`] - Column containers and per-type payload codecs
//! - [`types`] - The recursive column type system and its parser
//! - [`codec`] - Outbound frame encoder and streaming inbound decoder
//! - [`machine`] - The connection state machine
//! - [`correlator`] - FIFO request/response correlation
//! - [`mod@query`] - Query envelope and server metadata frames
//! - [`protocol`] - Opcodes and revision gates
//! - [`wire`] - Varints, strings, and other wire primitives
//! - [`connection`] - TCP/TLS transport establishment
//! - [`error`] - Error taxonomy and `Result` alias
//! - `ssl` - TLS options (requires the `tls` feature)

#![warn(missing_docs)]

/// Data blocks and result-block merging.
pub mod block;
/// Connection facade and options.
pub mod client;
/// Message codec: encoder and streaming decoder.
pub mod codec;
/// Column containers and per-type payload codecs.
pub mod column;
/// TCP/TLS transport establishment.
pub mod connection;
/// FIFO request/response correlation.
pub mod correlator;
/// Error taxonomy and `Result` alias.
pub mod error;
/// The connection state machine.
pub mod machine;
/// Protocol opcodes and revision gates.
pub mod protocol;
/// Query envelope and server metadata frames.
pub mod query;
/// The recursive column type system.
pub mod types;
/// Wire format primitives.
pub mod wire;

/// TLS connection options (requires the `tls` feature).
#[cfg(feature = "tls")]
pub mod ssl;

pub use block::{Block, BlockInfo};
pub use client::{Client, ClientOptions, QueryResult};
pub use column::{Column, ColumnData};
pub use error::{Error, Result};
pub use query::{Exception, ProfileInfo, Progress, ServerInfo};
pub use types::Type;

#[cfg(feature = "tls")]
pub use ssl::TlsOptions;
