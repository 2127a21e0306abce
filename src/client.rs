//! The client facade and the per-connection driver task.
//!
//! One spawned task owns the socket, the packet decoder, the state machine,
//! and the correlator; the facade talks to it over an mpsc channel and
//! waits on oneshot receivers. Everything that touches connection state
//! runs on the driver task, so no locks are needed.

use crate::block::Block;
use crate::codec::PacketDecoder;
use crate::column::Column;
use crate::connection::{self, BoxedReader, BoxedWriter};
use crate::correlator::{Correlator, Response, Waiter};
use crate::machine::{Command, Emission, Machine};
use crate::query::ServerInfo;
use crate::{Error, Result};
use bytes::BytesMut;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use tracing::{debug, error, trace};

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(90);
const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(600);

/// Connection options.
#[derive(Clone, Debug)]
pub struct ClientOptions {
    /// Server host, resolved at connect time.
    pub host: String,
    /// Server port; the plaintext default is 9000, TLS deployments
    /// conventionally use 9440.
    pub port: u16,
    /// Pre-resolved address; takes precedence over host/port when set.
    pub addr: Option<SocketAddr>,
    /// Database selected by the handshake.
    pub database: String,
    /// Username.
    pub user: String,
    /// Password.
    pub password: String,
    /// Deadline for TCP connect (and the TLS handshake).
    pub connect_timeout: Duration,
    /// Idle-read guard on an established connection. Firing while a
    /// response is pending closes the connection; firing while idle is a
    /// keep-alive no-op.
    pub read_timeout: Duration,
    /// Default deadline per operation, overridable per call.
    pub query_timeout: Duration,
    /// TLS configuration; when set the TLS handshake runs before the first
    /// protocol byte.
    #[cfg(feature = "tls")]
    pub tls: Option<crate::ssl::TlsOptions>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 9000,
            addr: None,
            database: "default".to_string(),
            user: "default".to_string(),
            password: String::new(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
            query_timeout: DEFAULT_QUERY_TIMEOUT,
            #[cfg(feature = "tls")]
            tls: None,
        }
    }
}

impl ClientOptions {
    /// Options for the given host and port.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    /// Options for a pre-resolved socket address.
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            addr: Some(addr),
            ..Default::default()
        }
    }

    /// Set the database.
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    /// Set the username.
    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }

    /// Set the password.
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = password.into();
        self
    }

    /// Set the connect timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the idle-read timeout.
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Set the default per-operation timeout.
    pub fn query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    /// Enable TLS with the given options.
    #[cfg(feature = "tls")]
    pub fn tls(mut self, tls: crate::ssl::TlsOptions) -> Self {
        self.tls = Some(tls);
        self
    }
}

/// The merged result of a `query` call.
#[derive(Debug)]
pub struct QueryResult {
    block: Block,
}

impl QueryResult {
    /// The merged result block.
    pub fn block(&self) -> &Block {
        &self.block
    }

    /// Consume the result, returning the block.
    pub fn into_block(self) -> Block {
        self.block
    }

    /// Number of result rows.
    pub fn row_count(&self) -> usize {
        self.block.row_count()
    }

    /// Column by name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.block.column_by_name(name)
    }

    /// All columns in order.
    pub fn columns(&self) -> &[Column] {
        self.block.columns()
    }
}

enum DriverMessage {
    Request {
        command: Command,
        waiter: Waiter,
    },
    Shutdown,
}

/// A single connection to a ClickHouse server.
///
/// Constructed by [`Client::connect`] after a successful handshake. One
/// command may be outstanding at a time; a second one fails with
/// [`Error::NotReady`]. Fatal errors and per-operation timeouts close the
/// connection for good.
pub struct Client {
    sender: mpsc::Sender<DriverMessage>,
    closed: Arc<AtomicBool>,
    server_info: ServerInfo,
    query_timeout: Duration,
}

impl Client {
    /// Connect, perform the handshake, and return a ready client.
    pub async fn connect(options: ClientOptions) -> Result<Client> {
        let (reader, writer) = connection::connect(&options).await?;

        let closed = Arc::new(AtomicBool::new(false));
        let (sender, receiver) = mpsc::channel(32);

        let driver = Driver {
            reader,
            writer,
            decoder: PacketDecoder::new(),
            machine: Machine::new(
                options.database.as_str(),
                options.user.as_str(),
                options.password.as_str(),
            ),
            correlator: Correlator::new(),
            read_buffer: BytesMut::with_capacity(8192),
            read_timeout: options.read_timeout,
            closed: closed.clone(),
        };
        tokio::spawn(driver.run(receiver));

        let (tx, rx) = oneshot::channel();
        sender
            .send(DriverMessage::Request {
                command: Command::Connect,
                waiter: tx,
            })
            .await
            .map_err(|_| Error::Closed)?;

        let server_info = match timeout(options.connect_timeout, rx).await {
            Err(_) => {
                let _ = sender.try_send(DriverMessage::Shutdown);
                return Err(Error::ConnectTimeout);
            }
            Ok(Err(_)) => return Err(Error::Closed),
            Ok(Ok(Err(e))) => return Err(e),
            Ok(Ok(Ok(Response::ServerInfo(info)))) => info,
            Ok(Ok(Ok(other))) => {
                let _ = sender.try_send(DriverMessage::Shutdown);
                return Err(Error::Protocol(format!(
                    "Handshake produced unexpected response: {:?}",
                    other
                )));
            }
        };

        Ok(Client {
            sender,
            closed,
            server_info,
            query_timeout: options.query_timeout,
        })
    }

    /// Server identity from the handshake.
    pub fn server_info(&self) -> &ServerInfo {
        &self.server_info
    }

    /// True once the connection is closed, by `close` or by a fatal error.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire) || self.sender.is_closed()
    }

    /// Run a statement that returns rows, with the default deadline.
    pub async fn query(&self, sql: impl Into<String>) -> Result<QueryResult> {
        self.query_with_timeout(sql, self.query_timeout).await
    }

    /// Run a statement that returns rows, with an explicit deadline.
    pub async fn query_with_timeout(
        &self,
        sql: impl Into<String>,
        deadline: Duration,
    ) -> Result<QueryResult> {
        match self.request(Command::Query(sql.into()), deadline).await? {
            Response::Result(block) => Ok(QueryResult { block }),
            other => Err(unexpected_response(&other, "query")),
        }
    }

    /// Run a statement that returns no rows, with the default deadline.
    pub async fn command(&self, sql: impl Into<String>) -> Result<()> {
        self.command_with_timeout(sql, self.query_timeout).await
    }

    /// Run a statement that returns no rows, with an explicit deadline.
    pub async fn command_with_timeout(
        &self,
        sql: impl Into<String>,
        deadline: Duration,
    ) -> Result<()> {
        match self.request(Command::Command(sql.into()), deadline).await? {
            Response::Executed => Ok(()),
            other => Err(unexpected_response(&other, "command")),
        }
    }

    /// Stream columns into a table, with the default deadline. Column names
    /// must match the table schema in insertion order.
    pub async fn insert(&self, table: impl Into<String>, columns: Vec<Column>) -> Result<()> {
        self.insert_with_timeout(table, columns, self.query_timeout)
            .await
    }

    /// Stream columns into a table, with an explicit deadline.
    pub async fn insert_with_timeout(
        &self,
        table: impl Into<String>,
        columns: Vec<Column>,
        deadline: Duration,
    ) -> Result<()> {
        let command = Command::Insert {
            table: table.into(),
            columns,
        };
        match self.request(command, deadline).await? {
            Response::Executed => Ok(()),
            other => Err(unexpected_response(&other, "insert")),
        }
    }

    /// Check liveness, with the default deadline.
    pub async fn ping(&self) -> Result<()> {
        self.ping_with_timeout(self.query_timeout).await
    }

    /// Check liveness, with an explicit deadline.
    pub async fn ping_with_timeout(&self, deadline: Duration) -> Result<()> {
        match self.request(Command::Ping, deadline).await? {
            Response::Pong => Ok(()),
            other => Err(unexpected_response(&other, "ping")),
        }
    }

    /// Close the connection. Idempotent; outstanding requests fail.
    pub async fn close(&self) {
        self.closed.store(true, Ordering::Release);
        let _ = self.sender.send(DriverMessage::Shutdown).await;
    }

    async fn request(&self, command: Command, deadline: Duration) -> Result<Response> {
        if self.is_closed() {
            return Err(Error::Closed);
        }

        let (tx, rx) = oneshot::channel();
        self.sender
            .send(DriverMessage::Request {
                command,
                waiter: tx,
            })
            .await
            .map_err(|_| Error::Closed)?;

        match timeout(deadline, rx).await {
            Err(_) => {
                // No targeted cancellation in this protocol subset; the
                // whole connection goes down.
                debug!("operation deadline fired, closing connection");
                self.closed.store(true, Ordering::Release);
                let _ = self.sender.try_send(DriverMessage::Shutdown);
                Err(Error::QueryTimeout)
            }
            Ok(Err(_)) => Err(Error::Closed),
            Ok(Ok(outcome)) => outcome,
        }
    }
}

fn unexpected_response(response: &Response, operation: &str) -> Error {
    Error::Protocol(format!(
        "{} completed with unexpected response: {:?}",
        operation, response
    ))
}

/// The task that owns the socket and all connection state.
struct Driver {
    reader: BoxedReader,
    writer: BoxedWriter,
    decoder: PacketDecoder,
    machine: Machine,
    correlator: Correlator,
    read_buffer: BytesMut,
    read_timeout: Duration,
    closed: Arc<AtomicBool>,
}

impl Driver {
    async fn run(mut self, mut requests: mpsc::Receiver<DriverMessage>) {
        let result = self.run_inner(&mut requests).await;
        self.machine.close();
        self.closed.store(true, Ordering::Release);
        requests.close();

        match result {
            Ok(()) => {
                debug!("connection closed");
                self.correlator.fail_all(&Error::Closed);
            }
            Err(e) => {
                error!(error = %e, "connection failed");
                self.correlator.fail_all(&e);
            }
        }

        // Reject requests that raced with the close.
        while let Ok(message) = requests.try_recv() {
            if let DriverMessage::Request { waiter, .. } = message {
                let _ = waiter.send(Err(Error::Closed));
            }
        }
    }

    async fn run_inner(&mut self, requests: &mut mpsc::Receiver<DriverMessage>) -> Result<()> {
        loop {
            tokio::select! {
                message = requests.recv() => match message {
                    None | Some(DriverMessage::Shutdown) => return Ok(()),
                    Some(DriverMessage::Request { command, waiter }) => {
                        self.handle_request(command, waiter).await?;
                    }
                },
                read = timeout(self.read_timeout, self.reader.read_buf(&mut self.read_buffer)) => {
                    match read {
                        Err(_) => {
                            // Idle connections stay up; a pending response
                            // that stalls is fatal.
                            if self.machine.is_ready() && self.correlator.is_empty() {
                                trace!("idle read timeout ignored while ready");
                                continue;
                            }
                            return Err(Error::ReadTimeout);
                        }
                        Ok(Err(e)) => return Err(e.into()),
                        Ok(Ok(0)) => {
                            // End of input. The server may leave debris
                            // after a rejected query; discard it.
                            self.read_buffer.clear();
                            if self.machine.is_ready() && self.correlator.is_empty() {
                                return Ok(());
                            }
                            return Err(Error::Connection(
                                "Connection closed by server".to_string(),
                            ));
                        }
                        Ok(Ok(_)) => self.drain_packets().await?,
                    }
                }
            }
        }
    }

    async fn handle_request(&mut self, command: Command, waiter: Waiter) -> Result<()> {
        let kind = match &command {
            Command::Connect => "connect",
            Command::Query(_) => "query",
            Command::Command(_) => "command",
            Command::Insert { .. } => "insert",
            Command::Ping => "ping",
        };

        match self.machine.on_command(command) {
            Ok(bytes) => {
                trace!(kind, bytes = bytes.len(), "writing request");
                self.writer.write_all(&bytes).await?;
                self.writer.flush().await?;
                self.correlator.enqueue(kind, waiter);
                Ok(())
            }
            Err(e) => {
                // Usage errors answer the caller directly and never enter
                // the FIFO.
                debug!(kind, error = %e, "request rejected");
                let _ = waiter.send(Err(e));
                Ok(())
            }
        }
    }

    async fn drain_packets(&mut self) -> Result<()> {
        while let Some(packet) = self.decoder.decode(&mut self.read_buffer)? {
            let reaction = self.machine.on_packet(packet)?;
            if let Some(bytes) = reaction.write {
                self.writer.write_all(&bytes).await?;
                self.writer.flush().await?;
            }
            if let Some(emission) = reaction.emission {
                let outcome = match emission {
                    Emission::ServerInfo(info) => Ok(Response::ServerInfo(info)),
                    Emission::Result(block) => Ok(Response::Result(block)),
                    Emission::Executed => Ok(Response::Executed),
                    Emission::Pong => Ok(Response::Pong),
                    Emission::Error(e) => Err(e),
                };
                self.correlator.complete(outcome);
            }
        }
        Ok(())
    }
}
