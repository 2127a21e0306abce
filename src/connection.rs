//! Transport establishment: TCP connect, optional TLS handshake, and the
//! boxed stream halves the driver task owns.

use crate::client::ClientOptions;
use crate::{Error, Result};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

/// Read half of the connection's byte stream, TCP or TLS.
pub type BoxedReader = Box<dyn AsyncRead + Unpin + Send>;
/// Write half of the connection's byte stream, TCP or TLS.
pub type BoxedWriter = Box<dyn AsyncWrite + Unpin + Send>;

/// Establish the transport for `options`: TCP connect bounded by
/// `connect_timeout`, then a TLS handshake when TLS is configured.
pub async fn connect(options: &ClientOptions) -> Result<(BoxedReader, BoxedWriter)> {
    let stream = timeout(options.connect_timeout, open_tcp(options))
        .await
        .map_err(|_| Error::ConnectTimeout)??;

    stream
        .set_nodelay(true)
        .map_err(|e| Error::Connection(format!("Failed to set TCP_NODELAY: {}", e)))?;

    #[cfg(feature = "tls")]
    if let Some(tls) = &options.tls {
        let stream = timeout(options.connect_timeout, tls_handshake(options, tls, stream))
            .await
            .map_err(|_| Error::ConnectTimeout)??;
        let (reader, writer) = tokio::io::split(stream);
        return Ok((Box::new(reader), Box::new(writer)));
    }

    let (reader, writer) = stream.into_split();
    Ok((Box::new(reader), Box::new(writer)))
}

async fn open_tcp(options: &ClientOptions) -> Result<TcpStream> {
    let stream = match options.addr {
        Some(addr) => TcpStream::connect(addr).await.map_err(|e| {
            Error::Connection(format!("Failed to connect to {}: {}", addr, e))
        })?,
        None => {
            let endpoint = format!("{}:{}", options.host, options.port);
            TcpStream::connect(&endpoint).await.map_err(|e| {
                Error::Connection(format!("Failed to connect to {}: {}", endpoint, e))
            })?
        }
    };
    debug!(peer = ?stream.peer_addr().ok(), "tcp connected");
    Ok(stream)
}

#[cfg(feature = "tls")]
async fn tls_handshake(
    options: &ClientOptions,
    tls: &crate::ssl::TlsOptions,
    stream: TcpStream,
) -> Result<tokio_rustls::client::TlsStream<TcpStream>> {
    let config = tls.build_client_config()?;
    let name = tls.server_name.as_deref().unwrap_or(&options.host);
    let server_name = rustls::ServerName::try_from(name)
        .map_err(|e| Error::Connection(format!("Invalid TLS server name '{}': {}", name, e)))?;

    let connector = tokio_rustls::TlsConnector::from(config);
    let stream = connector
        .connect(server_name, stream)
        .await
        .map_err(|e| Error::Connection(format!("TLS handshake failed: {}", e)))?;
    debug!(server_name = name, "tls handshake complete");
    Ok(stream)
}
