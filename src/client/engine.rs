use std::io::SeekFrom;
use std::time::Duration;

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeek, AsyncSeekExt, AsyncWrite, AsyncWriteExt};

use crate::client::error::ClientError;
use crate::client::response::Response;
use crate::http::parser::{self, BodyLength};
use crate::http::request::keep_alive;
use crate::net::{Connector, TcpConnector};

/// Port used when the address names none.
pub const DEFAULT_PORT: u16 = 80;

/// A client bound to one server address.
pub struct Client<C: Connector = TcpConnector> {
    host: String,
    port: u16,
    connector: C,
    stream: Option<C::Io>,
    buffer: BytesMut,
    socket_error: bool,
    timeout: Option<Duration>,
}

impl Client<TcpConnector> {
    /// Creates a client for `host[:port]` without connecting.
    pub fn new(host_port: &str) -> Result<Self, ClientError> {
        Self::with_connector(host_port, TcpConnector)
    }

    /// Creates a client from an `http://host[:port]` URL. Any path is ignored.
    pub fn from_url(url: &str) -> Result<Self, ClientError> {
        let url = url::Url::parse(url).map_err(|e| ClientError::InvalidAddress(format!("{url}: {e}")))?;

        if url.scheme() != "http" {
            return Err(ClientError::InvalidAddress(format!(
                "unsupported scheme {:?}",
                url.scheme()
            )));
        }
        let host = url
            .host_str()
            .ok_or_else(|| ClientError::InvalidAddress(format!("{url}: missing host")))?;
        let port = url.port_or_known_default().unwrap_or(DEFAULT_PORT);

        Ok(Self::from_parts(host.to_string(), port, TcpConnector))
    }
}

impl<C: Connector> Client<C> {
    pub fn with_connector(host_port: &str, connector: C) -> Result<Self, ClientError> {
        let (host, port) = parse_host_port(host_port)?;
        Ok(Self::from_parts(host, port, connector))
    }

    fn from_parts(host: String, port: u16, connector: C) -> Self {
        Self {
            host,
            port,
            connector,
            stream: None,
            buffer: BytesMut::with_capacity(4096),
            socket_error: false,
            timeout: None,
        }
    }

    /// Bounds every request, connecting included. Expiry counts as a
    /// transport error.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// True when the last request failed and the next one will reconnect.
    pub fn is_errored(&self) -> bool {
        self.socket_error
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some() && !self.socket_error
    }

    /// Sends a request with an in-memory body and waits for the response.
    ///
    /// An empty path is sent as `/`. A `Content-Length` header is added
    /// when `content` is not empty.
    pub async fn request(
        &mut self,
        method: &str,
        path: &str,
        content: &[u8],
        headers: &[(&str, &str)],
    ) -> Result<Response, ClientError> {
        let length = content.len() as u64;
        let head = build_head(&self.host, method, path, headers, length);
        let mut body = content;
        self.execute(&head, &mut body, length).await
    }

    /// Sends a request whose body is read from a seekable stream.
    ///
    /// The body length is measured by seeking to the end and back to the
    /// start before anything is sent.
    pub async fn request_stream<R>(
        &mut self,
        method: &str,
        path: &str,
        content: &mut R,
        headers: &[(&str, &str)],
    ) -> Result<Response, ClientError>
    where
        R: AsyncRead + AsyncSeek + Unpin,
    {
        let length = content.seek(SeekFrom::End(0)).await?;
        content.seek(SeekFrom::Start(0)).await?;

        let head = build_head(&self.host, method, path, headers, length);
        self.execute(&head, content, length).await
    }

    pub async fn get(&mut self, path: &str) -> Result<Response, ClientError> {
        self.request("GET", path, &[], &[]).await
    }

    async fn execute<R>(&mut self, head: &[u8], body: &mut R, length: u64) -> Result<Response, ClientError>
    where
        R: AsyncRead + Unpin,
    {
        let result = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, self.exchange(head, body, length))
                .await
                .unwrap_or(Err(ClientError::Timeout)),
            None => self.exchange(head, body, length).await,
        };

        if let Err(e) = &result {
            self.socket_error = true;
            tracing::warn!(
                host = %self.host,
                port = self.port,
                error = %e,
                "Request failed, connection marked for reconnect"
            );
        }

        result
    }

    async fn exchange<R>(&mut self, head: &[u8], body: &mut R, length: u64) -> Result<Response, ClientError>
    where
        R: AsyncRead + Unpin,
    {
        self.connect().await?;
        let stream = self.stream.as_mut().ok_or(ClientError::ConnectionClosed)?;

        write_request(stream, head, body, length).await?;
        tracing::trace!(host = %self.host, "Request sent");

        let response = read_response(stream, &mut self.buffer).await?;

        // The server announced a close; reconnect next time.
        let closing = response.header("Connection") == Some("close")
            || !keep_alive(&response.http_version).unwrap_or(false);
        if closing {
            self.stream = None;
            self.buffer.clear();
        }

        Ok(response)
    }

    async fn connect(&mut self) -> Result<(), ClientError> {
        if self.socket_error || self.stream.is_none() {
            self.stream = None;
            self.buffer.clear();

            let stream = self.connector.connect(&self.host, self.port).await?;
            tracing::debug!(host = %self.host, port = self.port, "Connected");

            self.stream = Some(stream);
            self.socket_error = false;
        }
        Ok(())
    }
}

/// Splits `host[:port]`, defaulting the port to 80.
pub fn parse_host_port(host_port: &str) -> Result<(String, u16), ClientError> {
    match host_port.split_once(':') {
        None => Ok((host_port.to_string(), DEFAULT_PORT)),
        Some((host, port)) => {
            let port = port
                .parse()
                .map_err(|_| ClientError::InvalidAddress(host_port.to_string()))?;
            Ok((host.to_string(), port))
        }
    }
}

pub(crate) fn build_head(host: &str, method: &str, path: &str, headers: &[(&str, &str)], length: u64) -> Vec<u8> {
    let path = if path.is_empty() { "/" } else { path };

    let mut buf = Vec::with_capacity(256);
    buf.extend_from_slice(format!("{method} {path} HTTP/1.1\r\n").as_bytes());
    buf.extend_from_slice(format!("Host: {host}\r\n").as_bytes());

    for (name, value) in headers {
        buf.extend_from_slice(format!("{name}: {value}\r\n").as_bytes());
    }

    if length > 0 {
        buf.extend_from_slice(format!("Content-Length: {length}\r\n").as_bytes());
    }
    buf.extend_from_slice(b"\r\n");
    buf
}

async fn write_request<W, R>(stream: &mut W, head: &[u8], body: &mut R, length: u64) -> Result<(), ClientError>
where
    W: AsyncWrite + Unpin,
    R: AsyncRead + Unpin,
{
    stream.write_all(head).await?;

    if length > 0 {
        let copied = tokio::io::copy(&mut body.take(length), stream).await?;
        if copied < length {
            return Err(ClientError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!("request body ended after {copied} of {length} bytes"),
            )));
        }
    }

    stream.flush().await?;
    Ok(())
}

/// Reads one response, leaving any bytes past its body in `buf`.
pub async fn read_response<R>(reader: &mut R, buf: &mut BytesMut) -> Result<Response, ClientError>
where
    R: AsyncRead + Unpin,
{
    let head = parser::read_response_head(reader, buf).await?;
    let length = BodyLength::from_headers(&head.headers)?;
    let content = parser::read_body(reader, buf, length).await?;
    Ok(Response::from_head(head, content))
}
