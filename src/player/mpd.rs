//! MPD client
//!
//! Just enough of the MPD text protocol to connect and append a file to
//! the play queue. The client starts out disconnected; the radio engine
//! connects lazily when its first push fails.

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

/// Errors talking to the remote daemon
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("Not connected to MPD")]
    NotConnected,
    #[error("MPD connection failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("Unexpected MPD response: {0}")]
    Protocol(String),
    #[error("MPD refused command: {0}")]
    Ack(String),
}

/// Remote play-queue handle
#[async_trait]
pub trait RemoteQueueClient: Send {
    async fn connect(&mut self, host: &str, port: u16) -> Result<(), ConnectionError>;

    /// Append `uri` to the daemon's queue
    async fn add(&mut self, uri: &str) -> Result<(), ConnectionError>;
}

struct Connection {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

/// [`RemoteQueueClient`] speaking the MPD protocol over TCP
#[derive(Default)]
pub struct MpdClient {
    conn: Option<Connection>,
    version: Option<String>,
}

impl MpdClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    /// Protocol version announced in the greeting
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    async fn command(&mut self, line: &str) -> Result<(), ConnectionError> {
        let conn = self.conn.as_mut().ok_or(ConnectionError::NotConnected)?;
        let result = Self::exchange(conn, line).await;

        // A dead socket is dropped so the next push reports NotConnected
        if matches!(result, Err(ConnectionError::Io(_)) | Err(ConnectionError::Protocol(_))) {
            self.conn = None;
        }
        result
    }

    async fn exchange(conn: &mut Connection, line: &str) -> Result<(), ConnectionError> {
        conn.writer.write_all(line.as_bytes()).await?;
        conn.writer.write_all(b"\n").await?;
        conn.writer.flush().await?;

        loop {
            let reply = read_line(&mut conn.reader).await?;
            if reply == "OK" {
                return Ok(());
            }
            if let Some(ack) = reply.strip_prefix("ACK ") {
                return Err(ConnectionError::Ack(ack.to_string()));
            }
            // key: value lines precede the final OK
            if !reply.contains(": ") {
                return Err(ConnectionError::Protocol(reply));
            }
        }
    }
}

async fn read_line(reader: &mut BufReader<OwnedReadHalf>) -> Result<String, ConnectionError> {
    let mut line = String::new();
    let n = reader.read_line(&mut line).await?;
    if n == 0 {
        return Err(ConnectionError::Io(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            "MPD closed the connection",
        )));
    }
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

/// Quote a command argument, escaping `"` and `\`
pub fn quote_arg(arg: &str) -> String {
    let mut out = String::with_capacity(arg.len() + 2);
    out.push('"');
    for c in arg.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

#[async_trait]
impl RemoteQueueClient for MpdClient {
    async fn connect(&mut self, host: &str, port: u16) -> Result<(), ConnectionError> {
        self.conn = None;
        tracing::debug!(host, port, "Connecting to MPD");

        let stream = TcpStream::connect((host, port)).await?;
        let (read, writer) = stream.into_split();
        let mut reader = BufReader::new(read);

        let greeting = read_line(&mut reader).await?;
        let version = greeting
            .strip_prefix("OK MPD ")
            .ok_or_else(|| ConnectionError::Protocol(greeting.clone()))?;

        self.version = Some(version.to_string());
        self.conn = Some(Connection { reader, writer });
        Ok(())
    }

    async fn add(&mut self, uri: &str) -> Result<(), ConnectionError> {
        self.command(&format!("add {}", quote_arg(uri))).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[test]
    fn test_quote_arg_escapes() {
        assert_eq!(quote_arg("file:///music/a.mp3"), "\"file:///music/a.mp3\"");
        assert_eq!(quote_arg(r#"say "hi"\"#), r#""say \"hi\"\\""#);
    }

    #[tokio::test]
    async fn test_add_before_connect_fails() {
        let mut client = MpdClient::new();
        assert!(matches!(
            client.add("file:///music/a.mp3").await,
            Err(ConnectionError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_connect_and_add() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let (read, mut write) = socket.into_split();
            let mut reader = BufReader::new(read);
            write.write_all(b"OK MPD 0.23.5\n").await.unwrap();

            let mut line = String::new();
            reader.read_line(&mut line).await.unwrap();
            write.write_all(b"OK\n").await.unwrap();
            line
        });

        let mut client = MpdClient::new();
        client.connect("127.0.0.1", port).await.unwrap();
        assert_eq!(client.version(), Some("0.23.5"));

        client.add("file:///music/a b.mp3").await.unwrap();
        let received = server.await.unwrap();
        assert_eq!(received, "add \"file:///music/a b.mp3\"\n");
    }

    #[tokio::test]
    async fn test_ack_is_reported_and_keeps_connection() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let (read, mut write) = socket.into_split();
            let mut reader = BufReader::new(read);
            write.write_all(b"OK MPD 0.23.5\n").await.unwrap();

            let mut line = String::new();
            reader.read_line(&mut line).await.unwrap();
            write
                .write_all(b"ACK [50@0] {add} No such directory\n")
                .await
                .unwrap();
            // hold the socket open until the client is done
            let _ = reader.read_line(&mut line).await;
        });

        let mut client = MpdClient::new();
        client.connect("127.0.0.1", port).await.unwrap();

        match client.add("file:///missing.mp3").await {
            Err(ConnectionError::Ack(msg)) => assert!(msg.contains("No such directory")),
            other => panic!("Expected Ack, got {:?}", other),
        }
        assert!(client.is_connected());
    }

    #[tokio::test]
    async fn test_closed_socket_drops_connection() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            socket.write_all(b"OK MPD 0.23.5\n").await.unwrap();
            // drop without answering
        });

        let mut client = MpdClient::new();
        client.connect("127.0.0.1", port).await.unwrap();

        assert!(client.add("file:///music/a.mp3").await.is_err());
        assert!(!client.is_connected());
    }

    #[tokio::test]
    async fn test_bad_greeting_is_protocol_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            socket.write_all(b"HELLO\n").await.unwrap();
        });

        let mut client = MpdClient::new();
        assert!(matches!(
            client.connect("127.0.0.1", port).await,
            Err(ConnectionError::Protocol(_))
        ));
        assert!(!client.is_connected());
    }
}
