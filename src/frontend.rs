//! TCP accept loop and per-connection request parser: a byte-oriented reader that accepts both
//! the multi-bulk wire format and a bare inline command line, the way a real Redis-protocol
//! front end has to.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpListener;
use tokio::net::tcp::OwnedReadHalf;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::errors::ParseError;
use crate::event::RedisEvent;

/// Accepts connections forever, handing each one off as a [`RedisEvent::ClientConnected`] plus a
/// spawned read loop that feeds [`RedisEvent::Request`]s back through `tx`. Client ids are handed
/// out from `next_id`, a counter shared with nothing else.
pub async fn accept_loop(listener: TcpListener, port: u16, next_id: Arc<AtomicU64>, tx: mpsc::Sender<RedisEvent>) {
    info!(port, "accepting connections");
    loop {
        let (stream, addr) = match listener.accept().await {
            Ok(pair) => pair,
            Err(err) => {
                warn!(error = %err, "accept failed");
                continue;
            }
        };
        let client_id = next_id.fetch_add(1, Ordering::Relaxed);
        let (read_half, write_half) = stream.into_split();

        if tx
            .send(RedisEvent::ClientConnected { client_id, addr, writer: write_half })
            .await
            .is_err()
        {
            break;
        }

        let tx = tx.clone();
        tokio::spawn(async move {
            read_loop(client_id, read_half, tx).await;
        });
    }
}

async fn read_loop(client_id: u64, read_half: OwnedReadHalf, tx: mpsc::Sender<RedisEvent>) {
    let mut reader = BufReader::new(read_half);
    loop {
        match read_request(&mut reader).await {
            Ok(Some(args)) => {
                if args.is_empty() {
                    continue;
                }
                if tx.send(RedisEvent::Request { client_id, args }).await.is_err() {
                    break;
                }
            }
            Ok(None) => break,
            Err(err) => {
                warn!(client_id, error = %err, "protocol error, closing connection");
                break;
            }
        }
    }
    let _ = tx.send(RedisEvent::ClientDisconnected { client_id }).await;
}

/// Reads one request off the wire: either a multi-bulk array (`*N\r\n` followed by N
/// `$len\r\n<bytes>\r\n` bulk strings) or, when the first line doesn't start with `*`, an inline
/// command (a single line, whitespace-separated). Returns `Ok(None)` on a clean EOF.
pub(crate) async fn read_request<R>(reader: &mut BufReader<R>) -> Result<Option<Vec<String>>, ParseError>
where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut first_line = String::new();
    let bytes_read = reader.read_line(&mut first_line).await?;
    if bytes_read == 0 {
        return Ok(None);
    }
    let first_line = first_line.trim_end_matches(['\r', '\n']);

    if let Some(rest) = first_line.strip_prefix('*') {
        let count: i64 = rest.parse().map_err(|_| ParseError::UnbalancedMultiBulk)?;
        if count <= 0 {
            return Ok(Some(Vec::new()));
        }
        let mut args = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let mut len_line = String::new();
            reader.read_line(&mut len_line).await?;
            let len_line = len_line.trim_end_matches(['\r', '\n']);
            let len: usize = len_line
                .strip_prefix('$')
                .ok_or_else(|| ParseError::ExpectedBulk(len_line.chars().next().unwrap_or(' ')))?
                .parse()
                .map_err(|_| ParseError::InvalidBulkLength)?;

            let mut buf = vec![0u8; len + 2];
            tokio::io::AsyncReadExt::read_exact(reader, &mut buf).await?;
            buf.truncate(len);
            args.push(String::from_utf8_lossy(&buf).into_owned());
        }
        Ok(Some(args))
    } else if first_line.is_empty() {
        Ok(Some(Vec::new()))
    } else {
        Ok(Some(first_line.split_whitespace().map(str::to_string).collect()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::BufReader;

    #[tokio::test]
    async fn parses_a_multibulk_request() {
        let input = b"*2\r\n$3\r\nGET\r\n$1\r\nk\r\n".to_vec();
        let mut reader = BufReader::new(&input[..]);
        let args = read_request(&mut reader).await.unwrap().unwrap();
        assert_eq!(args, vec!["GET".to_string(), "k".to_string()]);
    }

    #[tokio::test]
    async fn parses_an_inline_request() {
        let input = b"PING\r\n".to_vec();
        let mut reader = BufReader::new(&input[..]);
        let args = read_request(&mut reader).await.unwrap().unwrap();
        assert_eq!(args, vec!["PING".to_string()]);
    }

    #[tokio::test]
    async fn clean_eof_yields_none() {
        let input: Vec<u8> = Vec::new();
        let mut reader = BufReader::new(&input[..]);
        assert!(read_request(&mut reader).await.unwrap().is_none());
    }
}
