//! RDB-style snapshot reader/writer backing `LOADDB` and `DUMP`.
//!
//! Same magic number, version field and opcode bytes as the wire format this crate's RDB
//! constants describe, extended from read-only to also write snapshots (needed for `DUMP`) and
//! simplified to the flat string keyspace this crate's storage engine actually holds (no
//! list/hash/set encodings).

use std::io;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::protocol_constants::{MAGIC_NUMBER, OPCODE_EOF, OPCODE_EXPIRETIME_MS, OPCODE_STRING};

const RDB_VERSION: &[u8; 4] = b"0011";

/// Writes every `(key, value, expire_at_ms)` triple as a minimal snapshot: magic, version, one
/// entry per key (expiry opcode + absolute ms timestamp when present, else the plain key/value
/// opcode), then EOF.
pub async fn write_snapshot<W>(mut writer: W, entries: &[(String, String, Option<u64>)]) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(MAGIC_NUMBER).await?;
    writer.write_all(RDB_VERSION).await?;
    for (key, value, expire_at_ms) in entries {
        if let Some(at_ms) = expire_at_ms {
            writer.write_u8(OPCODE_EXPIRETIME_MS).await?;
            writer.write_u64_le(*at_ms).await?;
        }
        writer.write_u8(OPCODE_STRING).await?;
        write_len_prefixed(&mut writer, key.as_bytes()).await?;
        write_len_prefixed(&mut writer, value.as_bytes()).await?;
    }
    writer.write_u8(OPCODE_EOF).await?;
    writer.flush().await
}

async fn write_len_prefixed<W>(writer: &mut W, bytes: &[u8]) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_u8(bytes.len() as u8).await?;
    writer.write_all(bytes).await
}

/// Parses a snapshot previously produced by [`write_snapshot`].
pub async fn read_snapshot<R>(mut reader: R) -> io::Result<Vec<(String, String, Option<u64>)>>
where
    R: AsyncRead + Unpin,
{
    let mut magic = [0u8; 5];
    reader.read_exact(&mut magic).await?;
    if &magic != MAGIC_NUMBER {
        return Err(io::Error::new(io::ErrorKind::InvalidData, "invalid snapshot magic number"));
    }
    let mut version = [0u8; 4];
    reader.read_exact(&mut version).await?;

    let mut entries = Vec::new();
    let mut pending_expiry: Option<u64> = None;
    loop {
        let mut marker = [0u8; 1];
        if reader.read_exact(&mut marker).await.is_err() {
            break;
        }
        match marker[0] {
            OPCODE_EXPIRETIME_MS => {
                pending_expiry = Some(reader.read_u64_le().await?);
            }
            OPCODE_STRING => {
                let key = read_len_prefixed(&mut reader).await?;
                let value = read_len_prefixed(&mut reader).await?;
                entries.push((key, value, pending_expiry.take()));
            }
            OPCODE_EOF => break,
            other => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("unsupported snapshot opcode: 0x{:02X}", other),
                ))
            }
        }
    }
    Ok(entries)
}

async fn read_len_prefixed<R>(reader: &mut R) -> io::Result<String>
where
    R: AsyncRead + Unpin,
{
    let len = reader.read_u8().await? as usize;
    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf).await?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn round_trips_keys_with_and_without_expiry() {
        let entries = vec![
            ("a".to_string(), "1".to_string(), None),
            ("b".to_string(), "2".to_string(), Some(1_700_000_000_000)),
        ];
        let mut buf = Vec::new();
        write_snapshot(&mut buf, &entries).await.unwrap();
        let parsed = read_snapshot(&buf[..]).await.unwrap();
        assert_eq!(parsed, entries);
    }

    #[tokio::test]
    async fn rejects_bad_magic() {
        let garbage = b"NOTRDB0011\xFF".to_vec();
        assert!(read_snapshot(&garbage[..]).await.is_err());
    }
}
