//! Append-only replication log: a sequence of `write2file<N>` segment files under the binlog
//! directory, each holding length+crc32-framed command records. The producer cursor
//! `(filenum, offset)` this module exposes is what `SLAVEOF`'s `trysync`/psync path and
//! `PURGELOGSTO` operate on.

use std::io;
use std::path::{Path, PathBuf};

use byteorder::{BigEndian, ByteOrder};
use crc::{Crc, CRC_32_ISO_HDLC};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt, SeekFrom};
use tokio::sync::Mutex;

use crate::errors::BinlogError;

/// Upper bound on how large a single segment file is allowed to grow before the producer rolls
/// over to the next `write2file<N>`. A round number; the exact figure is implementation-defined.
pub const MMAP_SIZE: u64 = 1024 * 1024 * 1024;

const SEGMENT_PREFIX: &str = "write2file";
const FRAME_HEADER_LEN: u64 = 8; // 4-byte length + 4-byte crc32

fn segment_path(dir: &Path, filenum: u32) -> PathBuf {
    dir.join(format!("{}{}", SEGMENT_PREFIX, filenum))
}

/// Parses a `write2fileN` basename into its numeric suffix, as `PURGELOGSTO` does.
pub fn parse_segment_name(name: &str) -> Option<u32> {
    name.strip_prefix(SEGMENT_PREFIX)?.parse().ok()
}

struct Inner {
    filenum: u32,
    offset: u64,
    file: Option<File>,
    /// Lowest filenum any attached slave has acknowledged; `None` when no slave has ever acked
    /// (see DESIGN.md Open Question decisions for how that case is handled).
    consumer_max: Option<u32>,
}

pub struct Binlog {
    dir: PathBuf,
    inner: Mutex<Inner>,
}

impl Binlog {
    pub async fn open(dir: impl AsRef<Path>) -> io::Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).await?;
        Ok(Binlog {
            dir,
            inner: Mutex::new(Inner { filenum: 0, offset: 0, file: None, consumer_max: None }),
        })
    }

    /// Producer's current write position.
    pub async fn producer_cursor(&self) -> (u32, u64) {
        let inner = self.inner.lock().await;
        (inner.filenum, inner.offset)
    }

    async fn ensure_open(&self, inner: &mut Inner) -> io::Result<()> {
        if inner.file.is_none() {
            let path = segment_path(&self.dir, inner.filenum);
            let file = OpenOptions::new().create(true).append(true).open(&path).await?;
            inner.file = Some(file);
        }
        Ok(())
    }

    /// Appends one request's arguments as a RESP multi-bulk array, framed with a length prefix
    /// and a CRC32 checksum, rotating to the next segment if this write would exceed
    /// [`MMAP_SIZE`].
    pub async fn append(&self, args: &[String]) -> io::Result<(u32, u64)> {
        let payload = encode_multibulk(args);
        let crc = Crc::<u32>::new(&CRC_32_ISO_HDLC).checksum(&payload);

        let mut inner = self.inner.lock().await;
        if inner.offset + FRAME_HEADER_LEN + payload.len() as u64 > MMAP_SIZE {
            inner.filenum += 1;
            inner.offset = 0;
            inner.file = None;
        }
        self.ensure_open(&mut inner).await?;

        let mut header = [0u8; FRAME_HEADER_LEN as usize];
        BigEndian::write_u32(&mut header[0..4], payload.len() as u32);
        BigEndian::write_u32(&mut header[4..8], crc);

        let file = inner.file.as_mut().expect("ensure_open just set this");
        file.write_all(&header).await?;
        file.write_all(&payload).await?;
        file.flush().await?;

        inner.offset += FRAME_HEADER_LEN + payload.len() as u64;
        Ok((inner.filenum, inner.offset))
    }

    /// Overwrites the producer cursor to resume from a psync tail `(filenum, offset)`, as
    /// `SLAVEOF`'s psync path does when the slave already holds a prefix of the log.
    pub async fn set_producer_status(&self, filenum: u32, offset: u64) -> Result<(), BinlogError> {
        let path = segment_path(&self.dir, filenum);
        let meta = fs::metadata(&path).await.map_err(|_| BinlogError::NoSuchSegment(filenum))?;
        if offset > meta.len() || offset > MMAP_SIZE {
            return Err(BinlogError::OffsetOutOfRange);
        }
        let mut inner = self.inner.lock().await;
        inner.filenum = filenum;
        inner.offset = offset;
        let mut file = OpenOptions::new().write(true).open(&path).await?;
        file.seek(SeekFrom::Start(offset)).await?;
        file.set_len(offset).await?;
        inner.file = Some(file);
        Ok(())
    }

    /// Records that a slave has acknowledged up through `filenum`; `consumer_max` tracks the
    /// minimum across all slaves seen so far. `None` means no slave has acked yet.
    pub async fn record_ack(&self, filenum: u32) {
        let mut inner = self.inner.lock().await;
        inner.consumer_max = Some(match inner.consumer_max {
            Some(existing) => existing.min(filenum),
            None => filenum,
        });
    }

    /// Safe purge high-water mark: the producer's own filenum when no slave has ever acked.
    pub async fn consumer_max(&self) -> u32 {
        let inner = self.inner.lock().await;
        inner.consumer_max.unwrap_or(inner.filenum)
    }

    /// Deletes segment files from `write2file0` up to (but excluding) `write2file<to>`, without
    /// re-checking the 10-file safety margin (the caller already did, or is resuming a psync and
    /// knows better).
    pub async fn purge_logs_nolock(&self, to: u32) -> io::Result<u32> {
        let mut purged = 0;
        for filenum in 0..to {
            let path = segment_path(&self.dir, filenum);
            if fs::remove_file(&path).await.is_ok() {
                purged += 1;
            }
        }
        Ok(purged)
    }

    /// `PURGELOGSTO`'s safety-margin-checked purge: refuses to purge within 10 files of the
    /// current consumer `max`.
    pub async fn purge_logs_to(&self, to: u32) -> Result<u32, BinlogError> {
        let max = self.consumer_max().await;
        if to + 10 > max {
            return Err(BinlogError::UnsafePurge);
        }
        Ok(self.purge_logs_nolock(to).await?)
    }
}

fn encode_multibulk(args: &[String]) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(format!("*{}\r\n", args.len()).as_bytes());
    for arg in args {
        buf.extend_from_slice(format!("${}\r\n", arg.len()).as_bytes());
        buf.extend_from_slice(arg.as_bytes());
        buf.extend_from_slice(b"\r\n");
    }
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn append_advances_offset_monotonically() {
        let dir = tempdir();
        let binlog = Binlog::open(&dir).await.unwrap();
        let (f0, o0) = binlog.append(&["set".into(), "k".into(), "v".into()]).await.unwrap();
        let (f1, o1) = binlog.append(&["set".into(), "k2".into(), "v2".into()]).await.unwrap();
        assert_eq!(f0, f1);
        assert!(o1 > o0);
    }

    #[tokio::test]
    async fn purge_to_refuses_within_safety_margin() {
        let dir = tempdir();
        let binlog = Binlog::open(&dir).await.unwrap();
        binlog.record_ack(5).await;
        assert!(binlog.purge_logs_to(0).await.is_ok());
        assert!(matches!(binlog.purge_logs_to(1).await, Err(BinlogError::UnsafePurge)));
    }

    #[tokio::test]
    async fn parse_segment_name_extracts_filenum() {
        assert_eq!(parse_segment_name("write2file42"), Some(42));
        assert_eq!(parse_segment_name("bogus"), None);
    }

    fn tempdir() -> PathBuf {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        let mut dir = std::env::temp_dir();
        let n = COUNTER.fetch_add(1, Ordering::Relaxed);
        dir.push(format!("pika-core-binlog-test-{}-{}", std::process::id(), n));
        dir
    }
}
