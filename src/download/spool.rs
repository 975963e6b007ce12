//! Hybrid memory/disk buffer for transferred content.
//!
//! A [`SpooledBuffer`] starts in memory and moves its content to an anonymous
//! temporary file once a write would take it past the spool limit. Writers
//! only append through [`SpooledBuffer::write_chunk`]; readers go through the
//! [`AsyncRead`]/[`AsyncSeek`] impls and must [`rewind`](SpooledBuffer::rewind)
//! before every read pass.
//!
//! The temporary file is unlinked at creation, so dropping the buffer
//! releases all disk space on every exit path.

use std::io::{self, Cursor, SeekFrom};
use std::path::PathBuf;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncSeek, AsyncSeekExt, AsyncWriteExt, ReadBuf};
use tracing::debug;

enum Backing {
    Memory(Cursor<Vec<u8>>),
    Disk(File),
}

/// Append-then-read byte buffer with a memory ceiling.
pub struct SpooledBuffer {
    backing: Backing,
    spool_limit: u64,
    len: u64,
    spill_dir: Option<PathBuf>,
}

impl std::fmt::Debug for SpooledBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpooledBuffer")
            .field("len", &self.len)
            .field("spool_limit", &self.spool_limit)
            .field("spilled", &self.is_spilled())
            .finish()
    }
}

impl SpooledBuffer {
    /// Creates an empty buffer that spills to the system temp directory.
    ///
    /// A limit of zero keeps nothing in memory: the first write spills.
    #[must_use]
    pub fn new(spool_limit: u64) -> Self {
        Self {
            backing: Backing::Memory(Cursor::new(Vec::new())),
            spool_limit,
            len: 0,
            spill_dir: None,
        }
    }

    /// Creates an empty buffer that spills into `dir`.
    #[must_use]
    pub fn with_spill_dir(spool_limit: u64, dir: impl Into<PathBuf>) -> Self {
        Self {
            spill_dir: Some(dir.into()),
            ..Self::new(spool_limit)
        }
    }

    /// Total bytes written.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Returns true if nothing has been written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns true once the content lives on disk.
    #[must_use]
    pub fn is_spilled(&self) -> bool {
        matches!(self.backing, Backing::Disk(_))
    }

    /// Configured memory ceiling in bytes.
    #[must_use]
    pub fn spool_limit(&self) -> u64 {
        self.spool_limit
    }

    /// Appends `chunk` at the end of the buffer.
    ///
    /// # Errors
    ///
    /// Returns the IO error from creating or writing the temporary file.
    pub async fn write_chunk(&mut self, chunk: &[u8]) -> io::Result<()> {
        if chunk.is_empty() {
            return Ok(());
        }
        let chunk_len = chunk.len() as u64;

        let must_spill = match &self.backing {
            Backing::Memory(_) => self.len.saturating_add(chunk_len) > self.spool_limit,
            Backing::Disk(_) => false,
        };
        if must_spill {
            let file = self.spill().await?;
            self.backing = Backing::Disk(file);
        }

        match &mut self.backing {
            Backing::Memory(cursor) => {
                cursor.get_mut().extend_from_slice(chunk);
            }
            Backing::Disk(file) => {
                file.seek(SeekFrom::End(0)).await?;
                file.write_all(chunk).await?;
            }
        }
        self.len += chunk_len;
        Ok(())
    }

    /// Copies the in-memory content into a fresh anonymous temp file.
    ///
    /// The memory backing is only replaced by the caller once this succeeds.
    async fn spill(&self) -> io::Result<File> {
        let std_file = match &self.spill_dir {
            Some(dir) => tempfile::tempfile_in(dir)?,
            None => tempfile::tempfile()?,
        };
        let mut file = File::from_std(std_file);
        if let Backing::Memory(cursor) = &self.backing {
            file.write_all(cursor.get_ref()).await?;
        }
        file.flush().await?;
        debug!(bytes = self.len, limit = self.spool_limit, "spool spilled to disk");
        Ok(file)
    }

    /// Seeks to byte 0 so the next read pass sees the whole content.
    ///
    /// # Errors
    ///
    /// Returns the IO error from flushing or seeking the temporary file.
    pub async fn rewind(&mut self) -> io::Result<()> {
        match &mut self.backing {
            Backing::Memory(cursor) => {
                cursor.set_position(0);
            }
            Backing::Disk(file) => {
                file.flush().await?;
                file.seek(SeekFrom::Start(0)).await?;
            }
        }
        Ok(())
    }
}

impl AsyncRead for SpooledBuffer {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match &mut self.get_mut().backing {
            Backing::Memory(cursor) => Pin::new(cursor).poll_read(cx, buf),
            Backing::Disk(file) => Pin::new(file).poll_read(cx, buf),
        }
    }
}

impl AsyncSeek for SpooledBuffer {
    fn start_seek(self: Pin<&mut Self>, position: SeekFrom) -> io::Result<()> {
        match &mut self.get_mut().backing {
            Backing::Memory(cursor) => Pin::new(cursor).start_seek(position),
            Backing::Disk(file) => Pin::new(file).start_seek(position),
        }
    }

    fn poll_complete(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<u64>> {
        match &mut self.get_mut().backing {
            Backing::Memory(cursor) => Pin::new(cursor).poll_complete(cx),
            Backing::Disk(file) => Pin::new(file).poll_complete(cx),
        }
    }
}
