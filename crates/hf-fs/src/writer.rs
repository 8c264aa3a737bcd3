use std::path::Path;
use std::sync::{Mutex, OnceLock};

use sha2::{Digest, Sha256};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt, BufWriter};

/// Buffered writer size target (spec §4.2: "≥1 MiB").
const BUFFER_TARGET: usize = 1024 * 1024;
/// Size of the reusable copy buffers used to tee a reader into the file and
/// the hasher in one pass (spec §4.2).
const COPY_BUFFER_SIZE: usize = 32 * 1024;

fn copy_buffer_pool() -> &'static Mutex<Vec<Vec<u8>>> {
    static POOL: OnceLock<Mutex<Vec<Vec<u8>>>> = OnceLock::new();
    POOL.get_or_init(|| Mutex::new(Vec::new()))
}

struct PooledBuffer(Option<Vec<u8>>);

impl PooledBuffer {
    fn acquire() -> Self {
        let buf = copy_buffer_pool()
            .lock()
            .expect("copy buffer pool poisoned")
            .pop()
            .unwrap_or_else(|| vec![0u8; COPY_BUFFER_SIZE]);
        Self(Some(buf))
    }
}

impl std::ops::Deref for PooledBuffer {
    type Target = Vec<u8>;
    fn deref(&self) -> &Vec<u8> {
        self.0.as_ref().expect("buffer taken")
    }
}

impl std::ops::DerefMut for PooledBuffer {
    fn deref_mut(&mut self) -> &mut Vec<u8> {
        self.0.as_mut().expect("buffer taken")
    }
}

impl Drop for PooledBuffer {
    fn drop(&mut self) {
        if let Some(buf) = self.0.take() {
            copy_buffer_pool()
                .lock()
                .expect("copy buffer pool poisoned")
                .push(buf);
        }
    }
}

/// Wraps an OS file with a large buffered writer and, where the target
/// platform supports it, preallocates `size_hint` bytes before the first
/// write. Provides a streaming tee into a SHA-256 hasher so the digest is
/// computed in the same pass that copies the content to disk — no second
/// read of the payload is required in the happy path (spec §4.2).
pub struct FastWriter {
    file: BufWriter<tokio::fs::File>,
    hasher: Sha256,
    bytes_written: u64,
}

impl FastWriter {
    /// Creates (truncating if present) the file at `path`, preallocating
    /// `size_hint` bytes when provided. Preallocation failure is not fatal:
    /// not every filesystem supports `set_len` ahead of content, and the
    /// write path below does not depend on it succeeding.
    pub async fn create(path: impl AsRef<Path>, size_hint: Option<u64>) -> std::io::Result<Self> {
        let file = tokio::fs::File::create(path).await?;
        if let Some(size) = size_hint {
            if size > 0 {
                let _ = file.set_len(size).await;
            }
        }
        Ok(Self {
            file: BufWriter::with_capacity(BUFFER_TARGET, file),
            hasher: Sha256::new(),
            bytes_written: 0,
        })
    }

    /// Streams `reader` to disk and into the digest in 32 KiB chunks using a
    /// pooled copy buffer. Returns the number of bytes copied.
    pub async fn tee_from<R: AsyncRead + Unpin>(&mut self, mut reader: R) -> std::io::Result<u64> {
        let mut buf = PooledBuffer::acquire();
        loop {
            let n = reader.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            self.hasher.update(&buf[..n]);
            self.file.write_all(&buf[..n]).await?;
            self.bytes_written += n as u64;
        }
        Ok(self.bytes_written)
    }

    /// Flushes the buffered writer and returns the lowercase hex SHA-256
    /// digest of everything written, along with the total byte count.
    pub async fn finish(mut self) -> std::io::Result<(String, u64)> {
        self.file.flush().await?;
        Ok((hex::encode(self.hasher.finalize()), self.bytes_written))
    }
}
