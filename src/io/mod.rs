//! Random access byte stores over files and memory buffers.
use std::fmt;
use std::fs;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use memmap2::Mmap;

use crate::error::{ErrorCode, TiffError, TiffResult};

mod file;
mod memory;

pub use self::file::FileStore;
pub use self::memory::MemStore;

/// How a store is opened.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpenMode {
    Read,
    /// Create the file, or truncate an existing one.
    Write,
    /// Read and write an existing file.
    ReadWrite,
}

impl fmt::Display for OpenMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OpenMode::Read => "read",
            OpenMode::Write => "write",
            OpenMode::ReadWrite => "read-write",
        })
    }
}

/// A read-only view of the whole content of a store.
pub enum ByteMap<'a> {
    Borrowed(&'a [u8]),
    Mapped(Mmap),
    /// The content was read because it could not be mapped.
    Owned(Vec<u8>),
}

impl Deref for ByteMap<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            ByteMap::Borrowed(bytes) => bytes,
            ByteMap::Mapped(map) => map,
            ByteMap::Owned(bytes) => bytes,
        }
    }
}

impl fmt::Debug for ByteMap<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            ByteMap::Borrowed(_) => "Borrowed",
            ByteMap::Mapped(_) => "Mapped",
            ByteMap::Owned(_) => "Owned",
        };
        f.debug_struct("ByteMap")
            .field("kind", &kind)
            .field("len", &self.len())
            .finish()
    }
}

pub(crate) fn not_open() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "the store is not open")
}

static TEMPORARY_COUNTER: Mutex<u64> = Mutex::new(0);

/// A fresh name for a scratch file in the directory of `path`.
///
/// Names are unique within the process; the counter is shared by all threads.
pub fn temporary_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map_or_else(|| "tiff-meta".into(), |n| n.to_string_lossy());
    let pid = std::process::id();

    loop {
        let n = {
            let mut counter = TEMPORARY_COUNTER
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            *counter += 1;
            *counter
        };
        let candidate = path.with_file_name(format!("{name}.{pid}-{n}.tmp"));
        if !candidate.exists() {
            return candidate;
        }
    }
}

/// A byte store over a file or a memory buffer.
#[derive(Debug)]
pub enum ByteStore {
    File(FileStore),
    Memory(MemStore),
}

macro_rules! dispatch {
    ($self:expr, $store:ident => $body:expr) => {
        match $self {
            ByteStore::File($store) => $body,
            ByteStore::Memory($store) => $body,
        }
    };
}

impl ByteStore {
    /// A closed store over the file at `path`.
    pub fn file(path: impl AsRef<Path>) -> Self {
        ByteStore::File(FileStore::new(path))
    }

    pub fn memory(data: Vec<u8>) -> Self {
        ByteStore::Memory(MemStore::from_vec(data))
    }

    /// A name for messages: the path of a file, `memory` otherwise.
    pub fn name(&self) -> String {
        match self {
            ByteStore::File(f) => f.path().display().to_string(),
            ByteStore::Memory(_) => "memory".to_string(),
        }
    }

    pub fn open(&mut self, mode: OpenMode) -> TiffResult<()> {
        dispatch!(self, s => s.open(mode))
    }

    pub fn close(&mut self) -> TiffResult<()> {
        dispatch!(self, s => s.close())
    }

    pub fn is_open(&self) -> bool {
        dispatch!(self, s => s.is_open())
    }

    /// Read up to `count` bytes and advance the position.
    pub fn read(&mut self, count: usize) -> TiffResult<Vec<u8>> {
        dispatch!(self, s => s.read(count))
    }

    pub fn read_into(&mut self, buf: &mut [u8]) -> TiffResult<usize> {
        dispatch!(self, s => s.read_into(buf))
    }

    /// Fill `buf` completely, failing with `Truncated` at the end of the data.
    pub fn read_exact_into(&mut self, buf: &mut [u8]) -> TiffResult<()> {
        let position = self.position()?;
        let n = self.read_into(buf)?;
        if n < buf.len() {
            return Err(TiffError::new(ErrorCode::Truncated)
                .arg(buf.len())
                .arg(position)
                .arg(n));
        }
        Ok(())
    }

    pub fn write(&mut self, bytes: &[u8]) -> TiffResult<usize> {
        dispatch!(self, s => s.write(bytes))
    }

    pub fn seek(&mut self, pos: SeekFrom) -> TiffResult<u64> {
        dispatch!(self, s => s.seek(pos))
    }

    pub fn position(&mut self) -> TiffResult<u64> {
        match self {
            ByteStore::File(f) => f.position(),
            ByteStore::Memory(m) => Ok(m.position()),
        }
    }

    pub fn size(&mut self) -> TiffResult<u64> {
        match self {
            ByteStore::File(f) => f.size(),
            ByteStore::Memory(m) => Ok(m.size()),
        }
    }

    /// A read-only view of the whole content.
    pub fn map(&mut self) -> TiffResult<ByteMap<'_>> {
        match self {
            ByteStore::File(f) => f.map(),
            ByteStore::Memory(m) => Ok(m.map()),
        }
    }

    /// Replace the content of `dest` with the content of this store and consume it.
    ///
    /// Between files the backing file is renamed over the destination, which fails across file
    /// systems. Memory is moved into memory. Otherwise the bytes are copied; a memory source is
    /// written to a scratch file next to the destination which is then renamed over it. A
    /// destination that was open is reopened, in read-write mode if it was opened for writing.
    pub fn transfer_into(mut self, dest: &mut ByteStore) -> TiffResult<()> {
        let (src_name, dst_name) = (self.name(), dest.name());
        let failed = |err: io::Error| {
            TiffError::new(ErrorCode::TransferFailed)
                .arg(&src_name)
                .arg(&dst_name)
                .arg(err)
        };

        let reopen = match dest {
            ByteStore::File(f) => f.mode().map(|mode| match mode {
                OpenMode::Write => OpenMode::ReadWrite,
                other => other,
            }),
            ByteStore::Memory(_) => None,
        };
        dest.close()?;
        self.close()?;

        match (&mut self, &mut *dest) {
            (ByteStore::File(src), ByteStore::File(dst)) => {
                log::debug!("renaming {src_name} to {dst_name}");
                fs::rename(src.path(), dst.path()).map_err(failed)?;
                src.publish();
            }
            (ByteStore::Memory(src), ByteStore::Memory(dst)) => {
                dst.replace(std::mem::take(src).into_inner());
            }
            (ByteStore::Memory(src), ByteStore::File(dst)) => {
                let scratch = temporary_path(dst.path());
                let written = fs::write(&scratch, src.as_slice())
                    .and_then(|()| fs::rename(&scratch, dst.path()));
                if let Err(err) = written {
                    // The scratch file may not exist.
                    let _ = fs::remove_file(&scratch);
                    return Err(failed(err));
                }
            }
            (ByteStore::File(src), ByteStore::Memory(dst)) => {
                dst.replace(fs::read(src.path()).map_err(failed)?);
            }
        }

        if let (ByteStore::File(dst), Some(mode)) = (dest, reopen) {
            dst.open(mode)?;
        }
        Ok(())
    }
}

impl Read for ByteStore {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        dispatch!(self, s => Read::read(s, buf))
    }
}

impl Write for ByteStore {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        dispatch!(self, s => Write::write(s, buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        dispatch!(self, s => Write::flush(s))
    }
}

impl Seek for ByteStore {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        dispatch!(self, s => Seek::seek(s, pos))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temporary_names_are_unique() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("img.tif");
        let a = temporary_path(&target);
        let b = temporary_path(&target);
        assert_ne!(a, b);
        assert_eq!(a.parent(), Some(dir.path()));
        assert!(a.to_string_lossy().ends_with(".tmp"));
    }

    #[test]
    fn memory_into_memory_moves_the_buffer() {
        let src = ByteStore::memory(b"new".to_vec());
        let mut dst = ByteStore::memory(b"old content".to_vec());
        src.transfer_into(&mut dst).unwrap();
        assert_eq!(&*dst.map().unwrap(), b"new");
        assert_eq!(dst.position().unwrap(), 0);
    }

    #[test]
    fn exact_reads_report_truncation() {
        let mut store = ByteStore::memory(vec![1, 2, 3]);
        let mut buf = [0; 4];
        let err = store.read_exact_into(&mut buf).unwrap_err();
        assert_eq!(err.code(), ErrorCode::Truncated);
        assert_eq!(err.args(), ["4", "0", "3"]);
    }
}
