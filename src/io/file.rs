use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use memmap2::Mmap;

use super::{not_open, temporary_path, ByteMap, OpenMode};
use crate::error::{ErrorCode, TiffError, TiffResult};

/// The direction a file handle is currently buffered for.
enum Handle {
    Reader(BufReader<File>),
    Writer(BufWriter<File>),
}

impl Handle {
    fn file(&self) -> &File {
        match self {
            Handle::Reader(r) => r.get_ref(),
            Handle::Writer(w) => w.get_ref(),
        }
    }
}

/// A byte store backed by a file.
///
/// Reads and writes are buffered. Switching from writing to reading flushes pending writes; a
/// write to a store opened for reading only reopens the file for reading and writing at the
/// same position.
pub struct FileStore {
    path: PathBuf,
    handle: Option<Handle>,
    mode: Option<OpenMode>,
    writable: bool,
    temporary: bool,
}

impl FileStore {
    /// A closed store for `path`.
    pub fn new(path: impl AsRef<Path>) -> Self {
        FileStore {
            path: path.as_ref().to_path_buf(),
            handle: None,
            mode: None,
            writable: false,
            temporary: false,
        }
    }

    /// Create an empty scratch file next to `path`, opened for writing.
    ///
    /// The file is removed when the store is dropped, unless it was published with
    /// [`ByteStore::transfer_into`](super::ByteStore::transfer_into).
    pub fn temporary_for(path: impl AsRef<Path>) -> TiffResult<Self> {
        let target = path.as_ref();
        let mut store = FileStore::new(temporary_path(target));
        store.temporary = true;
        store.open(OpenMode::Write).map_err(|err| {
            TiffError::new(ErrorCode::TemporaryFailed)
                .arg(target.display())
                .arg(err)
        })?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_temporary(&self) -> bool {
        self.temporary
    }

    pub(super) fn publish(&mut self) {
        self.temporary = false;
    }

    /// Open the file, closing a previously open handle first.
    pub fn open(&mut self, mode: OpenMode) -> TiffResult<()> {
        self.close()?;

        let mut options = OpenOptions::new();
        match mode {
            OpenMode::Read => options.read(true),
            OpenMode::Write => options.read(true).write(true).create(true).truncate(true),
            OpenMode::ReadWrite => options.read(true).write(true),
        };

        let file = options.open(&self.path).map_err(|err| {
            TiffError::new(ErrorCode::OpenFailed)
                .arg(self.path.display())
                .arg(mode)
                .arg(err)
        })?;

        log::trace!("{}: opened in {} mode", self.path.display(), mode);
        self.handle = Some(Handle::Reader(BufReader::new(file)));
        self.writable = mode != OpenMode::Read;
        self.mode = Some(mode);
        Ok(())
    }

    /// Flush pending writes and release the handle. Closing a closed store does nothing.
    pub fn close(&mut self) -> TiffResult<()> {
        let result = self.flush_writes();
        self.handle = None;
        self.mode = None;
        result
    }

    pub fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    /// The mode passed to the last successful [`open`](Self::open).
    pub fn mode(&self) -> Option<OpenMode> {
        self.mode
    }

    fn check_open(&self) -> TiffResult<()> {
        if self.is_open() {
            Ok(())
        } else {
            Err(TiffError::new(ErrorCode::NotOpen).arg(self.path.display()))
        }
    }

    fn failure(&self, code: ErrorCode, err: io::Error) -> TiffError {
        TiffError::new(code).arg(self.path.display()).arg(err)
    }

    fn reader(&mut self) -> io::Result<&mut BufReader<File>> {
        if let Some(Handle::Writer(writer)) = &mut self.handle {
            writer.flush()?;
            let file = writer.get_ref().try_clone()?;
            self.handle = Some(Handle::Reader(BufReader::new(file)));
        }

        match &mut self.handle {
            Some(Handle::Reader(reader)) => Ok(reader),
            _ => Err(not_open()),
        }
    }

    fn writer(&mut self) -> io::Result<&mut BufWriter<File>> {
        if let Some(Handle::Reader(reader)) = &mut self.handle {
            let position = reader.stream_position()?;
            let mut file = if self.writable {
                reader.get_ref().try_clone()?
            } else {
                log::debug!("{}: reopening for writing", self.path.display());
                OpenOptions::new().read(true).write(true).open(&self.path)?
            };
            file.seek(SeekFrom::Start(position))?;
            self.writable = true;
            self.handle = Some(Handle::Writer(BufWriter::new(file)));
        }

        match &mut self.handle {
            Some(Handle::Writer(writer)) => Ok(writer),
            _ => Err(not_open()),
        }
    }

    fn flush_writes(&mut self) -> TiffResult<()> {
        if let Some(Handle::Writer(writer)) = &mut self.handle {
            if let Err(err) = writer.flush() {
                return Err(self.failure(ErrorCode::WriteFailed, err));
            }
        }
        Ok(())
    }

    /// Read up to `count` bytes; fewer are returned at the end of the file.
    pub fn read(&mut self, count: usize) -> TiffResult<Vec<u8>> {
        self.check_open()?;
        let mut buf = Vec::new();
        let result = self
            .reader()
            .and_then(|reader| reader.by_ref().take(count as u64).read_to_end(&mut buf));
        match result {
            Ok(_) => Ok(buf),
            Err(err) => Err(self.failure(ErrorCode::ReadFailed, err)),
        }
    }

    /// Fill as much of `buf` as possible and return the number of bytes read.
    pub fn read_into(&mut self, buf: &mut [u8]) -> TiffResult<usize> {
        self.check_open()?;
        let mut filled = 0;
        while filled < buf.len() {
            match Read::read(self, &mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(self.failure(ErrorCode::ReadFailed, err)),
            }
        }
        Ok(filled)
    }

    pub fn write(&mut self, bytes: &[u8]) -> TiffResult<usize> {
        self.check_open()?;
        match self.writer().and_then(|writer| writer.write_all(bytes)) {
            Ok(()) => Ok(bytes.len()),
            Err(err) => Err(self.failure(ErrorCode::WriteFailed, err)),
        }
    }

    pub fn seek(&mut self, pos: SeekFrom) -> TiffResult<u64> {
        self.check_open()?;
        Seek::seek(self, pos).map_err(|err| {
            TiffError::new(ErrorCode::SeekFailed)
                .arg(self.path.display())
                .arg(format_args!("{pos:?}"))
                .arg(err)
        })
    }

    pub fn position(&mut self) -> TiffResult<u64> {
        self.seek(SeekFrom::Current(0))
    }

    /// The size of the file, including pending writes.
    pub fn size(&mut self) -> TiffResult<u64> {
        self.flush_writes()?;
        let metadata = match &self.handle {
            Some(handle) => handle.file().metadata(),
            None => fs::metadata(&self.path),
        };
        metadata
            .map(|m| m.len())
            .map_err(|err| self.failure(ErrorCode::ReadFailed, err))
    }

    /// A read-only view of the whole file.
    ///
    /// Falls back to reading the file when it cannot be mapped, e.g. because it is empty.
    pub fn map(&mut self) -> TiffResult<ByteMap<'static>> {
        self.check_open()?;
        self.flush_writes()?;

        if let Some(handle) = &self.handle {
            let file = handle.file();
            let len = file
                .metadata()
                .map_err(|err| self.failure(ErrorCode::MapFailed, err))?
                .len();
            if len > 0 {
                // SAFETY: the map is read-only and owns no reference into this store.
                match unsafe { Mmap::map(file) } {
                    Ok(map) => return Ok(ByteMap::Mapped(map)),
                    Err(err) => log::debug!("{}: cannot map, reading: {err}", self.path.display()),
                }
            }
        }

        fs::read(&self.path)
            .map(ByteMap::Owned)
            .map_err(|err| self.failure(ErrorCode::MapFailed, err))
    }
}

impl Read for FileStore {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader()?.read(buf)
    }
}

impl Write for FileStore {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writer()?.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        match &mut self.handle {
            Some(Handle::Writer(writer)) => writer.flush(),
            _ => Ok(()),
        }
    }
}

impl Seek for FileStore {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        match &mut self.handle {
            Some(Handle::Reader(reader)) => reader.seek(pos),
            Some(Handle::Writer(writer)) => writer.seek(pos),
            None => Err(not_open()),
        }
    }
}

impl Drop for FileStore {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            log::warn!("{err}");
        }
        if self.temporary {
            if let Err(err) = fs::remove_file(&self.path) {
                log::debug!("{}: cannot remove temporary file: {err}", self.path.display());
            }
        }
    }
}

impl std::fmt::Debug for FileStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileStore")
            .field("path", &self.path)
            .field("mode", &self.mode)
            .field("temporary", &self.temporary)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read_switches_direction() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::new(dir.path().join("a.bin"));
        store.open(OpenMode::Write).unwrap();
        assert_eq!(store.write(b"hello world").unwrap(), 11);
        store.seek(SeekFrom::Start(6)).unwrap();
        assert_eq!(store.read(16).unwrap(), b"world");
        assert_eq!(store.size().unwrap(), 11);
    }

    #[test]
    fn write_on_read_only_handle_reopens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("b.bin");
        fs::write(&path, b"0123456789").unwrap();

        let mut store = FileStore::new(&path);
        store.open(OpenMode::Read).unwrap();
        assert_eq!(store.read(4).unwrap(), b"0123");
        store.write(b"ab").unwrap();
        assert_eq!(store.position().unwrap(), 6);
        store.close().unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"0123ab6789");
    }

    #[test]
    fn open_failures() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::new(dir.path().join("missing"));
        let err = store.open(OpenMode::ReadWrite).unwrap_err();
        assert_eq!(err.code(), ErrorCode::OpenFailed);
        assert!(!store.is_open());
        assert_eq!(store.read(1).unwrap_err().code(), ErrorCode::NotOpen);
    }

    #[test]
    fn map_falls_back_for_empty_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::new(dir.path().join("empty"));
        store.open(OpenMode::Write).unwrap();
        assert!(store.map().unwrap().is_empty());

        store.write(b"II*\0").unwrap();
        assert_eq!(&*store.map().unwrap(), b"II*\0");
    }

    #[test]
    fn temporary_files_are_removed() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("photo.tif");
        let path = {
            let mut tmp = FileStore::temporary_for(&target).unwrap();
            tmp.write(b"scratch").unwrap();
            assert!(tmp.path().exists());
            assert_eq!(tmp.path().parent(), Some(dir.path()));
            tmp.path().to_path_buf()
        };
        assert!(!path.exists());
    }
}
