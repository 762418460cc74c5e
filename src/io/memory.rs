use std::io::{self, Read, Seek, SeekFrom, Write};

use super::{ByteMap, OpenMode};
use crate::error::{ErrorCode, TiffError, TiffResult};

/// A growable in-memory byte store. It is always open.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MemStore {
    data: Vec<u8>,
    position: usize,
}

impl MemStore {
    pub fn new() -> Self {
        MemStore::default()
    }

    pub fn from_vec(data: Vec<u8>) -> Self {
        MemStore { data, position: 0 }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }

    pub(super) fn replace(&mut self, data: Vec<u8>) {
        self.data = data;
        self.position = 0;
    }

    /// Rewind; `Write` also discards the content.
    pub fn open(&mut self, mode: OpenMode) -> TiffResult<()> {
        if mode == OpenMode::Write {
            self.data.clear();
        }
        self.position = 0;
        Ok(())
    }

    pub fn close(&mut self) -> TiffResult<()> {
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        true
    }

    fn remaining(&self) -> &[u8] {
        self.data.get(self.position..).unwrap_or_default()
    }

    /// Read up to `count` bytes; fewer are returned at the end of the data.
    pub fn read(&mut self, count: usize) -> TiffResult<Vec<u8>> {
        let n = count.min(self.remaining().len());
        let bytes = self.remaining()[..n].to_vec();
        self.position += n;
        Ok(bytes)
    }

    pub fn read_into(&mut self, buf: &mut [u8]) -> TiffResult<usize> {
        let n = buf.len().min(self.remaining().len());
        buf[..n].copy_from_slice(&self.remaining()[..n]);
        self.position += n;
        Ok(n)
    }

    /// Overwrite at the current position, growing the buffer as needed.
    pub fn write(&mut self, bytes: &[u8]) -> TiffResult<usize> {
        let end = self.position + bytes.len();
        if end > self.data.len() {
            self.data.resize(end, 0);
        }
        self.data[self.position..end].copy_from_slice(bytes);
        self.position = end;
        Ok(bytes.len())
    }

    /// Move the position. Positions before the start or beyond the end of the data fail.
    pub fn seek(&mut self, pos: SeekFrom) -> TiffResult<u64> {
        let (base, delta) = match pos {
            SeekFrom::Start(n) => (0, i128::from(n)),
            SeekFrom::Current(n) => (self.position, i128::from(n)),
            SeekFrom::End(n) => (self.data.len(), i128::from(n)),
        };
        let target = base as i128 + delta;
        if target < 0 || target > self.data.len() as i128 {
            return Err(TiffError::new(ErrorCode::SeekFailed)
                .arg("memory")
                .arg(format_args!("{pos:?}"))
                .arg(format_args!("the data has {} bytes", self.data.len())));
        }
        // In range of the buffer length.
        self.position = target as usize;
        Ok(self.position as u64)
    }

    pub fn position(&self) -> u64 {
        self.position as u64
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn map(&self) -> ByteMap<'_> {
        ByteMap::Borrowed(&self.data)
    }
}

impl Read for MemStore {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Ok(self.read_into(buf).unwrap_or_default())
    }
}

impl Write for MemStore {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(MemStore::write(self, buf).unwrap_or_default())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Seek for MemStore {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        MemStore::seek(self, pos).map_err(|err| io::Error::new(io::ErrorKind::InvalidInput, err))
    }
}
