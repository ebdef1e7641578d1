//! TFRecord container framing.
//!
//! Every record is laid out as:
//!
//! ```text
//! u64  length           (little endian)
//! u32  masked_crc32c(length bytes)
//! [u8] payload
//! u32  masked_crc32c(payload)
//! ```

use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use crate::error::RecordError;

const MASK_DELTA: u32 = 0xa282_ead8;

/// CRC32-C of `data`, rotated and offset the way TFRecord stores it.
pub fn masked_crc32c(data: &[u8]) -> u32 {
    let crc = crc32c::crc32c(data);
    ((crc >> 15) | (crc << 17)).wrapping_add(MASK_DELTA)
}

/// Appends framed records to an underlying writer.
pub struct TfRecordWriter<W: Write> {
    inner: W,
    records: usize,
}

impl<W: Write> TfRecordWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner, records: 0 }
    }

    /// Writes one framed record.
    pub fn write_record(&mut self, payload: &[u8]) -> io::Result<()> {
        let len = (payload.len() as u64).to_le_bytes();
        self.inner.write_all(&len)?;
        self.inner.write_all(&masked_crc32c(&len).to_le_bytes())?;
        self.inner.write_all(payload)?;
        self.inner.write_all(&masked_crc32c(payload).to_le_bytes())?;
        self.records += 1;
        Ok(())
    }

    /// Number of records written so far.
    pub fn records(&self) -> usize {
        self.records
    }

    /// Flushes and returns the underlying writer.
    pub fn into_inner(mut self) -> io::Result<W> {
        self.inner.flush()?;
        Ok(self.inner)
    }
}

/// Iterates the payloads of a TFRecord stream, verifying both checksums.
pub struct TfRecordReader<R: Read> {
    inner: R,
    path: PathBuf,
    index: usize,
    done: bool,
}

impl<R: Read> TfRecordReader<R> {
    /// `path` is only used in error messages.
    pub fn new(inner: R, path: &Path) -> Self {
        Self {
            inner,
            path: path.to_path_buf(),
            index: 0,
            done: false,
        }
    }

    fn corrupt(&self, message: impl Into<String>) -> RecordError {
        RecordError::RecordCorrupt {
            path: self.path.clone(),
            message: format!("record #{}: {}", self.index, message.into()),
        }
    }

    fn read_record(&mut self) -> Result<Option<Vec<u8>>, RecordError> {
        let mut len_bytes = [0u8; 8];
        let n = read_full(&mut self.inner, &mut len_bytes).map_err(|source| RecordError::Read {
            path: self.path.clone(),
            source,
        })?;
        match n {
            0 => return Ok(None),
            8 => {}
            n => return Err(self.corrupt(format!("truncated length header ({n} of 8 bytes)"))),
        }

        let len_crc = self.read_u32("length checksum")?;
        if len_crc != masked_crc32c(&len_bytes) {
            return Err(self.corrupt("length checksum mismatch"));
        }

        let len = u64::from_le_bytes(len_bytes);
        let len = usize::try_from(len)
            .map_err(|_| self.corrupt(format!("record length {len} does not fit in memory")))?;

        let mut payload = Vec::new();
        let read = (&mut self.inner)
            .take(len as u64)
            .read_to_end(&mut payload)
            .map_err(|source| RecordError::Read {
                path: self.path.clone(),
                source,
            })?;
        if read != len {
            return Err(self.corrupt(format!("truncated payload ({read} of {len} bytes)")));
        }

        let data_crc = self.read_u32("payload checksum")?;
        if data_crc != masked_crc32c(&payload) {
            return Err(self.corrupt("payload checksum mismatch"));
        }

        Ok(Some(payload))
    }

    fn read_u32(&mut self, what: &str) -> Result<u32, RecordError> {
        let mut buf = [0u8; 4];
        let n = read_full(&mut self.inner, &mut buf).map_err(|source| RecordError::Read {
            path: self.path.clone(),
            source,
        })?;
        if n != buf.len() {
            return Err(self.corrupt(format!("truncated {what}")));
        }
        Ok(u32::from_le_bytes(buf))
    }
}

impl<R: Read> Iterator for TfRecordReader<R> {
    type Item = Result<Vec<u8>, RecordError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match self.read_record() {
            Ok(Some(payload)) => {
                self.index += 1;
                Some(Ok(payload))
            }
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

/// Reads until `buf` is full or EOF, returning the number of bytes read.
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
            Err(err) => return Err(err),
        }
    }
    Ok(filled)
}
