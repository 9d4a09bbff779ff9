//! Byte-addressed record storage.
//!
//! A record is three little-endian `f64` values (24 bytes). Erased bytes read
//! as `0xFF`. [`FileEeprom`] keeps the same image on disk and rewrites the
//! whole file atomically after every record write.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use linebot_traits::{HwResult, RecordStore};

use crate::error::{HwError, Result};

/// Bytes occupied by one record.
pub const RECORD_BYTES: usize = 3 * std::mem::size_of::<f64>();
/// Value of an erased byte.
pub const ERASED: u8 = 0xFF;

#[derive(Debug, Clone)]
pub struct MemoryEeprom {
    bytes: Vec<u8>,
}

impl MemoryEeprom {
    pub fn new(size_bytes: usize) -> Self {
        Self {
            bytes: vec![ERASED; size_bytes],
        }
    }

    pub fn from_image(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn image(&self) -> &[u8] {
        &self.bytes
    }

    fn span(&self, address: u16) -> Result<std::ops::Range<usize>> {
        let start = usize::from(address);
        let end = start + RECORD_BYTES;
        if end > self.bytes.len() {
            return Err(HwError::AddressOutOfRange {
                address,
                len: RECORD_BYTES,
                capacity: self.bytes.len(),
            });
        }
        Ok(start..end)
    }

    pub fn write(&mut self, address: u16, record: [f64; 3]) -> Result<()> {
        let span = self.span(address)?;
        let dst = &mut self.bytes[span];
        for (chunk, v) in dst.chunks_exact_mut(8).zip(record) {
            chunk.copy_from_slice(&v.to_le_bytes());
        }
        Ok(())
    }

    pub fn read(&self, address: u16) -> Result<[f64; 3]> {
        let span = self.span(address)?;
        let src = &self.bytes[span];
        let mut out = [0.0f64; 3];
        for (v, chunk) in out.iter_mut().zip(src.chunks_exact(8)) {
            let mut b = [0u8; 8];
            b.copy_from_slice(chunk);
            *v = f64::from_le_bytes(b);
        }
        Ok(out)
    }

    /// True when every byte of the record at `address` is erased.
    pub fn is_erased(&self, address: u16) -> Result<bool> {
        let span = self.span(address)?;
        Ok(self.bytes[span].iter().all(|b| *b == ERASED))
    }
}

impl RecordStore for MemoryEeprom {
    fn write_record(&mut self, address: u16, record: [f64; 3]) -> HwResult<()> {
        Ok(self.write(address, record)?)
    }
    fn read_record(&mut self, address: u16) -> HwResult<[f64; 3]> {
        Ok(self.read(address)?)
    }
    fn capacity_bytes(&self) -> usize {
        self.bytes.len()
    }
}

/// EEPROM image persisted to a file.
#[derive(Debug)]
pub struct FileEeprom {
    path: PathBuf,
    mem: MemoryEeprom,
}

impl FileEeprom {
    /// Open `path`, creating an erased image of `size_bytes` if it does not exist.
    /// An existing image must have exactly `size_bytes` bytes.
    pub fn open(path: impl Into<PathBuf>, size_bytes: usize) -> Result<Self> {
        let path = path.into();
        let mem = if path.exists() {
            let bytes = fs::read(&path)?;
            if bytes.len() != size_bytes {
                return Err(HwError::Corrupt(format!(
                    "{} holds {} bytes, expected {}",
                    path.display(),
                    bytes.len(),
                    size_bytes
                )));
            }
            MemoryEeprom::from_image(bytes)
        } else {
            let mem = MemoryEeprom::new(size_bytes);
            write_atomic(&path, mem.image())?;
            mem
        };
        tracing::debug!(path = %path.display(), size_bytes, "record store opened");
        Ok(Self { path, mem })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_erased(&self, address: u16) -> Result<bool> {
        self.mem.is_erased(address)
    }
}

impl RecordStore for FileEeprom {
    fn write_record(&mut self, address: u16, record: [f64; 3]) -> HwResult<()> {
        self.mem.write(address, record)?;
        write_atomic(&self.path, self.mem.image())?;
        Ok(())
    }
    fn read_record(&mut self, address: u16) -> HwResult<[f64; 3]> {
        Ok(self.mem.read(address)?)
    }
    fn capacity_bytes(&self) -> usize {
        self.mem.capacity_bytes()
    }
}

/// Write `bytes` to a sibling temp file, fsync, then rename over `path`.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let tmp = path.with_extension("new");
    {
        let mut f = fs::File::create(&tmp)?;
        f.write_all(bytes)?;
        f.sync_all()?;
    }
    fs::rename(tmp, path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_record_crossing_the_end() {
        let mut m = MemoryEeprom::new(48);
        assert!(m.write(24, [1.0, 2.0, 3.0]).is_ok());
        match m.write(25, [0.0; 3]) {
            Err(HwError::AddressOutOfRange { address: 25, .. }) => {}
            other => panic!("expected out of range, got {other:?}"),
        }
    }

    #[test]
    fn fresh_image_is_erased() {
        let m = MemoryEeprom::new(64);
        assert!(m.is_erased(0).unwrap());
        assert!(m.image().iter().all(|b| *b == ERASED));
    }
}
