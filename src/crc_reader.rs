//! Reader adaptor that checks a member's CRC-32 once it's been read out.

use std::io;
use std::io::prelude::*;

use crc32fast::Hasher;

/// Reader that validates the CRC32 when it reaches the EOF.
///
/// A mismatch surfaces as an [`io::ErrorKind::InvalidData`] error
/// from the read that would have returned EOF,
/// so whatever is decoding the member sees it as a failed stream.
pub struct Crc32Reader<R> {
    inner: R,
    hasher: Hasher,
    expected: u32,
}

impl<R> Crc32Reader<R> {
    pub fn new(inner: R, expected: u32) -> Crc32Reader<R> {
        Crc32Reader {
            inner,
            hasher: Hasher::new(),
            expected,
        }
    }

    fn check(&self) -> io::Result<()> {
        let actual = self.hasher.clone().finalize();
        if actual == self.expected {
            Ok(())
        } else {
            Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "Invalid checksum: expected {:08x}, got {:08x}",
                    self.expected, actual
                ),
            ))
        }
    }
}

impl<R: Read> Read for Crc32Reader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let count = self.inner.read(buf)?;
        if count == 0 && !buf.is_empty() {
            self.check()?;
        }
        self.hasher.update(&buf[..count]);
        Ok(count)
    }
}
