//! Drains a member's stream into one contiguous buffer.
//!
//! The XML members are small and their decoder wants the whole document,
//! so they go through here. CSV members are decoded straight off the stream.

use std::io::{self, Read};

use log::*;

/// Reads `reader` to its end, returning everything it produced.
///
/// The first error (including a CRC mismatch found at the end of a member)
/// is returned as-is and whatever was read before it is dropped.
/// `size_hint` is only used to size the buffer up front.
pub fn collect<R: Read>(mut reader: R, size_hint: usize) -> io::Result<Vec<u8>> {
    let mut buffer = Vec::with_capacity(size_hint);
    reader.read_to_end(&mut buffer)?;
    trace!("Collected {} bytes", buffer.len());
    Ok(buffer)
}

#[cfg(test)]
mod test {
    use super::*;

    /// Hands out its bytes a few at a time, then fails if asked to.
    struct Trickle {
        data: &'static [u8],
        fail_at_end: bool,
    }

    impl Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.data.is_empty() {
                return if self.fail_at_end {
                    Err(io::Error::new(io::ErrorKind::InvalidData, "torn stream"))
                } else {
                    Ok(0)
                };
            }
            let n = buf.len().min(3).min(self.data.len());
            buf[..n].copy_from_slice(&self.data[..n]);
            self.data = &self.data[n..];
            Ok(n)
        }
    }

    #[test]
    fn concatenates_chunks() {
        let source = Trickle {
            data: b"<events><event/></events>",
            fail_at_end: false,
        };
        assert_eq!(collect(source, 0).unwrap(), b"<events><event/></events>");
    }

    #[test]
    fn no_partial_buffer_on_error() {
        let source = Trickle {
            data: b"<track name=",
            fail_at_end: true,
        };
        let err = collect(source, 16).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }
}
