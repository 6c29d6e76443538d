use crate::result::*;

/// A checked cast from u64 to usize
///
/// We could use the `cast` crate,
/// (https://docs.rs/cast/0.2.3/cast/)
/// but this is the only one we really need.
pub fn usize<I: Into<u64>>(i: I) -> ZipResult<usize> {
    usize::try_from(i.into()).map_err(|_| ZipError::InsufficientAddressSpace)
}

/// `usize()`, then make sure `[offset..]` is in bounds of something `len` long.
pub fn offset_within<I: Into<u64>>(i: I, len: usize) -> ZipResult<usize> {
    let offset = usize(i)?;
    if offset > len {
        return Err(ZipError::InvalidArchive("Offset past the end of the archive"));
    }
    Ok(offset)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn offsets_past_the_end() {
        assert_eq!(offset_within(10u32, 10).unwrap(), 10);
        assert!(matches!(
            offset_within(11u32, 10),
            Err(ZipError::InvalidArchive(_))
        ));
    }
}
