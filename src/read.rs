//! Tools for reading the ZIP container a .skiz file ships in.
//!
//! To start reading an archive, first create a [`ZipArchive`] from its bytes,
//! then walk its [`entries()`](ZipArchive::entries) and [`read()`](ZipArchive::read)
//! the ones you care about.
//!
//! Entries are decoded from the central directory one at a time, as you ask
//! for them, so an archive full of members we don't care about costs us
//! a pass over some small fixed-size records and nothing else.

use std::borrow::Cow;
use std::io;

use camino::Utf8Path;
use chrono::NaiveDateTime;
use flate2::read::DeflateDecoder;
use log::*;

use crate::arch::{offset_within, usize};
use crate::crc_reader::Crc32Reader;
use crate::result::*;
use crate::spec;

/// The compression method used to store a file
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CompressionMethod {
    /// The file is uncompressed
    None,
    /// The file is [DEFLATE](https://en.wikipedia.org/wiki/DEFLATE)d.
    /// This is the most common format used by ZIP archives.
    Deflate,
    /// The file is compressed with a yet-unsupported format.
    /// (The u16 indicates the internal format code.)
    Unsupported(u16),
}

/// Metadata for a file or directory in the archive,
/// retrieved from its central directory
#[derive(Debug, PartialEq, Eq)]
pub struct FileMetadata<'a> {
    /// Uncompressed size of the file in bytes
    pub size: usize,

    /// Compressed size of the file in bytes
    pub compressed_size: usize,

    /// Compression algorithm used to store the file
    pub compression_method: CompressionMethod,

    /// The CRC-32 of the decompressed file
    pub crc32: u32,

    /// True if the file is encrypted (decryption is unsupported)
    pub encrypted: bool,

    /// The provided path of the file.
    pub path: Cow<'a, Utf8Path>,

    /// When the file was last modified, if the archive recorded a valid time
    pub last_modified: Option<NaiveDateTime>,

    /// The offset to the local file header in the archive
    pub(crate) header_offset: usize,
}

/// A ZIP archive to be read
pub struct ZipArchive<'a> {
    /// The contents of the ZIP archive, as a byte slice.
    mapping: &'a [u8],
    /// The central directory, still encoded
    central_directory: &'a [u8],
    /// How many entries the central directory claims to hold
    entry_count: u64,
}

impl<'a> ZipArchive<'a> {
    /// Reads a ZIP archive from a byte slice.
    ///
    /// This only locates the central directory;
    /// entries are decoded as [`entries()`](Self::entries) walks them.
    pub fn new(mapping: &'a [u8]) -> ZipResult<Self> {
        let (new_archive, archive_offset) = Self::with_prepended_data(mapping)?;
        if archive_offset != 0 {
            return Err(ZipError::PrependedWithUnknownBytes(archive_offset));
        }
        Ok(new_archive)
    }

    /// Like `ZipArchive::new()`, but allows arbitrary data to prepend the archive.
    /// Returns the ZipArchive and the number of bytes prepended to the archive.
    pub fn with_prepended_data(mut mapping: &'a [u8]) -> ZipResult<(Self, usize)> {
        let eocdr_posit = spec::find_eocdr(mapping)?;
        let eocdr = spec::EndOfCentralDirectory::parse(&mapping[eocdr_posit..])?;
        trace!("{:?}", eocdr);

        if eocdr.disk_number != eocdr.disk_with_central_directory {
            return Err(ZipError::UnsupportedArchive(format!(
                "No support for multi-disk archives: disk ({}) != disk with central directory ({})",
                eocdr.disk_number, eocdr.disk_with_central_directory
            )));
        }
        if eocdr.entries != eocdr.entries_on_this_disk {
            return Err(ZipError::UnsupportedArchive(format!(
                "No support for multi-disk archives: entries ({}) != entries this disk ({})",
                eocdr.entries, eocdr.entries_on_this_disk
            )));
        }

        let nominal_central_directory_offset: usize;
        let entry_count: u64;

        // Zip files can be prepended by arbitrary junk,
        // so all the given positions might be off.
        // Calculate the offset.
        let archive_offset;

        // An archive with no entries can be nothing but its EOCDR,
        // with no room for a Zip64 locator in front.
        let zip64_eocdr_locator = eocdr_posit
            .checked_sub(spec::Zip64EndOfCentralDirectoryLocator::size_in_file())
            .and_then(|posit| {
                spec::Zip64EndOfCentralDirectoryLocator::parse(&mapping[posit..eocdr_posit])
                    .map(|locator| (posit, locator))
            });

        if let Some((zip64_eocdr_locator_posit, zip64_eocdr_locator)) = zip64_eocdr_locator {
            trace!("{:?}", zip64_eocdr_locator);

            if eocdr.disk_number as u32 != zip64_eocdr_locator.disk_with_central_directory {
                return Err(ZipError::UnsupportedArchive(format!(
                    "No support for multi-disk archives: disk ({}) != disk with zip64 central directory ({})",
                    eocdr.disk_number, zip64_eocdr_locator.disk_with_central_directory
                )));
            }
            if zip64_eocdr_locator.disks != 1 {
                return Err(ZipError::UnsupportedArchive(format!(
                    "No support for multi-disk archives: Zip64 EOCDR locator reports {} disks",
                    zip64_eocdr_locator.disks
                )));
            }

            // Search for the zip64 EOCDR, from its nominal starting position
            // to the end of where it could be.
            let zip64_eocdr_search_start = offset_within(
                zip64_eocdr_locator.zip64_eocdr_offset,
                zip64_eocdr_locator_posit,
            )?;
            let zip64_eocdr_search_space =
                &mapping[zip64_eocdr_search_start..zip64_eocdr_locator_posit];

            let zip64_eocdr_posit = spec::find_zip64_eocdr(zip64_eocdr_search_space)?;
            // Since we're searching starting at the provided offset,
            // the returned position is the archive offset.
            archive_offset = zip64_eocdr_posit;
            let zip64_eocdr = spec::Zip64EndOfCentralDirectory::parse(
                &zip64_eocdr_search_space[zip64_eocdr_posit..],
            )?;

            trace!("{:?}", zip64_eocdr);

            nominal_central_directory_offset = usize(zip64_eocdr.central_directory_offset)?;
            entry_count = zip64_eocdr.entries;
        } else {
            // The offset is the actual position versus the stored one.
            let actual_cdr_posit = eocdr_posit.checked_sub(usize(eocdr.central_directory_size)?);
            let nominal_offset = usize(eocdr.central_directory_offset)?;
            archive_offset = actual_cdr_posit
                .and_then(|off| off.checked_sub(nominal_offset))
                .ok_or(ZipError::InvalidArchive(
                    "Invalid central directory size or offset",
                ))?;
            nominal_central_directory_offset = nominal_offset;
            entry_count = eocdr.entries as u64;
        }

        mapping = &mapping[archive_offset..];
        trace!(
            "{} entries at nominal offset {}",
            entry_count,
            nominal_central_directory_offset
        );

        let central_directory_start =
            offset_within(nominal_central_directory_offset as u64, mapping.len())?;
        let central_directory = &mapping[central_directory_start..];

        Ok((
            ZipArchive {
                mapping,
                central_directory,
                entry_count,
            },
            archive_offset,
        ))
    }

    /// The number of entries the central directory claims to hold
    pub fn len(&self) -> u64 {
        self.entry_count
    }

    pub fn is_empty(&self) -> bool {
        self.entry_count == 0
    }

    /// Walks the archive's central directory, in the order entries were written.
    ///
    /// No effort is made to deduplicate or otherwise validate these entries.
    /// A malformed record ends the walk after yielding its error.
    pub fn entries(&self) -> Entries<'a> {
        Entries {
            central_directory: self.central_directory,
            remaining: self.entry_count,
        }
    }

    /// Reads the given file from the ZIP archive.
    ///
    /// The returned reader decompresses as it goes,
    /// and fails its final read if the contents don't match the stored CRC-32.
    pub fn read(&self, metadata: &FileMetadata) -> ZipResult<Box<dyn io::Read + Send + 'a>> {
        let mut file_slice = self
            .mapping
            .get(metadata.header_offset..)
            .ok_or(ZipError::InvalidArchive(
                "Local file header offset past the end of the archive",
            ))?;
        let local_header = spec::LocalFileHeader::parse_and_consume(&mut file_slice)?;
        trace!("{:?}", local_header);
        let local_metadata = FileMetadata::from_local_header(&local_header, metadata)?;
        debug!("Reading {:?}", local_metadata);
        if cfg!(feature = "check-local-metadata") && *metadata != local_metadata {
            return Err(ZipError::InvalidArchive(
                "Central directory entry doesn't match local file header",
            ));
        }

        if metadata.encrypted {
            return Err(ZipError::UnsupportedArchive(format!(
                "Can't read encrypted file {}",
                metadata.path
            )));
        }

        make_reader(
            metadata.compression_method,
            metadata.crc32,
            local_header.data(file_slice, metadata)?,
        )
    }
}

/// Lazily decodes central directory entries. See [`ZipArchive::entries()`].
pub struct Entries<'a> {
    central_directory: &'a [u8],
    remaining: u64,
}

impl<'a> Iterator for Entries<'a> {
    type Item = ZipResult<FileMetadata<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        let entry = spec::CentralDirectoryEntry::parse_and_consume(&mut self.central_directory)
            .and_then(|dir_entry| {
                trace!("{:?}", dir_entry);
                FileMetadata::from_cde(&dir_entry)
            });
        match &entry {
            Ok(metadata) => debug!("{:?}", metadata),
            // Don't try to make sense of whatever follows a bad record.
            Err(_) => self.remaining = 0,
        }
        Some(entry)
    }
}

/// Returns a boxed read trait for a compressed file,
/// given its compression method and expected CRC.
fn make_reader<'a, R: io::Read + Send + 'a>(
    compression_method: CompressionMethod,
    crc32: u32,
    reader: R,
) -> ZipResult<Box<dyn io::Read + Send + 'a>> {
    match compression_method {
        CompressionMethod::None => Ok(Box::new(Crc32Reader::new(reader, crc32))),
        CompressionMethod::Deflate => {
            let deflate_reader = DeflateDecoder::new(reader);
            Ok(Box::new(Crc32Reader::new(deflate_reader, crc32)))
        }
        CompressionMethod::Unsupported(method) => Err(ZipError::UnsupportedArchive(format!(
            "Compression method {} not supported",
            method
        ))),
    }
}
