//! Error types and the related `Result<T>`s
//!
//! Errors come in three layers:
//!
//! - [`ZipError`]: the container itself (records, offsets, compression).
//! - [`DecodeError`]: the CSV or XML content of one member.
//! - [`SkizError`]: what [`parse()`](crate::parse()) hands back,
//!   wrapping either of the above with the entry it came from.
//!
//! Bad _field values_ (a non-numeric latitude, an unparseable date) are not
//! errors at all. They come out as `NaN` or `None`.

use thiserror::Error;

use crate::track::ArchiveMember;

pub type ZipResult<T> = Result<T, ZipError>;

pub type DecodeResult<T> = Result<T, DecodeError>;

pub type SkizResult<T> = Result<T, SkizError>;

#[derive(Debug, Error)]
pub enum ZipError {
    /// An error from underlying I/O
    #[error("I/O Error")]
    Io(#[from] std::io::Error),

    /// The ZIP archive has malformed or inconsistent records.
    #[error("Invalid Zip archive: {0}")]
    InvalidArchive(&'static str),

    /// Decoding a UTF-8 name failed
    #[error("Invalid UTF-8")]
    Encoding(#[from] std::str::Utf8Error),

    /// The ZIP archive uses an unsupported feature
    #[error("Unsupported Zip archive: {0}")]
    UnsupportedArchive(String),

    /// The ZIP archive is prepended some unknown bytes.
    /// (Use [`ZipArchive::with_prepended_data()`] if this is okay.)
    ///
    /// [`ZipArchive::with_prepended_data()`]: ../read/struct.ZipArchive.html#method.with_prepended_data
    #[error("Archive prepended with {0} unknown bytes")]
    PrependedWithUnknownBytes(usize),

    /// A cast from a 64-bit int to a usize failed,
    /// probably on a 32-bit system.
    #[error("Zip archive too large for address space")]
    InsufficientAddressSpace,
}

/// Structural problems with a member's CSV or XML content
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Reading the member's decompressed stream failed
    /// (corrupt deflate data, CRC mismatch, ...)
    #[error("I/O Error")]
    Io(#[from] std::io::Error),

    #[error("Malformed CSV")]
    Csv(#[from] csv::Error),

    /// A data row didn't have as many fields as the first one.
    #[error("CSV row {row} has {found} fields, expected {expected}")]
    UnequalLengths {
        row: u64,
        expected: usize,
        found: usize,
    },

    /// A quote that the CSV reader would have quietly accepted:
    /// one in the middle of an unquoted field, junk after a closing quote,
    /// or a quoted field the member ends inside of.
    #[error("CSV row {row}: {problem}")]
    MalformedQuote { row: u64, problem: QuoteProblem },

    #[error("Malformed XML")]
    Xml(#[from] quick_xml::Error),

    #[error("Malformed XML attribute")]
    XmlAttribute(#[from] quick_xml::events::attributes::AttrError),

    /// The document ended with elements still open,
    /// or closed one that was never opened.
    #[error("Unbalanced XML element <{0}>")]
    Unbalanced(String),

    /// The document doesn't have the root element its member calls for.
    #[error("Missing <{0}> root element")]
    MissingRoot(&'static str),
}

/// What was wrong with a quote in a CSV member
#[derive(Debug, Copy, Clone, PartialEq, Eq, Error)]
pub enum QuoteProblem {
    #[error("quote inside an unquoted field")]
    InvalidOpeningQuote,

    #[error("characters after a closing quote")]
    InvalidClosingQuote,

    #[error("quoted field never closed")]
    QuoteNotClosed,
}

/// Everything that can go wrong parsing a .skiz archive.
///
/// A failure anywhere fails the whole parse; no partial track is returned.
#[derive(Debug, Error)]
pub enum SkizError {
    /// The bytes aren't a readable ZIP archive.
    #[error("Not a readable .skiz archive")]
    ArchiveFormat(#[source] ZipError),

    /// A recognized member couldn't be opened for reading.
    #[error("Couldn't open archive entry {name}")]
    ArchiveEntry {
        name: String,
        #[source]
        source: ZipError,
    },

    /// A recognized member's content is malformed.
    #[error("Couldn't decode {member}")]
    MemberDecode {
        member: ArchiveMember,
        #[source]
        source: DecodeError,
    },
}
