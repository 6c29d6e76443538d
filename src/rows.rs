//! Streaming decoder for the comma-separated members
//! (`Nodes.csv`, `Segment.csv`, `Battery.csv`, `RelativeAltitudeSensor.csv`).
//!
//! None of them have a header we care about; `Segment.csv` has one we skip.
//! Rows are handed to a mapping function as they come off the stream,
//! so we never hold more than one undecoded row.
//!
//! The `csv` crate is forgiving about quotes: a stray `"` mid-field is kept
//! as text, and a quote that's never closed swallows the rest of the member
//! into one field. Neither is something a .skiz writer produces, so the raw
//! bytes are watched on their way into the CSV reader and either one fails
//! the member.

use std::borrow::Cow;
use std::io::{self, Read};

use csv::{ByteRecord, ReaderBuilder};
use log::*;

use crate::result::*;

/// One data row, as an ordered list of fields
#[derive(Debug, Clone, Copy)]
pub struct Row<'r> {
    record: &'r ByteRecord,
}

impl<'r> Row<'r> {
    pub fn new(record: &'r ByteRecord) -> Self {
        Self { record }
    }

    /// Returns the field at `index`, or `None` if the row is too short.
    ///
    /// Fields that aren't valid UTF-8 are decoded lossily.
    pub fn get(&self, index: usize) -> Option<Cow<'r, str>> {
        self.record.get(index).map(String::from_utf8_lossy)
    }

    pub fn len(&self) -> usize {
        self.record.len()
    }

    pub fn is_empty(&self) -> bool {
        self.record.is_empty()
    }
}

/// Decodes CSV rows, optionally discarding some leading rows first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsvDecoder {
    skip_rows: u64,
}

impl CsvDecoder {
    /// Every row is data.
    pub const fn headerless() -> Self {
        Self { skip_rows: 0 }
    }

    /// The first row is a header, and is thrown away unread.
    pub const fn skip_header() -> Self {
        Self { skip_rows: 1 }
    }

    /// Decodes `reader` to its end, mapping each data row with `map`.
    ///
    /// Every data row must have as many fields as the first one;
    /// skipped rows don't count.
    /// Decoding stops at the first malformed row or failed read.
    pub fn decode<R, T, F>(&self, reader: R, mut map: F) -> DecodeResult<Vec<T>>
    where
        R: Read,
        F: FnMut(Row) -> T,
    {
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(QuoteCheck::new(reader));

        let mut record = ByteRecord::new();
        let mut mapped = Vec::new();
        let mut seen: u64 = 0;
        let mut expected_fields = None;

        loop {
            let more = reader.read_byte_record(&mut record);
            // The CSV reader buffers ahead of the record it returns,
            // so a bad quote may belong to a later row. The member fails either way.
            reader.get_ref().status()?;
            if !more? {
                break;
            }
            seen += 1;
            if seen <= self.skip_rows {
                trace!("Skipping row {}", seen);
                continue;
            }

            match expected_fields {
                None => expected_fields = Some(record.len()),
                Some(expected) if expected != record.len() => {
                    return Err(DecodeError::UnequalLengths {
                        row: record.position().map_or(seen, |p| p.line()),
                        expected,
                        found: record.len(),
                    });
                }
                Some(_) => {}
            }

            mapped.push(map(Row::new(&record)));
        }

        reader.get_ref().finish()?;

        if mapped.is_empty() {
            warn!("No data rows");
        }
        Ok(mapped)
    }
}

/// Where [`QuoteCheck`] is within the current field
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum QuoteState {
    /// Nothing read yet, so a quote opens a quoted field.
    FieldStart,
    Unquoted,
    Quoted,
    /// Just saw a quote inside a quoted field:
    /// either it closes the field or another quote follows.
    QuoteInQuoted,
}

/// Passes bytes through untouched while following RFC 4180 quoting,
/// remembering the first quote that doesn't belong.
struct QuoteCheck<R> {
    inner: R,
    state: QuoteState,
    /// 1-based line of the byte being looked at
    line: u64,
    /// Line the current quoted field opened on
    opened_on: u64,
    problem: Option<(u64, QuoteProblem)>,
}

impl<R> QuoteCheck<R> {
    fn new(inner: R) -> Self {
        Self {
            inner,
            state: QuoteState::FieldStart,
            line: 1,
            opened_on: 1,
            problem: None,
        }
    }

    fn scan(&mut self, bytes: &[u8]) {
        use QuoteState::*;

        for &b in bytes {
            if self.problem.is_some() {
                return;
            }
            let separator = matches!(b, b',' | b'\n' | b'\r');
            self.state = match (self.state, b) {
                (FieldStart, b'"') => {
                    self.opened_on = self.line;
                    Quoted
                }
                (FieldStart | Unquoted | QuoteInQuoted, _) if separator => FieldStart,
                (FieldStart | Unquoted, b'"') => {
                    self.problem = Some((self.line, QuoteProblem::InvalidOpeningQuote));
                    Unquoted
                }
                (FieldStart | Unquoted, _) => Unquoted,
                (Quoted, b'"') => QuoteInQuoted,
                (Quoted, _) => Quoted,
                (QuoteInQuoted, b'"') => Quoted,
                (QuoteInQuoted, _) => {
                    self.problem = Some((self.line, QuoteProblem::InvalidClosingQuote));
                    Unquoted
                }
            };
            if b == b'\n' {
                self.line += 1;
            }
        }
    }

    /// Fails if a bad quote has gone by.
    fn status(&self) -> DecodeResult<()> {
        match self.problem {
            Some((row, problem)) => Err(DecodeError::MalformedQuote { row, problem }),
            None => Ok(()),
        }
    }

    /// Fails if the stream ended inside a quoted field.
    fn finish(&self) -> DecodeResult<()> {
        self.status()?;
        if self.state == QuoteState::Quoted {
            return Err(DecodeError::MalformedQuote {
                row: self.opened_on,
                problem: QuoteProblem::QuoteNotClosed,
            });
        }
        Ok(())
    }
}

impl<R: Read> Read for QuoteCheck<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let count = self.inner.read(buf)?;
        self.scan(&buf[..count]);
        Ok(count)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn fields(input: &str, decoder: CsvDecoder) -> DecodeResult<Vec<Vec<String>>> {
        decoder.decode(input.as_bytes(), |row| {
            (0..row.len())
                .map(|i| row.get(i).unwrap().into_owned())
                .collect()
        })
    }

    #[test]
    fn headerless_rows() {
        let rows = fields(
            "1610697600,46.5,11.9\n1610697601,46.6,12.0\n",
            CsvDecoder::headerless(),
        )
        .unwrap();
        assert_eq!(
            rows,
            vec![
                vec!["1610697600", "46.5", "11.9"],
                vec!["1610697601", "46.6", "12.0"]
            ]
        );
    }

    #[test]
    fn skips_exactly_one_header() {
        let rows = fields("start,end\n1,2\n3,4", CsvDecoder::skip_header()).unwrap();
        assert_eq!(rows, vec![vec!["1", "2"], vec!["3", "4"]]);
    }

    #[test]
    fn header_width_doesnt_matter() {
        let rows = fields("a,b,c,d\n1,2\n3,4\n", CsvDecoder::skip_header()).unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn quoted_fields() {
        let rows = fields("\"Run, the first\",\"say \"\"hi\"\"\"\n", CsvDecoder::headerless()).unwrap();
        assert_eq!(rows, vec![vec!["Run, the first", "say \"hi\""]]);
    }

    #[test]
    fn empty_input() {
        assert!(fields("", CsvDecoder::headerless()).unwrap().is_empty());
        assert!(fields("header,only\n", CsvDecoder::skip_header())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn ragged_rows_are_malformed() {
        match fields("1,2,3\n4,5\n", CsvDecoder::headerless()) {
            Err(DecodeError::UnequalLengths {
                row,
                expected,
                found,
            }) => {
                assert_eq!(row, 2);
                assert_eq!(expected, 3);
                assert_eq!(found, 2);
            }
            other => panic!("Expected unequal lengths, got {:?}", other),
        }
    }

    #[test]
    fn short_rows_read_as_missing() {
        let input = b"only-one\n";
        let row_lens = CsvDecoder::headerless()
            .decode(&input[..], |row| (row.len(), row.get(3).is_none()))
            .unwrap();
        assert_eq!(row_lens, vec![(1, true)]);
    }

    fn quote_problem(input: &str) -> Option<(u64, QuoteProblem)> {
        match fields(input, CsvDecoder::headerless()) {
            Err(DecodeError::MalformedQuote { row, problem }) => Some((row, problem)),
            Err(other) => panic!("Expected a quote problem, got {:?}", other),
            Ok(_) => None,
        }
    }

    #[test]
    fn unclosed_quotes_dont_swallow_rows() {
        assert_eq!(
            quote_problem("1610697731,46.5\n1610697732,\"46.6\n1610697733,46.7\n"),
            Some((2, QuoteProblem::QuoteNotClosed))
        );
        assert_eq!(
            quote_problem("\"never closed"),
            Some((1, QuoteProblem::QuoteNotClosed))
        );
    }

    #[test]
    fn stray_quotes() {
        assert_eq!(
            quote_problem("a,b,c\n2021-01-15 08:02:11 +0000,unp\"lugged,0.98\n"),
            Some((2, QuoteProblem::InvalidOpeningQuote))
        );
        assert_eq!(
            quote_problem("\"Run 1\"x,2\n"),
            Some((1, QuoteProblem::InvalidClosingQuote))
        );
        // Even in a header we'd otherwise skip.
        assert!(matches!(
            fields("sta\"rt,end\n1,2\n", CsvDecoder::skip_header()),
            Err(DecodeError::MalformedQuote { row: 1, .. })
        ));
    }

    #[test]
    fn well_formed_quotes() {
        assert_eq!(quote_problem("\"a\",\"\"\n\"multi\nline\",\"x\"\"y\"\r\n"), None);
        assert_eq!(quote_problem("1,2\r\n3,4"), None);
    }
}
