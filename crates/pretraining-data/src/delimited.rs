use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;

use crate::errors::{Error, Result};

/// ASCII unit separator (0x1F), the field delimiter of every corpus file.
pub const UNIT_SEPARATOR: char = '\u{1f}';

const PREVIEW_CHARS: usize = 40;

/// Field names declared by the first record of a delimited source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    fields: Vec<String>,
}

impl Header {
    pub fn parse(line: &str, separator: char) -> Self {
        Self {
            fields: line.split(separator).map(str::to_string).collect(),
        }
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|field| field == name)
    }

    /// Index of `name`, or `MalformedSource` when the header lacks it.
    pub fn require(&self, name: &str) -> Result<usize> {
        self.position(name).ok_or_else(|| {
            Error::MalformedSource(format!(
                "header is missing required field `{}` (found: {})",
                name,
                self.fields.join(", ")
            ))
        })
    }
}

/// One data row. Always holds at least as many fields as the header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    line: usize,
    fields: Vec<String>,
}

impl Record {
    /// 1-based line number in the source, counting the header as line 1.
    pub fn line(&self) -> usize {
        self.line
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn field(&self, index: usize) -> &str {
        self.fields.get(index).map(String::as_str).unwrap_or("")
    }

    /// Moves a field out of the record, leaving an empty string behind.
    pub fn take(&mut self, index: usize) -> String {
        self.fields
            .get_mut(index)
            .map(std::mem::take)
            .unwrap_or_default()
    }
}

/// Streaming reader over a header-first delimited source.
///
/// Line terminators are never part of a field. Blank lines are accepted only
/// at the very end of the source; anywhere else they are short rows.
pub struct DelimitedReader<R> {
    lines: io::Lines<R>,
    header: Header,
    separator: char,
    line_number: usize,
}

impl DelimitedReader<BufReader<File>> {
    pub fn open(path: &Path, separator: char) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file), separator).map_err(|err| match err {
            Error::MalformedSource(msg) => {
                Error::MalformedSource(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })
    }
}

impl<R: BufRead> DelimitedReader<R> {
    pub fn from_reader(reader: R, separator: char) -> Result<Self> {
        let mut lines = reader.lines();
        let header_line = match lines.next() {
            Some(line) => line?,
            None => {
                return Err(Error::MalformedSource(
                    "source is empty; expected a header row".into(),
                ))
            }
        };
        let header = Header::parse(header_line.trim_start_matches('\u{feff}'), separator);

        Ok(Self {
            lines,
            header,
            separator,
            line_number: 1,
        })
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    fn parse_record(&self, line: &str) -> Result<Record> {
        let fields: Vec<String> = line.split(self.separator).map(str::to_string).collect();
        if fields.len() < self.header.len() {
            return Err(Error::MalformedRow {
                line: self.line_number,
                expected: self.header.len(),
                found: fields.len(),
            });
        }
        Ok(Record {
            line: self.line_number,
            fields,
        })
    }
}

impl<R: BufRead> Iterator for DelimitedReader<R> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut first_blank = None;
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(err) => return Some(Err(err.into())),
            };
            self.line_number += 1;

            if line.is_empty() {
                first_blank.get_or_insert(self.line_number);
                continue;
            }

            if let Some(blank) = first_blank {
                return Some(Err(Error::MalformedRow {
                    line: blank,
                    expected: self.header.len(),
                    found: 0,
                }));
            }

            return Some(self.parse_record(&line));
        }
    }
}

/// Writes delimited records verbatim, one per line.
///
/// There is no quoting: a field that contains the separator or a line break
/// is rejected before anything of its record reaches the underlying writer.
pub struct DelimitedWriter<W: Write> {
    inner: W,
    separator: char,
    buffer: String,
    records: usize,
}

impl<W: Write> DelimitedWriter<W> {
    pub fn new(inner: W, separator: char) -> Self {
        Self {
            inner,
            separator,
            buffer: String::new(),
            records: 0,
        }
    }

    pub fn write_record<S: AsRef<str>>(&mut self, fields: &[S]) -> Result<()> {
        self.buffer.clear();
        for (index, field) in fields.iter().enumerate() {
            let field = field.as_ref();
            if field.contains(self.separator) || field.contains(['\n', '\r']) {
                return Err(Error::UnencodableField(preview(field)));
            }
            if index > 0 {
                self.buffer.push(self.separator);
            }
            self.buffer.push_str(field);
        }
        self.buffer.push('\n');
        self.inner.write_all(self.buffer.as_bytes())?;
        self.records += 1;
        Ok(())
    }

    /// Records written so far, header included.
    pub fn records_written(&self) -> usize {
        self.records
    }

    pub fn flush(&mut self) -> Result<()> {
        self.inner.flush()?;
        Ok(())
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

fn preview(field: &str) -> String {
    let mut preview: String = field.chars().take(PREVIEW_CHARS).collect();
    if field.chars().count() > PREVIEW_CHARS {
        preview.push_str("...");
    }
    preview
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn reader(text: &str) -> Result<DelimitedReader<Cursor<Vec<u8>>>> {
        DelimitedReader::from_reader(Cursor::new(text.as_bytes().to_vec()), UNIT_SEPARATOR)
    }

    #[test]
    fn header_lookup_is_by_name() {
        let header = Header::parse("domain\u{1f}sentence\u{1f}sentid", UNIT_SEPARATOR);
        assert_eq!(header.require("sentid").unwrap(), 2);
        assert_eq!(header.require("sentence").unwrap(), 1);
        assert!(matches!(
            header.require("length"),
            Err(Error::MalformedSource(msg)) if msg.contains("`length`")
        ));
    }

    #[test]
    fn reads_records_without_line_terminators() {
        let rows: Vec<Record> = reader("a\u{1f}b\r\n1\u{1f}x y\r\n2\u{1f}z\n")
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].fields(), ["1", "x y"]);
        assert_eq!(rows[1].field(1), "z");
        assert_eq!(rows[1].line(), 3);
    }

    #[test]
    fn trailing_blank_lines_are_ignored() {
        let rows: Vec<Record> = reader("a\u{1f}b\n1\u{1f}x\n\n\n")
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn interior_blank_line_is_a_short_row() {
        let err = reader("a\u{1f}b\n\n1\u{1f}x\n")
            .unwrap()
            .collect::<Result<Vec<_>>>()
            .unwrap_err();
        assert!(matches!(
            err,
            Error::MalformedRow {
                line: 2,
                expected: 2,
                found: 0
            }
        ));
    }

    #[test]
    fn short_row_reports_counts() {
        let err = reader("a\u{1f}b\u{1f}c\n1\u{1f}2\n")
            .unwrap()
            .collect::<Result<Vec<_>>>()
            .unwrap_err();
        assert!(matches!(
            err,
            Error::MalformedRow {
                line: 2,
                expected: 3,
                found: 2
            }
        ));
    }

    #[test]
    fn empty_source_has_no_header() {
        assert!(matches!(reader(""), Err(Error::MalformedSource(_))));
    }

    #[test]
    fn writer_joins_fields_and_counts_records() {
        let mut writer = DelimitedWriter::new(Vec::new(), UNIT_SEPARATOR);
        writer.write_record(&["sentid", "sentence"]).unwrap();
        writer.write_record(&["7", "Hello, \"world\"."]).unwrap();
        assert_eq!(writer.records_written(), 2);
        assert_eq!(
            String::from_utf8(writer.into_inner()).unwrap(),
            "sentid\u{1f}sentence\n7\u{1f}Hello, \"world\".\n"
        );
    }

    #[test]
    fn writer_rejects_unencodable_fields_without_partial_output() {
        let mut writer = DelimitedWriter::new(Vec::new(), UNIT_SEPARATOR);
        let err = writer.write_record(&["1", "two\nlines"]).unwrap_err();
        assert!(matches!(err, Error::UnencodableField(_)));
        let err = writer.write_record(&["1", "a\u{1f}b"]).unwrap_err();
        assert!(matches!(err, Error::UnencodableField(_)));
        assert_eq!(writer.records_written(), 0);
        assert!(writer.get_ref().is_empty());
    }
}
