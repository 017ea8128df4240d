//! Header / record production, eager or lazy.
//!
//! Every file format implements [Format]. [RecordStream] produces the
//! records lazily, [read] simply collects the very same stream.
use std::{
    collections::VecDeque,
    io::{BufRead, Lines},
    path::Path,
    str::FromStr,
};

use crate::{
    prelude::{BufferedReader, Error},
    ParsingError,
};

/// [LineReader] iterates the lines of a text input and keeps
/// track of the current (1-based) line number, for error reports.
pub struct LineReader<R: BufRead> {
    lines: Lines<R>,
    /// Lines read ahead, or pushed back
    pending: VecDeque<String>,
    line: usize,
}

impl<R: BufRead> LineReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            pending: VecDeque::new(),
            line: 0,
        }
    }
    /// Number of the last line returned by [Self::next_line]
    pub fn line_number(&self) -> usize {
        self.line
    }
    /// Returns the following line, None at the end of the input
    pub fn next_line(&mut self) -> Result<Option<String>, Error> {
        if let Some(line) = self.pending.pop_front() {
            self.line += 1;
            return Ok(Some(line));
        }
        match self.lines.next() {
            Some(line) => {
                self.line += 1;
                Ok(Some(line?))
            },
            None => Ok(None),
        }
    }
    /// Returns the following line, end of input being an error
    pub fn expect_line(&mut self) -> Result<String, Error> {
        match self.next_line()? {
            Some(line) => Ok(line),
            None => Err(Error::MalformedInput {
                line: self.line + 1,
                reason: ParsingError::UnexpectedEof,
            }),
        }
    }
    /// Returns the following line without consuming it
    pub fn peek(&mut self) -> Result<Option<&str>, Error> {
        if self.pending.is_empty() {
            match self.lines.next() {
                Some(line) => self.pending.push_back(line?),
                None => return Ok(None),
            }
        }
        Ok(self.pending.front().map(|s| s.as_str()))
    }
    /// Returns `line` to the input: it will be the following line.
    /// Lines pushed back in a row are returned in reverse order.
    pub fn push_back(&mut self, line: String) {
        self.line = self.line.saturating_sub(1);
        self.pending.push_front(line);
    }
    /// Wraps a field error, at the current line
    pub fn malformed(&self, reason: ParsingError) -> Error {
        Error::MalformedInput {
            line: self.line,
            reason,
        }
    }
}

/// A file [Format] is a header followed by a sequence of records.
pub trait Format {
    type Header: Clone;
    type Record;
    /// Parses the file header
    fn read_header<R: BufRead>(lines: &mut LineReader<R>) -> Result<Self::Header, Error>;
    /// Parses the following record, Ok(None) once data is exhausted
    fn read_record<R: BufRead>(
        header: &Self::Header,
        lines: &mut LineReader<R>,
    ) -> Result<Option<Self::Record>, Error>;
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum State {
    Streaming,
    /// An error was just returned
    Draining,
    /// None was just returned
    Finished,
    Exhausted,
}

/// [RecordStream] is a single pass record producer.
/// Once it returned None, it yields [Error::ProducerExhausted]
/// once, then None forever. A parsing error ends the stream.
pub struct RecordStream<F: Format, R: BufRead = BufferedReader> {
    header: F::Header,
    lines: LineReader<R>,
    state: State,
}

impl<F: Format, R: BufRead> RecordStream<F, R> {
    /// Parses the header of `reader`, the stream being ready
    /// to produce the first record.
    pub fn new(reader: R) -> Result<Self, Error> {
        let mut lines = LineReader::new(reader);
        let header = F::read_header(&mut lines)?;
        Ok(Self {
            header,
            lines,
            state: State::Streaming,
        })
    }
    pub fn header(&self) -> &F::Header {
        &self.header
    }
}

impl<F: Format, R: BufRead> Iterator for RecordStream<F, R> {
    type Item = Result<F::Record, Error>;
    fn next(&mut self) -> Option<Self::Item> {
        match self.state {
            State::Streaming => match F::read_record(&self.header, &mut self.lines) {
                Ok(Some(record)) => Some(Ok(record)),
                Ok(None) => {
                    self.state = State::Finished;
                    None
                },
                Err(e) => {
                    self.state = State::Draining;
                    Some(Err(e))
                },
            },
            State::Draining => {
                self.state = State::Finished;
                None
            },
            State::Finished => {
                self.state = State::Exhausted;
                Some(Err(Error::ProducerExhausted))
            },
            State::Exhausted => None,
        }
    }
}

/// Lazy parsing of any [BufRead]able interface
pub fn stream<F: Format, R: BufRead>(
    reader: R,
) -> Result<(F::Header, RecordStream<F, R>), Error> {
    let stream = RecordStream::<F, R>::new(reader)?;
    Ok((stream.header().clone(), stream))
}

/// Eager parsing of any [BufRead]able interface
pub fn read<F: Format, R: BufRead>(reader: R) -> Result<(F::Header, Vec<F::Record>), Error> {
    let (header, stream) = stream::<F, R>(reader)?;
    let records = stream.collect::<Result<Vec<_>, _>>()?;
    Ok((header, records))
}

/// Lazy parsing of a local file
pub fn stream_file<F: Format>(
    path: impl AsRef<Path>,
) -> Result<(F::Header, RecordStream<F>), Error> {
    stream::<F, BufferedReader>(BufferedReader::new(path)?)
}

/// Eager parsing of a local file
pub fn read_file<F: Format>(path: impl AsRef<Path>) -> Result<(F::Header, Vec<F::Record>), Error> {
    read::<F, BufferedReader>(BufferedReader::new(path)?)
}

/// Returns `line[start..end]`, clamped to the line length
pub(crate) fn column(line: &str, start: usize, end: usize) -> &str {
    let end = end.min(line.len());
    if start >= end {
        return "";
    }
    line.get(start..end).unwrap_or("")
}

/// Parses a floating point field, accepting the Fortran 'D' exponent
pub(crate) fn parse_float(s: &str) -> Result<f64, ParsingError> {
    let trimmed = s.trim();
    let value = if trimmed.contains(['D', 'd']) {
        trimmed.replace(['D', 'd'], "E").parse::<f64>()
    } else {
        trimmed.parse::<f64>()
    };
    value.map_err(|_| ParsingError::Float(s.to_string()))
}

/// Parses an integer field
pub(crate) fn parse_int<T: FromStr>(s: &str) -> Result<T, ParsingError> {
    s.trim()
        .parse::<T>()
        .map_err(|_| ParsingError::Integer(s.to_string()))
}
