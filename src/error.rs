use thiserror::Error;

use crate::{
    epoch::{Epoch, TimeSystem},
    sv::SatelliteId,
};

/// Crate level [Error]
#[derive(Debug, Error)]
pub enum Error {
    /// Input file does not follow the format definition.
    /// `line` is the 1-based line number where the problem was met.
    #[error("line {line}: {reason}")]
    MalformedInput { line: usize, reason: ParsingError },
    #[error("navigation message decoding error: {0}")]
    Decode(#[from] DecodingError),
    #[error("{sv}: {epoch} lies outside the validity range")]
    OutOfValidityRange { sv: SatelliteId, epoch: Epoch },
    #[error("{sv}: no valid ephemeris at {epoch}")]
    NoValidEphemeris { sv: SatelliteId, epoch: Epoch },
    #[error("{sv}: insufficient data at {epoch}")]
    InsufficientData { sv: SatelliteId, epoch: Epoch },
    #[error("record stream has already been consumed")]
    ProducerExhausted,
    #[error("time system mismatch: {0} / {1}")]
    TimeSystemMismatch(TimeSystem, TimeSystem),
    #[error("{0}: kepler equation did not converge")]
    KeplerDivergence(SatelliteId),
    #[error("invalid integration step: {0} s")]
    InvalidStep(f64),
    #[error("file i/o error")]
    Io(#[from] std::io::Error),
}

/// Field level parsing errors, always carrying the offending content
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParsingError {
    #[error("unexpected end of file")]
    UnexpectedEof,
    #[error("missing \"{0}\" header field")]
    MissingHeaderField(&'static str),
    #[error("missing mandatory \"{0}\" field")]
    MissingField(&'static str),
    #[error("header line too short: \"{0}\"")]
    HeaderLine(String),
    #[error("missing or misplaced header label in \"{0}\"")]
    HeaderLabel(String),
    #[error("non supported revision \"{0}\"")]
    Version(String),
    #[error("unexpected file type \"{0}\"")]
    FileType(String),
    #[error("unknown time system \"{0}\"")]
    TimeSystem(String),
    #[error("failed to parse satellite from \"{0}\"")]
    Satellite(String),
    #[error("failed to parse prn from \"{0}\"")]
    Prn(String),
    #[error("failed to parse week counter from \"{0}\"")]
    Week(String),
    #[error("failed to parse integer value from \"{0}\"")]
    Integer(String),
    #[error("failed to parse floating point value from \"{0}\"")]
    Float(String),
    #[error("failed to parse epoch from \"{0}\"")]
    Epoch(String),
    #[error("invalid epoch flag \"{0}\"")]
    EpochFlag(String),
    #[error("invalid observable \"{0}\"")]
    Observable(String),
    #[error("record line too short: \"{0}\"")]
    RecordLine(String),
    #[error("unknown navigation message type \"{0}\"")]
    NavMessageType(String),
    #[error("unknown data type \"{0}\"")]
    DataType(String),
    #[error("unexpected yuma entry \"{0}\"")]
    YumaEntry(String),
    #[error("missing yuma field \"{0}\"")]
    MissingYumaField(&'static str),
    #[error("header announces {expected} records, {found} found")]
    RecordCount { expected: u32, found: usize },
}

/// Broadcast navigation message decoding errors
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum DecodingError {
    #[error("parity check failed on word #{word}")]
    Parity { word: usize },
    #[error("invalid preamble")]
    Preamble,
    #[error("unexpected subframe id {0}")]
    SubframeId(u8),
    #[error("page mismatch: expecting sv #{expected}, got #{found}")]
    PageMismatch { expected: u8, found: u8 },
    #[error("unexpected data id {0}")]
    DataId(u8),
    #[error("issue of data mismatch between subframes")]
    IssueOfData,
}
