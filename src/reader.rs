//! Buffered Reader wrapper, for efficient data reading
//! and integrated .gz decompression.
#[cfg(feature = "flate2")]
use flate2::read::GzDecoder;

use std::{
    fs::File,
    io::{BufRead, BufReader, Error as IoError, ErrorKind, Read},
    path::Path,
};

#[derive(Debug)]
pub enum BufferedReader {
    /// Readable (plain) file
    PlainFile(BufReader<File>),
    /// gzip compressed file
    #[cfg(feature = "flate2")]
    GzFile(BufReader<GzDecoder<File>>),
}

impl BufferedReader {
    /// Builds a new BufferedReader for efficient file interation,
    /// with possible .gz decompression
    pub fn new(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default();
        match extension {
            "gz" => {
                #[cfg(feature = "flate2")]
                {
                    let f = File::open(path)?;
                    Ok(Self::GzFile(BufReader::new(GzDecoder::new(f))))
                }
                #[cfg(not(feature = "flate2"))]
                {
                    Err(IoError::new(
                        ErrorKind::Unsupported,
                        ".gz data requires the flate2 feature",
                    ))
                }
            },
            "Z" => Err(IoError::new(
                ErrorKind::Unsupported,
                ".Z decompression is not supported: uncompress manually",
            )),
            _ => {
                // Assumes no extra compression
                let f = File::open(path)?;
                Ok(Self::PlainFile(BufReader::new(f)))
            },
        }
    }
}

impl Read for BufferedReader {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, IoError> {
        match self {
            Self::PlainFile(ref mut h) => h.read(buf),
            #[cfg(feature = "flate2")]
            Self::GzFile(ref mut h) => h.read(buf),
        }
    }
}

impl BufRead for BufferedReader {
    fn fill_buf(&mut self) -> Result<&[u8], IoError> {
        match self {
            Self::PlainFile(ref mut bufreader) => bufreader.fill_buf(),
            #[cfg(feature = "flate2")]
            Self::GzFile(ref mut bufreader) => bufreader.fill_buf(),
        }
    }
    fn consume(&mut self, s: usize) {
        match self {
            Self::PlainFile(ref mut bufreader) => bufreader.consume(s),
            #[cfg(feature = "flate2")]
            Self::GzFile(ref mut bufreader) => bufreader.consume(s),
        }
    }
}
