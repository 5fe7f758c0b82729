//! Lazy line reading for candidate files.

use std::path::{Path, PathBuf};

use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader, Split};

use super::SourceError;

/// Async line cursor over one file.
///
/// Chat exports are not always valid UTF-8; invalid sequences are replaced
/// rather than aborting the whole file. `\r\n` endings are normalized.
#[derive(Debug)]
pub struct LineReader {
    path: PathBuf,
    segments: Split<BufReader<File>>,
}

/// Opens `path` for line-by-line reading.
///
/// # Errors
///
/// Returns [`SourceError::Io`] if the file cannot be opened.
pub async fn read_lines(path: &Path) -> Result<LineReader, SourceError> {
    let file = File::open(path)
        .await
        .map_err(|e| SourceError::io(path, e))?;
    Ok(LineReader {
        path: path.to_path_buf(),
        segments: BufReader::new(file).split(b'\n'),
    })
}

impl LineReader {
    /// Returns the next line, or `Ok(None)` once the end of input is reached.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Io`] if reading fails mid-file.
    pub async fn next_line(&mut self) -> Result<Option<String>, SourceError> {
        let Some(mut segment) = self
            .segments
            .next_segment()
            .await
            .map_err(|e| SourceError::io(&self.path, e))?
        else {
            return Ok(None);
        };

        if segment.last() == Some(&b'\r') {
            segment.pop();
        }
        Ok(Some(String::from_utf8_lossy(&segment).into_owned()))
    }
}
