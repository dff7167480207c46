use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::dmx::frame::{Frame, UNIVERSE_SIZE};

#[derive(Debug, Error)]
pub enum DataError {
    #[error("invalid file type (expected .csv): {0}")]
    InvalidFileType(PathBuf),
    #[error("failed to read chase file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Load a chase frame sequence from a CSV file: one row per frame, one
/// field per channel.
///
/// Row policy: a row with more than 512 fields is skipped whole, not
/// truncated (the transmitter separately truncates oversized frames at send
/// time; the two policies are intentionally distinct). Within a kept row,
/// non-numeric fields are dropped and values are clamped into 0..=255.
pub fn load_chase_file(path: &Path) -> Result<Vec<Frame>, DataError> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("csv") => {}
        _ => return Err(DataError::InvalidFileType(path.to_path_buf())),
    }

    let content = fs::read_to_string(path).map_err(|source| DataError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let mut frames = Vec::new();
    for (line_no, line) in content.lines().enumerate() {
        let fields: Vec<&str> = line.split(',').collect();
        if fields.len() > UNIVERSE_SIZE {
            log::warn!(
                "{}: skipped row {} with more than 512 channels: {}",
                path.display(),
                line_no + 1,
                fields.len()
            );
            continue;
        }
        let channels: Vec<u8> = fields.iter().filter_map(|field| parse_channel(field)).collect();
        frames.push(Frame::new(channels));
    }

    log::info!("loaded {} frames from {}", frames.len(), path.display());
    Ok(frames)
}

/// Fields that are not plain unsigned integers are dropped rather than
/// erroring the row; surviving values are clamped to the channel range.
fn parse_channel(field: &str) -> Option<u8> {
    let field = field.trim();
    if field.is_empty() || !field.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some(field.parse::<u64>().map_or(255, |v| v.min(255) as u8))
}
