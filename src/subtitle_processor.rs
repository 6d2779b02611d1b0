use std::path::{Path, PathBuf};
use regex::Regex;
use once_cell::sync::Lazy;
use log::{debug, warn};
use serde::Serialize;

use crate::errors::SubtitleError;

// @module: Subtitle parsing and rendering

// @const: Blank-line block separator
static BLOCK_SEPARATOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\n[ \t]*\n").unwrap()
});

// @const: SRT time range line
static TIME_RANGE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*\d{1,2}:\d{2}:\d{2}[,.]\d{1,3}\s*-->\s*\d{1,2}:\d{2}:\d{2}[,.]\d{1,3}").unwrap()
});

/// Delimiter joining segment texts inside one request
pub const SEGMENT_DELIMITER: char = '|';

/// Stand-in for pipes that occur inside subtitle text
const PIPE_SUBSTITUTE: char = '\u{FF5C}';

// @struct: Single subtitle entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Segment {
    // @field: Index as written in the source document
    pub id: u64,

    // @field: Time range line, kept verbatim
    pub timestamp: String,

    // @field: Subtitle text, lines joined with '\n'
    pub text: String,
}

impl Segment {
    pub fn new(id: u64, timestamp: impl Into<String>, text: impl Into<String>) -> Self {
        Segment {
            id,
            timestamp: timestamp.into(),
            text: text.into(),
        }
    }

    /// Text safe to join with the segment delimiter
    pub fn request_text(&self) -> String {
        self.text.replace(SEGMENT_DELIMITER, &PIPE_SUBSTITUTE.to_string())
    }
}

/// Join segment texts into one request payload
pub fn join_texts(segments: &[Segment]) -> String {
    segments
        .iter()
        .map(Segment::request_text)
        .collect::<Vec<_>>()
        .join(&SEGMENT_DELIMITER.to_string())
}

/// Split a translated payload back into per-segment texts.
///
/// Entries are trimmed and pipes that stood in the source text are restored.
/// The number of entries is whatever the service returned.
pub fn split_texts(payload: &str) -> Vec<String> {
    payload
        .split(SEGMENT_DELIMITER)
        .map(|part| part.trim().replace(PIPE_SUBSTITUTE, &SEGMENT_DELIMITER.to_string()))
        .collect()
}

/// Collection of subtitle segments parsed from one file
#[derive(Debug, Clone)]
pub struct SubtitleCollection {
    /// Source filename
    pub source_file: PathBuf,

    /// Ordered segments, position is their identity
    pub segments: Vec<Segment>,
}

impl SubtitleCollection {
    /// Parse a SubRip document read from `source_file`
    pub fn parse<P: AsRef<Path>>(source_file: P, content: &str) -> Result<Self, SubtitleError> {
        Ok(SubtitleCollection {
            source_file: source_file.as_ref().to_path_buf(),
            segments: Self::parse_srt_string(content)?,
        })
    }

    /// Parse SRT format string into segments
    ///
    /// Blocks are separated by blank lines. Each block is an index line, a
    /// time range line and one or more text lines. A block whose index line is
    /// missing gets its position as id.
    pub fn parse_srt_string(content: &str) -> Result<Vec<Segment>, SubtitleError> {
        let normalized = content.replace("\r\n", "\n").replace('\r', "\n");
        let normalized = normalized.trim_start_matches('\u{feff}');

        let mut segments = Vec::new();
        for (block_idx, block) in BLOCK_SEPARATOR.split(normalized).enumerate() {
            let lines: Vec<&str> = block
                .lines()
                .map(|line| line.trim_end())
                .skip_while(|line| line.trim().is_empty())
                .collect();
            if lines.is_empty() {
                continue;
            }

            let block_number = block_idx + 1;
            let (id, rest) = match lines[0].trim().parse::<u64>() {
                Ok(id) => (id, &lines[1..]),
                Err(_) if TIME_RANGE_REGEX.is_match(lines[0]) => {
                    warn!("Subtitle block {} has no index line, using its position", block_number);
                    (segments.len() as u64 + 1, &lines[..])
                }
                Err(_) => {
                    return Err(SubtitleError::MalformedBlock {
                        block: block_number,
                        reason: format!("expected an index line, found '{}'", lines[0].trim()),
                    });
                }
            };

            let Some((timestamp, text_lines)) = rest.split_first() else {
                return Err(SubtitleError::MalformedBlock {
                    block: block_number,
                    reason: "missing time range line".to_string(),
                });
            };
            if !TIME_RANGE_REGEX.is_match(timestamp) {
                return Err(SubtitleError::MalformedBlock {
                    block: block_number,
                    reason: format!("invalid time range line '{}'", timestamp.trim()),
                });
            }

            let text = text_lines
                .iter()
                .map(|line| line.trim())
                .collect::<Vec<_>>()
                .join("\n");
            if text.is_empty() {
                debug!("Subtitle block {} has no text", block_number);
            }

            segments.push(Segment::new(id, timestamp.trim(), text));
        }

        if segments.is_empty() {
            return Err(SubtitleError::Empty);
        }
        Ok(segments)
    }

    /// Render the collection with substituted texts.
    ///
    /// Blocks are renumbered from 1, timestamps are kept verbatim, blocks are
    /// separated by one blank line and the last one has no trailing blank line.
    /// A block with empty text is just its index and time range.
    /// `texts` must be aligned with the segments.
    pub fn render_with_texts(segments: &[Segment], texts: &[String]) -> String {
        segments
            .iter()
            .zip(texts)
            .enumerate()
            .map(|(idx, (segment, text))| match text.trim() {
                "" => format!("{}\n{}", idx + 1, segment.timestamp),
                text => format!("{}\n{}\n{}", idx + 1, segment.timestamp, text),
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}
