use plane_traits::Orientation;
use thiserror::Error;
use tracing::{trace, warn};

/// Longest unterminated line kept before the buffer is dropped.
pub const DEFAULT_MAX_LINE_LEN: usize = 1024;

const PITCH_LABEL: &str = "PITCH:";
const ROLL_LABEL: &str = "ROLL:";
const YAW_LABEL: &str = "YAW:";

/// A line that looked like a frame but could not be read.
#[derive(Debug, Error, PartialEq)]
pub enum FrameError {
    #[error("expected {expected} field, found {found:?}")]
    UnexpectedLabel { expected: &'static str, found: String },
    #[error("invalid number {text:?} in {field} field")]
    InvalidNumber { field: &'static str, text: String },
    #[error("non-finite value in {0} field")]
    NonFinite(&'static str),
}

/// Accumulates serial bytes and extracts `PITCH:<f>,ROLL:<f>,YAW:<f>` lines.
///
/// Bytes outside ASCII are replaced with U+FFFD. A trailing partial line is
/// kept for the next call. When the partial line grows past the limit it is
/// thrown away along with everything up to the next newline.
#[derive(Debug)]
pub struct FrameParser {
    buffer: String,
    max_line_len: usize,
    resyncing: bool,
}

impl Default for FrameParser {
    fn default() -> Self {
        FrameParser::new(None)
    }
}

impl FrameParser {
    pub fn new(max_line_len: Option<usize>) -> Self {
        let max_line_len = max_line_len.unwrap_or(DEFAULT_MAX_LINE_LEN);
        FrameParser {
            buffer: String::with_capacity(max_line_len),
            max_line_len,
            resyncing: false,
        }
    }

    /// Unterminated text waiting for its newline.
    pub fn pending(&self) -> &str {
        &self.buffer
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
        self.resyncing = false;
    }

    /// Appends `data` and returns every complete frame, in arrival order.
    pub fn parse(&mut self, data: &[u8]) -> Vec<Orientation> {
        self.buffer
            .extend(data.iter().map(|&b| if b.is_ascii() { b as char } else { '\u{FFFD}' }));

        let mut frames = Vec::new();

        if let Some(last) = self.buffer.rfind('\n') {
            let tail = self.buffer.split_off(last + 1);
            let complete = std::mem::replace(&mut self.buffer, tail);

            for line in complete.split_terminator('\n') {
                if self.resyncing {
                    trace!("Discarded remainder of oversized line");
                    self.resyncing = false;
                    continue;
                }
                match Self::parse_line(line) {
                    Ok(Some(frame)) => frames.push(frame),
                    Ok(None) => trace!("Ignoring line: {:?}", line.trim()),
                    Err(e) => warn!("Parse error in line {:?}: {}", line.trim(), e),
                }
            }
        }

        // One char per received byte, so this counts bytes as they arrived.
        let pending = self.buffer.chars().count();
        if pending > self.max_line_len {
            warn!("Dropping {} buffered bytes without a line terminator", pending);
            self.buffer.clear();
            self.resyncing = true;
        }

        frames
    }

    /// Reads a single line. `Ok(None)` means the line is not a frame at all.
    pub fn parse_line(line: &str) -> Result<Option<Orientation>, FrameError> {
        let line = line.trim();
        if !line.starts_with(PITCH_LABEL) || !line.contains(ROLL_LABEL) || !line.contains(YAW_LABEL) {
            return Ok(None);
        }

        let mut parts = line.split(',');
        let pitch = read_field(parts.next(), PITCH_LABEL, "pitch")?;
        let roll = read_field(parts.next(), ROLL_LABEL, "roll")?;
        let yaw = read_field(parts.next(), YAW_LABEL, "yaw")?;

        Ok(Some(Orientation::new(pitch, roll, yaw)))
    }
}

fn read_field(part: Option<&str>, label: &'static str, field: &'static str) -> Result<f64, FrameError> {
    let part = part.unwrap_or("").trim();
    let text = part
        .strip_prefix(label)
        .ok_or_else(|| FrameError::UnexpectedLabel {
            expected: label,
            found: part.to_string(),
        })?;
    let text = text.split(':').next().unwrap_or("").trim();
    let value: f64 = text.parse().map_err(|_| FrameError::InvalidNumber {
        field,
        text: text.to_string(),
    })?;
    if !value.is_finite() {
        return Err(FrameError::NonFinite(field));
    }
    Ok(value)
}
