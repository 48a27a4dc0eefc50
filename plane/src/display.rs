use crate::scene::PosedModel;
use plane_traits::{Orientation, Sample};
use std::io::{self, Write};
use tracing::warn;

/// Everything the display needs for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    pub sample: Sample,
    pub model: PosedModel,
}

/// Presentation side of the viewer. Receives data, never feeds state back.
pub trait DisplaySink {
    fn show(&mut self, update: &Update);

    /// Replaces the status line.
    fn status(&mut self, text: &str);

    /// A message the user must see, such as a failed connect.
    fn notice(&mut self, title: &str, text: &str);
}

/// `"Raw:\nPitch=1.5°\nRoll=..."`
pub fn readout(label: &str, orientation: &Orientation) -> String {
    format!("{}:\n{}", label, orientation)
}

/// Writes the readout as text lines.
pub struct TerminalSink<W: Write> {
    out: W,
}

impl TerminalSink<io::Stdout> {
    pub fn stdout() -> Self {
        TerminalSink::new(io::stdout())
    }
}

impl<W: Write> TerminalSink<W> {
    pub fn new(out: W) -> Self {
        TerminalSink { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit(&mut self, text: &str) {
        if let Err(e) = writeln!(self.out, "{}", text).and_then(|_| self.out.flush()) {
            warn!("Failed to write to display: {}", e);
        }
    }
}

impl<W: Write> DisplaySink for TerminalSink<W> {
    fn show(&mut self, update: &Update) {
        let raw = update.sample.raw;
        let mapped = update.sample.mapped;
        let mut line = format!(
            "Raw: Pitch={:.1}° Roll={:.1}° Yaw={:.1}° | Mapped: Pitch={:.1}° Roll={:.1}° Yaw={:.1}°",
            raw.pitch, raw.roll, raw.yaw, mapped.pitch, mapped.roll, mapped.yaw
        );
        if let Some(tip) = update.model.nose_tip() {
            line.push_str(&format!(" | nose: ({:.2}, {:.2}, {:.2})", tip.x, tip.y, tip.z));
        }
        self.emit(&line);
    }

    fn status(&mut self, text: &str) {
        self.emit(&format!("[{}]", text));
    }

    fn notice(&mut self, title: &str, text: &str) {
        self.emit(&format!("{}: {}", title, text));
    }
}
