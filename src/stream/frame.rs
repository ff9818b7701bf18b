//! Line reassembly with terminal-control semantics.

use std::collections::VecDeque;
use std::sync::LazyLock;

use regex::Regex;

/// Default retained line count.
pub const DEFAULT_MAX_LINES: usize = 1500;

/// Default frame-start marker: airodump-ng's channel header token.
pub const DEFAULT_FRAME_MARKER: &str = "CH ";

static CLEAR_SCREEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\x1b\[(?:2J|J)").expect("valid clear-screen regex"));

static CURSOR_HOME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\x1b\[H").expect("valid cursor-home regex"));

static ANSI_CSI: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\x1b\[[0-?]*[ -/]*[@-~]").expect("valid CSI regex"));

/// Finalized lines plus the line currently being written.
///
/// Not thread-safe by itself; [`StreamAggregator`](super::StreamAggregator)
/// owns one on a single task.
#[derive(Debug, Clone)]
pub struct StreamFrame {
    lines: VecDeque<String>,
    current: String,
    max_lines: usize,
    marker: String,
    dirty: bool,
}

impl StreamFrame {
    /// Create an empty frame.
    ///
    /// An empty `marker` disables frame-start detection. `max_lines` is
    /// clamped to at least 1.
    pub fn new(max_lines: usize, marker: impl Into<String>) -> Self {
        let max_lines = max_lines.max(1);
        Self {
            lines: VecDeque::with_capacity(max_lines.min(256)),
            current: String::new(),
            max_lines,
            marker: marker.into().to_ascii_uppercase(),
            dirty: false,
        }
    }

    /// Ingest a text chunk.
    pub fn feed_text(&mut self, chunk: &str) {
        if chunk.is_empty() {
            return;
        }
        if CLEAR_SCREEN.is_match(chunk) || CURSOR_HOME.is_match(chunk) {
            self.reset(None);
        }
        let stripped = ANSI_CSI.replace_all(chunk, "");
        for c in stripped.chars() {
            match c {
                '\r' => self.current.clear(),
                '\n' => self.finalize_line(),
                _ => self.current.push(c),
            }
        }
        self.dirty = true;
    }

    /// Ingest a raw byte chunk, replacing invalid UTF-8.
    pub fn feed_bytes(&mut self, chunk: &[u8]) {
        self.feed_text(&String::from_utf8_lossy(chunk));
    }

    /// Discard everything, optionally seeding a header line.
    pub fn reset(&mut self, header: Option<&str>) {
        self.lines.clear();
        self.current.clear();
        if let Some(header) = header.filter(|h| !h.is_empty()) {
            self.lines.push_back(header.trim_end_matches('\n').to_string());
        }
        self.dirty = true;
    }

    /// Render the frame if anything changed since the last call.
    pub fn take_snapshot(&mut self) -> Option<String> {
        if !self.dirty {
            return None;
        }
        self.dirty = false;
        Some(self.render())
    }

    /// Join finalized lines and the in-progress line with `\n`.
    #[must_use]
    pub fn render(&self) -> String {
        let mut parts: Vec<&str> = self.lines.iter().map(String::as_str).collect();
        if !self.current.is_empty() {
            parts.push(&self.current);
        }
        parts.join("\n")
    }

    /// Number of finalized lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Whether the frame holds no text at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty() && self.current.is_empty()
    }

    fn finalize_line(&mut self) {
        let raw = std::mem::take(&mut self.current);
        let start = if self.marker.is_empty() {
            None
        } else {
            raw.to_ascii_uppercase().find(&self.marker)
        };

        let line = match start {
            Some(idx) => {
                self.lines.clear();
                raw[idx..].to_string()
            }
            None => raw,
        };

        if self.lines.len() == self.max_lines {
            self.lines.pop_front();
        }
        self.lines.push_back(line);
        self.dirty = true;
    }
}

impl Default for StreamFrame {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LINES, DEFAULT_FRAME_MARKER)
    }
}
