use std::fmt;
use std::sync::{Mutex, PoisonError};

pub const PENDING_TEXT: &str = "Analyzing…";

/// One state of the output region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rendered {
    Pending,
    Notes(Vec<String>),
    /// Pretty-printed `data` payload.
    Json(String),
    Error(String),
}

impl Rendered {
    /// Markup for the output element: a `<li>` per note, or escaped text.
    pub fn to_html(&self) -> String {
        match self {
            Rendered::Pending => format!("<li>{}</li>", PENDING_TEXT),
            Rendered::Notes(notes) => notes
                .iter()
                .map(|n| format!("<li>{}</li>", escape_html(n)))
                .collect(),
            Rendered::Json(text) | Rendered::Error(text) => escape_html(text),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Rendered::Error(_))
    }
}

impl fmt::Display for Rendered {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rendered::Pending => f.write_str(PENDING_TEXT),
            Rendered::Notes(notes) => {
                for (i, note) in notes.iter().enumerate() {
                    if i > 0 {
                        f.write_str("\n")?;
                    }
                    write!(f, "- {}", note)?;
                }
                Ok(())
            }
            Rendered::Json(text) | Rendered::Error(text) => f.write_str(text),
        }
    }
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// The output region. Each call replaces what was shown before.
pub trait OutputSink: Send + Sync {
    fn render(&self, output: &Rendered);
}

/// Keeps every frame it was given.
#[derive(Debug, Default)]
pub struct RecordingSink {
    frames: Mutex<Vec<Rendered>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> Vec<Rendered> {
        self.frames.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn last(&self) -> Option<Rendered> {
        self.frames.lock().unwrap_or_else(PoisonError::into_inner).last().cloned()
    }
}

impl OutputSink for RecordingSink {
    fn render(&self, output: &Rendered) {
        self.frames
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(output.clone());
    }
}

/// Writes results to stdout; the pending indicator goes to stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleSink {
    pub html: bool,
}

impl OutputSink for ConsoleSink {
    fn render(&self, output: &Rendered) {
        if let Rendered::Pending = output {
            eprintln!("{}", PENDING_TEXT);
            return;
        }
        if self.html {
            println!("{}", output.to_html());
        } else {
            println!("{}", output);
        }
    }
}
