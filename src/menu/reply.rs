//! Outbound reply descriptors
//!
//! The core only emits text plus an ordered list of option labels; turning
//! them into platform buttons happens outside this crate.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TextFormat {
    #[default]
    Plain,
    Html,
}

/// Selectable options, one label per row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Keyboard {
    pub rows: Vec<String>,
    /// Hide the keyboard after one choice
    pub one_time: bool,
}

impl Keyboard {
    pub fn persistent<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            rows: labels.into_iter().map(Into::into).collect(),
            one_time: false,
        }
    }

    pub fn one_time<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            one_time: true,
            ..Self::persistent(labels)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Reply {
    None,
    Text {
        text: String,
    },
    WithOptions {
        text: String,
        keyboard: Keyboard,
        format: TextFormat,
    },
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Reply::Text { text: text.into() }
    }

    pub fn options(text: impl Into<String>, keyboard: Keyboard) -> Self {
        Reply::WithOptions {
            text: text.into(),
            keyboard,
            format: TextFormat::Plain,
        }
    }

    pub fn html(text: impl Into<String>, keyboard: Keyboard) -> Self {
        Reply::WithOptions {
            text: text.into(),
            keyboard,
            format: TextFormat::Html,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Reply::None)
    }

    pub fn text_body(&self) -> Option<&str> {
        match self {
            Reply::None => None,
            Reply::Text { text } | Reply::WithOptions { text, .. } => Some(text),
        }
    }

    pub fn keyboard(&self) -> Option<&Keyboard> {
        match self {
            Reply::WithOptions { keyboard, .. } => Some(keyboard),
            _ => None,
        }
    }
}

/// Escape user supplied text for an HTML formatted reply
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}
