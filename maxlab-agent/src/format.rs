//! Reply formatting
//!
//! A [`Reply`] is the text handed back to the caller, tagged with how it
//! should be rendered. It compares and displays exactly like its text.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::ops::Deref;

/// How a reply should be rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyKind {
    PlainText,
    Markdown,
}

/// Reply text plus its rendering hint
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reply {
    kind: ReplyKind,
    value: String,
}

impl Reply {
    pub fn kind(&self) -> ReplyKind {
        self.kind
    }

    pub fn is_markdown(&self) -> bool {
        self.kind == ReplyKind::Markdown
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn into_string(self) -> String {
        self.value
    }
}

/// Wrap `text` as Markdown for rich display
pub fn tag_as_markdown(text: impl Into<String>) -> Reply {
    Reply {
        kind: ReplyKind::Markdown,
        value: text.into(),
    }
}

/// Wrap `text` as plain text
pub fn plain(text: impl Into<String>) -> Reply {
    Reply {
        kind: ReplyKind::PlainText,
        value: text.into(),
    }
}

impl Deref for Reply {
    type Target = str;

    fn deref(&self) -> &str {
        &self.value
    }
}

impl AsRef<str> for Reply {
    fn as_ref(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

impl PartialEq<str> for Reply {
    fn eq(&self, other: &str) -> bool {
        self.value == other
    }
}

impl PartialEq<&str> for Reply {
    fn eq(&self, other: &&str) -> bool {
        self.value == *other
    }
}

impl PartialEq<String> for Reply {
    fn eq(&self, other: &String) -> bool {
        &self.value == other
    }
}

impl From<Reply> for String {
    fn from(reply: Reply) -> Self {
        reply.value
    }
}

static HEADER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^#+\s+").expect("valid regex"));
static BOLD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*(.*?)\*\*").expect("valid regex"));
static ITALIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*(.*?)\*").expect("valid regex"));
static CODE_BLOCK: Lazy<Regex> = Lazy::new(|| Regex::new(r"```[^`]*```").expect("valid regex"));
static INLINE_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"`([^`]*)`").expect("valid regex"));
static LINK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[(.*?)\]\(.*?\)").expect("valid regex"));
static BLANK_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n\n+").expect("valid regex"));

/// Remove common Markdown syntax. The passes run in a fixed order and each
/// sees the previous pass's output, so emphasis markers inside code are
/// consumed before code is handled.
pub fn strip_markdown(text: &str) -> String {
    let text = HEADER.replace_all(text, "");
    let text = BOLD.replace_all(&text, "$1");
    let text = ITALIC.replace_all(&text, "$1");
    let text = CODE_BLOCK.replace_all(&text, "");
    let text = INLINE_CODE.replace_all(&text, "$1");
    let text = LINK.replace_all(&text, "$1");
    let text = BLANK_RUN.replace_all(&text, "\n");
    text.trim().to_string()
}
