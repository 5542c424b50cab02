//! Assuan-style status line rendering (spec.md §4.G: "emits structured
//! status lines").

use std::fmt;

#[derive(Debug, Clone)]
pub enum StatusLine {
    /// `S KEYWORD args...` — an informational status line.
    Info { keyword: &'static str, args: String },
    /// The command succeeded.
    Ok,
    /// The command failed; `code` is a small stable integer, `message`
    /// human-readable.
    Err { code: u32, message: String },
}

impl StatusLine {
    pub fn info(keyword: &'static str, args: impl Into<String>) -> Self {
        StatusLine::Info { keyword, args: args.into() }
    }

    pub fn err(code: u32, message: impl Into<String>) -> Self {
        StatusLine::Err { code, message: message.into() }
    }
}

impl fmt::Display for StatusLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusLine::Info { keyword, args } => {
                if args.is_empty() {
                    write!(f, "S {keyword}")
                } else {
                    write!(f, "S {keyword} {args}")
                }
            }
            StatusLine::Ok => write!(f, "OK"),
            StatusLine::Err { code, message } => write!(f, "ERR {code} {message}"),
        }
    }
}
