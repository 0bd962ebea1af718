use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::RecordError;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    Javascript,
    Bash,
    Ruby,
}

impl Language {
    pub const ALL: [Language; 4] = [
        Language::Python,
        Language::Javascript,
        Language::Bash,
        Language::Ruby,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::Javascript => "javascript",
            Language::Bash => "bash",
            Language::Ruby => "ruby",
        }
    }

    /// Interpreter binary and the file name the source is written to.
    pub fn program(self) -> (&'static str, &'static str) {
        match self {
            Language::Python => ("python3", "main.py"),
            Language::Javascript => ("node", "main.js"),
            Language::Bash => ("bash", "main.sh"),
            Language::Ruby => ("ruby", "main.rb"),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "python" | "python3" | "py" => Ok(Language::Python),
            "javascript" | "js" | "node" => Ok(Language::Javascript),
            "bash" | "sh" => Ok(Language::Bash),
            "ruby" | "rb" => Ok(Language::Ruby),
            other => Err(RecordError::Validation(format!(
                "unsupported language: {other}"
            ))),
        }
    }
}
