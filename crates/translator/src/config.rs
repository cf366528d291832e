//! Translator configuration.

use std::str::FromStr;

/// How much of the source instruction stream is echoed into the output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DebugInformation {
    /// Statements only.
    #[default]
    None,
    /// A comment with offset and mnemonic before each instruction.
    CommentOnly,
    /// Like `CommentOnly`, plus the stack depth before the instruction.
    Full,
}

impl FromStr for DebugInformation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(DebugInformation::None),
            "comment" => Ok(DebugInformation::CommentOnly),
            "full" => Ok(DebugInformation::Full),
            other => Err(format!(
                "unknown debug level '{other}' (expected none, comment or full)"
            )),
        }
    }
}

/// Options shared by every function translation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslatorConfig {
    pub debug_information: DebugInformation,
    /// Upper bound on worker threads for module translation. Zero is
    /// treated as one.
    pub jobs: usize,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            debug_information: DebugInformation::None,
            jobs: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
        }
    }
}
