//! Helpful error messages for the CLI surface.
//!
//! Every subsystem below this layer is lenient; this is the one place a
//! failure is meant to reach the user, so it gets suggestions attached.

use anyhow::Result;
use colored::Colorize;

/// Adds context and suggestions to a `Result`'s error before it bubbles out
/// of `main`.
pub trait EnhancedError<T> {
    fn context_with_help(self, msg: &str, help: &[&str]) -> Result<T>;
}

impl<T, E: std::error::Error + Send + Sync + 'static> EnhancedError<T> for Result<T, E> {
    fn context_with_help(self, msg: &str, help: &[&str]) -> Result<T> {
        self.map_err(|e| {
            let mut error_msg = format!("{}\n\n{}", msg.red().bold(), e);
            if !help.is_empty() {
                error_msg.push_str(&format!("\n\n{}", "Possible solutions:".yellow().bold()));
                for (i, h) in help.iter().enumerate() {
                    error_msg.push_str(&format!("\n  {}. {}", i + 1, h));
                }
            }
            anyhow::anyhow!(error_msg)
        })
    }
}

pub mod helpers {
    pub const PIN_EXP_USAGE_HELP: &[&str] = &[
        "pin-exp expects <keyword>:<rule>, e.g. pin-exp \"retry:always retry on 429\"",
    ];

    pub const MEMORIZE_USAGE_HELP: &[&str] = &[
        "memorize expects <concept>:<content> or <concept> <content>",
        "Both concept and content must be non-empty",
    ];

    pub const ENGINE_DIR_HELP: &[&str] = &[
        "Set BRAIN_SYNAPSE_DIR to the engine directory, or pass --engine-dir",
        "Run 'distill' at least once to initialize the weight files",
    ];
}
