//! User interface module - interaction (prompts) and formatting.
//!
//! Separates concerns:
//! - `formatter` - Pure formatting functions
//! - This module - Interactive prompts and user input handling

use std::io::{self, BufRead, Write};

use anyhow::Result;

pub mod formatter;

// Re-export formatter functions for convenience
pub use formatter::{
    display_error, display_status, display_success, format_branches, format_marker,
    format_rebase_report, format_revisions, format_run_summary, with_repo,
};

/// Prompts user to confirm an action with a yes/no prompt.
///
/// Displays the given prompt and accepts "y" or "yes" (case-insensitive) as confirmation.
/// Default is "no" if user presses Enter.
///
/// # Arguments
/// * `prompt` - The prompt message to display (without the "(y/N): " suffix)
///
/// # Returns
/// * `Ok(true)` - If user entered "y" or "yes"
/// * `Ok(false)` - Otherwise (including Enter, or "n"/"no")
/// * `Err` - If input error occurs
pub fn confirm_action(prompt: &str) -> Result<bool> {
    let stdin = io::stdin();
    confirm_from(prompt, &mut stdin.lock(), &mut io::stdout())
}

fn confirm_from(prompt: &str, input: &mut impl BufRead, output: &mut impl Write) -> Result<bool> {
    write!(output, "\n{} (y/N): ", prompt)?;
    output.flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;

    let response = line.trim().to_lowercase();
    Ok(response == "y" || response == "yes")
}
