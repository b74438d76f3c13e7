// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Consistent error formatting for wallgrab.
//!
//! Provides utilities to format fatal errors with actionable information
//! including possible causes, suggested fixes, and a support link.

/// GitHub issues URL for support.
pub const GITHUB_ISSUES_URL: &str = "https://github.com/morganforge/wallgrab/issues";

/// Formats an error message with title, causes, fixes, and help link.
///
/// # Arguments
///
/// * `title` - The error title (e.g., "Collection not found")
/// * `causes` - List of possible causes
/// * `fixes` - List of suggested fixes (should be actionable commands or steps)
///
/// # Example
///
/// ```
/// use wallgrab::error::format_error;
///
/// let error = format_error(
///     "Collection \"Nature\" not found for user \"alice\"",
///     &[
///         "The label is misspelled (matching is case-sensitive)",
///         "The collection is private and no API key was supplied",
///     ],
///     &[
///         "List the collections: wallgrab collections -u alice",
///         "Pass an API key: wallgrab --apikey <KEY> ...",
///     ],
/// );
/// println!("{}", error);
/// ```
pub fn format_error(title: &str, causes: &[&str], fixes: &[&str]) -> String {
    let mut output = String::new();

    // Error title
    output.push_str(&format!("[✗] {}\n\n", title));

    // Possible causes
    if !causes.is_empty() {
        output.push_str("Possible causes:\n");
        for cause in causes {
            output.push_str(&format!("  - {}\n", cause));
        }
        output.push('\n');
    }

    // Suggested fixes
    if !fixes.is_empty() {
        output.push_str("Try these fixes:\n");
        for (i, fix) in fixes.iter().enumerate() {
            output.push_str(&format!("  {}. {}\n", i + 1, fix));
        }
        output.push('\n');
    }

    // Help link
    output.push_str(&format!("Need help? {}", GITHUB_ISSUES_URL));

    output
}

/// Formats a simple error with just a title and help link.
pub fn format_simple_error(title: &str) -> String {
    format!("[✗] {}\n\nNeed help? {}", title, GITHUB_ISSUES_URL)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_error() {
        let error = format_error(
            "Test Error",
            &["Cause 1", "Cause 2"],
            &["Fix 1", "Fix 2"],
        );

        assert!(error.contains("[✗] Test Error"));
        assert!(error.contains("Possible causes:"));
        assert!(error.contains("  - Cause 1"));
        assert!(error.contains("  - Cause 2"));
        assert!(error.contains("Try these fixes:"));
        assert!(error.contains("  1. Fix 1"));
        assert!(error.contains("  2. Fix 2"));
        assert!(error.contains(GITHUB_ISSUES_URL));
    }

    #[test]
    fn test_format_simple_error() {
        let error = format_simple_error("Simple error");
        assert!(error.contains("[✗] Simple error"));
        assert!(error.contains(GITHUB_ISSUES_URL));
    }

    #[test]
    fn test_empty_causes_and_fixes() {
        let error = format_error("Empty test", &[], &[]);
        assert!(error.contains("[✗] Empty test"));
        assert!(!error.contains("Possible causes:"));
        assert!(!error.contains("Try these fixes:"));
        assert!(error.contains(GITHUB_ISSUES_URL));
    }
}
