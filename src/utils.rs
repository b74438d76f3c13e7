// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Utility functions for wallgrab.
//!
//! This module provides common utility functions used across the codebase.

use std::path::{Path, PathBuf};

/// Mask a sensitive string (like API keys) for logging.
///
/// Shows only the first `visible_prefix` characters and replaces the rest with "...".
/// This ensures API keys are never logged in full.
///
/// # Examples
///
/// ```
/// use wallgrab::utils::mask_sensitive;
///
/// let api_key = "wh-abcdefghijklmnopqrstuvwxyz123456";
/// let masked = mask_sensitive(&api_key, 5);
/// assert_eq!(masked, "wh-ab...");
/// ```
pub fn mask_sensitive(input: &str, visible_prefix: usize) -> String {
    if input.len() <= visible_prefix {
        // If it's shorter than the visible prefix, still mask it to avoid leaking length
        return format!("{}...", input);
    }

    let prefix: String = input.chars().take(visible_prefix).collect();
    format!("{}...", prefix)
}

/// Expand a leading `~` or `~/` in a path to the user's home directory.
///
/// Paths without the shorthand, and `~otheruser` forms, are returned as-is.
pub fn expand_tilde(path: &Path) -> PathBuf {
    let Some(text) = path.to_str() else {
        return path.to_path_buf();
    };

    if text == "~" {
        return dirs::home_dir().unwrap_or_else(|| path.to_path_buf());
    }

    if let Some(rest) = text.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }

    path.to_path_buf()
}

/// Format a byte count as a human-readable size string.
pub fn format_bytes(bytes: u64) -> String {
    if bytes >= 1_073_741_824 {
        format!("{:.1} GB", bytes as f64 / 1_073_741_824.0)
    } else if bytes >= 1_048_576 {
        format!("{:.1} MB", bytes as f64 / 1_048_576.0)
    } else if bytes >= 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_sensitive() {
        assert_eq!(mask_sensitive("wh-secret123456", 5), "wh-se...");
        assert_eq!(mask_sensitive("short", 8), "short...");
        assert_eq!(mask_sensitive("", 8), "...");
    }

    #[test]
    fn test_expand_tilde_passthrough() {
        assert_eq!(expand_tilde(Path::new("/tmp/walls")), PathBuf::from("/tmp/walls"));
        assert_eq!(expand_tilde(Path::new("relative/dir")), PathBuf::from("relative/dir"));
        // ~user expansion is not supported and must not be mangled.
        assert_eq!(expand_tilde(Path::new("~bob/walls")), PathBuf::from("~bob/walls"));
    }

    #[test]
    fn test_expand_tilde_home() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_tilde(Path::new("~")), home);
            assert_eq!(expand_tilde(Path::new("~/walls")), home.join("walls"));
        }
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MB");
        assert_eq!(format_bytes(3 * 1024 * 1024 * 1024), "3.0 GB");
    }
}
