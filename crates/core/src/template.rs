// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Prompt token substitution.
//!
//! Substitution is a single left-to-right pass: a substituted value that
//! itself contains a brace-delimited token is NOT re-expanded. Bead titles
//! and descriptions are user-controlled text, so re-expansion would be an
//! injection vector.

use regex::Regex;
use std::sync::LazyLock;

/// Recognised prompt tokens.
// Allow expect here as the regex is compile-time verified to be valid
#[allow(clippy::expect_used)]
static TOKEN_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{(BeadID|BeadTitle|BeadDescription|Label|BeadParent)\}")
        .expect("constant regex pattern is valid")
});

/// Values available to prompt templates.
#[derive(Debug, Clone, Default)]
pub struct PromptVars {
    pub bead_id: String,
    pub bead_title: String,
    pub bead_description: String,
    pub label: String,
    pub bead_parent: String,
}

impl PromptVars {
    fn get(&self, token: &str) -> &str {
        match token {
            "BeadID" => &self.bead_id,
            "BeadTitle" => &self.bead_title,
            "BeadDescription" => &self.bead_description,
            "Label" => &self.label,
            "BeadParent" => &self.bead_parent,
            _ => "",
        }
    }
}

/// Expand the recognised tokens in `template`. Unrecognised brace
/// sequences are left as-is.
pub fn expand(template: &str, vars: &PromptVars) -> String {
    TOKEN_PATTERN
        .replace_all(template, |caps: &regex::Captures| {
            vars.get(&caps[1]).to_string()
        })
        .to_string()
}

#[cfg(test)]
#[path = "template_tests.rs"]
mod tests;
