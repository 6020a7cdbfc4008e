//! Glob-style action patterns.
//!
//! A pattern matches an action iff the anchored regex built from it does:
//! `*` becomes `.*`, `?` becomes `.`, everything else is matched literally.

use regex::Regex;

use aigos_core::GovernanceError;

/// A compiled action pattern.
#[derive(Clone, Debug)]
pub struct ActionPattern {
    raw: String,
    regex: Regex,
}

impl ActionPattern {
    pub fn compile(pattern: &str) -> Result<Self, GovernanceError> {
        let mut translated = String::with_capacity(pattern.len() + 8);
        translated.push('^');
        for ch in pattern.chars() {
            match ch {
                '*' => translated.push_str(".*"),
                '?' => translated.push('.'),
                other => translated.push_str(&regex::escape(&other.to_string())),
            }
        }
        translated.push('$');

        let regex = Regex::new(&translated).map_err(|e| GovernanceError::BadFormat {
            field: "pattern".to_string(),
            reason: format!("'{pattern}' does not compile: {e}"),
        })?;
        Ok(Self { raw: pattern.to_string(), regex })
    }

    pub fn matches(&self, action: &str) -> bool {
        self.regex.is_match(action)
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}
