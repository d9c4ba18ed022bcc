//! Configuration validation.
//!
//! Checks that every active channel carries the settings its plug-in needs,
//! flags misspelled channel names, and reports unusable publishing timeouts.

use std::{fmt, path::Path};

use crate::schema::ReshareConfig;

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Info => write!(f, "info"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Category: "syntax", "missing-setting", "unknown-channel", "publishing".
    pub category: &'static str,
    /// Dotted path, e.g. "channels.telegram.token"
    pub path: String,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] {}: {}",
            self.severity, self.category, self.path, self.message
        )
    }
}

/// Result of validating a configuration.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
}

impl ValidationResult {
    /// Returns `true` if any diagnostic is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Count diagnostics by severity.
    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }

    fn push(
        &mut self,
        severity: Severity,
        category: &'static str,
        path: impl Into<String>,
        message: impl Into<String>,
    ) {
        self.diagnostics.push(Diagnostic {
            severity,
            category,
            path: path.into(),
            message: message.into(),
        });
    }
}

/// Known channel types and the settings each requires when active.
const KNOWN_CHANNELS: &[(&str, &[&str])] = &[
    ("telegram", &["chat_id", "token", "username"]),
    (
        "zulip",
        &["instance", "chat_id", "subject", "bot_token", "bot_email"],
    ),
    (
        "twitter",
        &["api_key", "api_key_secret", "access_token", "access_secret"],
    ),
    ("mastodon", &[]),
    ("facebook", &[]),
];

/// Names of every channel type reshare knows about.
pub fn known_channel_names() -> impl Iterator<Item = &'static str> {
    KNOWN_CHANNELS.iter().map(|(name, _)| *name)
}

/// Validate an already-parsed configuration.
#[must_use]
pub fn validate(config: &ReshareConfig) -> ValidationResult {
    let mut result = ValidationResult::default();
    check_publishing(config, &mut result);
    check_channels(config, &mut result);
    result
}

/// Parse and validate a TOML document.
#[must_use]
pub fn validate_toml_str(toml_str: &str) -> ValidationResult {
    match toml::from_str::<ReshareConfig>(toml_str) {
        Ok(config) => validate(&config),
        Err(e) => {
            let mut result = ValidationResult::default();
            result.push(Severity::Error, "syntax", "", e.to_string());
            result
        },
    }
}

/// Load and validate a config file of any supported format.
#[must_use]
pub fn validate_file(path: &Path) -> ValidationResult {
    match crate::loader::load_config(path) {
        Ok(config) => validate(&config),
        Err(e) => {
            let mut result = ValidationResult::default();
            result.push(Severity::Error, "syntax", path.display().to_string(), e.to_string());
            result
        },
    }
}

fn check_publishing(config: &ReshareConfig, result: &mut ValidationResult) {
    if config.publishing.delivery_timeout_secs == 0 {
        result.push(
            Severity::Error,
            "publishing",
            "publishing.delivery_timeout_secs",
            "delivery timeout must be greater than zero",
        );
    }
    if config.publishing.validation_timeout_secs == 0 {
        result.push(
            Severity::Error,
            "publishing",
            "publishing.validation_timeout_secs",
            "validation timeout must be greater than zero",
        );
    }
}

fn check_channels(config: &ReshareConfig, result: &mut ValidationResult) {
    let known: Vec<&str> = known_channel_names().collect();

    for (name, settings) in &config.channels {
        let Some((_, required)) = KNOWN_CHANNELS
            .iter()
            .find(|(known, _)| *known == name.as_str())
        else {
            let message = match suggest(name, &known, 3) {
                Some(hint) => format!("unknown channel \"{name}\" (did you mean \"{hint}\"?)"),
                None => format!("unknown channel \"{name}\""),
            };
            result.push(
                Severity::Warning,
                "unknown-channel",
                format!("channels.{name}"),
                message,
            );
            continue;
        };

        if !settings.active {
            continue;
        }

        for key in *required {
            let present = settings
                .option_str(key)
                .is_some_and(|value| !value.trim().is_empty());
            if !present {
                result.push(
                    Severity::Error,
                    "missing-setting",
                    format!("channels.{name}.{key}"),
                    format!("active channel \"{name}\" requires \"{key}\""),
                );
            }
        }
    }

    if config.active_channels().is_empty() {
        result.push(
            Severity::Warning,
            "publishing",
            "channels",
            "no active channel configured; nothing will be published",
        );
    }
}

/// Levenshtein edit distance between two strings.
fn levenshtein(a: &str, b: &str) -> usize {
    let b_chars: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b_chars.len()).collect();

    for (i, ca) in a.chars().enumerate() {
        let mut curr = Vec::with_capacity(prev.len());
        curr.push(i + 1);
        for (j, cb) in b_chars.iter().enumerate() {
            let cost = usize::from(ca != *cb);
            curr.push((prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1));
        }
        prev = curr;
    }

    prev[b_chars.len()]
}

fn suggest<'a>(needle: &str, candidates: &[&'a str], max_distance: usize) -> Option<&'a str> {
    candidates
        .iter()
        .map(|candidate| (levenshtein(needle, candidate), *candidate))
        .filter(|(distance, _)| *distance <= max_distance)
        .min_by_key(|(distance, _)| *distance)
        .map(|(_, candidate)| candidate)
}
