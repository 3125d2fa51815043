// SPDX-FileCopyrightText: 2026 Helpdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration diagnostics.
//!
//! Anything wrong with `helpdesk.toml` (a misspelled key, a value of the
//! wrong type, an unknown permission name, an out-of-range limit) becomes a
//! [`ConfigError`]. When the offending key came from a file, the error
//! points at its line.

// The Diagnostic derive assigns span/source fields it never reads back.
#![allow(unused_assignments)]

use miette::{Diagnostic, GraphicalReportHandler, NamedSource, SourceSpan};
use thiserror::Error;

/// Jaro-Winkler score a candidate must beat to be offered as a correction.
const CLOSE_ENOUGH: f64 = 0.8;

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    /// A key no section accepts; `deny_unknown_fields` reports these.
    #[error("unknown key `{key}` in {}", section_label(.section))]
    #[diagnostic(
        code(helpdesk::config::unknown_key),
        help("{}", with_suggestion(suggestion.as_deref(), "accepted keys", valid_keys))
    )]
    UnknownKey {
        /// Dotted section path, empty for the top level.
        section: String,
        key: String,
        suggestion: Option<String>,
        valid_keys: String,
        #[label("not recognized here")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("`{key}` has the wrong type: found {found}")]
    #[diagnostic(code(helpdesk::config::invalid_type), help("expected {expected}"))]
    InvalidType {
        /// Dotted path of the setting, e.g. `storage.busy_timeout_ms`.
        key: String,
        found: String,
        expected: String,
        #[label("expected {expected}")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("unknown permission `{name}` in permissions.{role}")]
    #[diagnostic(
        code(helpdesk::config::unknown_permission),
        help("{}", with_suggestion(suggestion.as_deref(), "known permissions", &helpdesk_core::Permission::names().join(", ")))
    )]
    UnknownPermission {
        role: String,
        name: String,
        suggestion: Option<String>,
    },

    #[error("validation error: {message}")]
    #[diagnostic(code(helpdesk::config::validation))]
    Validation { message: String },

    #[error("configuration error: {0}")]
    #[diagnostic(code(helpdesk::config::other))]
    Other(String),
}

fn section_label(section: &str) -> String {
    if section.is_empty() {
        "the top level".to_string()
    } else {
        format!("[{section}]")
    }
}

fn with_suggestion(suggestion: Option<&str>, what: &str, valid: &str) -> String {
    match suggestion {
        Some(s) => format!("did you mean `{s}`? {what}: {valid}"),
        None => format!("{what}: {valid}"),
    }
}

/// The candidate closest to `unknown`, if any is close enough to be a typo.
pub fn closest<'a>(unknown: &str, candidates: impl IntoIterator<Item = &'a str>) -> Option<&'a str> {
    candidates
        .into_iter()
        .map(|c| (strsim::jaro_winkler(unknown, c), c))
        .filter(|(score, _)| *score > CLOSE_ENOUGH)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, c)| c)
}

/// Turn every error figment collected into a diagnostic.
///
/// `sources` pairs each TOML file that was read with its content, so keys
/// can be located. A single source is assumed to be where every error came
/// from, which covers inline strings that carry no file metadata.
pub fn from_figment(err: figment::Error, sources: &[(String, String)]) -> Vec<ConfigError> {
    use figment::error::Kind;

    err.into_iter()
        .map(|error| {
            let path: Vec<String> = error.path.to_vec();
            match &error.kind {
                Kind::UnknownField(key, expected) => {
                    let section = path.join(".");
                    let (span, src) = locate(&error, sources, &section, key);
                    ConfigError::UnknownKey {
                        suggestion: closest(key, expected.iter().copied()).map(str::to_owned),
                        valid_keys: expected.join(", "),
                        section,
                        key: key.clone(),
                        span,
                        src,
                    }
                }
                Kind::InvalidType(found, expected) => {
                    let (section, key) = match path.split_last() {
                        Some((key, parents)) => (parents.join("."), key.clone()),
                        None => (String::new(), String::new()),
                    };
                    let (span, src) = locate(&error, sources, &section, &key);
                    ConfigError::InvalidType {
                        key: path.join("."),
                        found: found.to_string(),
                        expected: expected.to_string(),
                        span,
                        src,
                    }
                }
                _ => ConfigError::Other(error.to_string()),
            }
        })
        .collect()
}

fn locate(
    error: &figment::Error,
    sources: &[(String, String)],
    section: &str,
    key: &str,
) -> (Option<SourceSpan>, Option<NamedSource<String>>) {
    let file = error
        .metadata
        .as_ref()
        .and_then(|m| m.source.as_ref())
        .and_then(|s| match s {
            figment::Source::File(p) => Some(p.display().to_string()),
            _ => None,
        });

    let source = match file {
        Some(file) => sources.iter().find(|(p, _)| *p == file),
        None if sources.len() == 1 => sources.first(),
        None => None,
    };

    source
        .filter(|_| !key.is_empty())
        .and_then(|(name, content)| {
            let offset = locate_key(content, section, key)?;
            Some((
                Some(SourceSpan::new(offset.into(), key.len())),
                Some(NamedSource::new(name, content.clone())),
            ))
        })
        .unwrap_or((None, None))
}

/// Byte offset of the `key = ...` line inside `[section]`, or inside the
/// root table when `section` is empty.
pub fn locate_key(content: &str, section: &str, key: &str) -> Option<usize> {
    let mut current = "";
    let mut offset = 0;
    for line in content.split_inclusive('\n') {
        let trimmed = line.trim_start();
        let indent = line.len() - trimmed.len();
        if let Some(header) = trimmed.strip_prefix('[') {
            current = header.split(']').next().unwrap_or_default().trim();
        } else if current == section
            && let Some(rest) = trimmed.strip_prefix(key)
            && rest.trim_start().starts_with('=')
        {
            return Some(offset + indent);
        }
        offset += line.len();
    }
    None
}

/// Print each error to stderr, graphically when miette can render it.
pub fn render_errors(errors: &[ConfigError]) {
    let handler = GraphicalReportHandler::new();
    for error in errors {
        let mut out = String::new();
        match handler.render_report(&mut out, error as &dyn Diagnostic) {
            Ok(()) => eprint!("{out}"),
            Err(_) => eprintln!("error: {error}"),
        }
    }
}
