use std::sync::Arc;

use tracing::warn;

use crate::directory::SecretDirectory;
use crate::envelope::{Category, envelope_candidates, mapping_candidates, record_list_candidates};

/// Marker every discovered literal is replaced with.
pub const OBFUSCATION: &str = "[OBFUSCATED]";

/// Emitted in place of a message when the directory cannot be consulted.
pub const UNREDACTABLE: &str = "[ An error occurred trying to obfuscate this message ]";

type Stage = fn(&str, Category) -> Vec<String>;

const STAGES: [Stage; 3] = [envelope_candidates, mapping_candidates, record_list_candidates];

/// Redaction engine for bus payloads.
///
/// Cheap to clone; every adapter and the router hold one.
#[derive(Clone)]
pub struct Redactor {
    directory: Arc<SecretDirectory>,
}

impl Redactor {
    pub fn new(directory: Arc<SecretDirectory>) -> Self {
        Self { directory }
    }

    pub fn directory(&self) -> &Arc<SecretDirectory> {
        &self.directory
    }

    /// Redact credentials found in the payload and every literal known to the directory.
    ///
    /// Never fails: if the directory is unavailable the whole message is
    /// replaced by [`UNREDACTABLE`] instead of leaking it.
    pub async fn redact(&self, raw: &str) -> String {
        let text = preprocess(raw);
        match self.directory.literals().await {
            Ok(literals) => replace_literals(text, literals.iter()),
            Err(err) => {
                warn!(error = %err, "could not load directory secrets");
                UNREDACTABLE.to_string()
            }
        }
    }
}

/// Replace credentials discoverable from the payload's own structure.
///
/// Each category runs the envelope, mapping-wrapper and record-list stages in
/// turn; every stage parses the text as left by the previous one.
pub fn preprocess(raw: &str) -> String {
    let mut text = raw.to_string();
    for category in Category::ALL {
        for stage in STAGES {
            let candidates = stage(&text, category);
            text = replace_literals(text, candidates.iter());
        }
    }
    text
}

fn replace_literals<'a>(mut text: String, literals: impl Iterator<Item = &'a String>) -> String {
    for literal in literals {
        if literal.is_empty() {
            continue;
        }
        for form in encoded_forms(literal) {
            if text.contains(form.as_str()) {
                text = text.replace(form.as_str(), OBFUSCATION);
            }
        }
    }
    text
}

/// The literal as it may appear in the text: verbatim, JSON-escaped, and
/// JSON-escaped with `<`, `>` and `&` written as `\u00XX`. Longest first.
fn encoded_forms(literal: &str) -> Vec<String> {
    let mut forms = vec![literal.to_string()];
    let Ok(quoted) = serde_json::to_string(literal) else {
        return forms;
    };
    let escaped = quoted[1..quoted.len() - 1].to_string();
    let html_safe = escaped
        .replace('&', "\\u0026")
        .replace('<', "\\u003c")
        .replace('>', "\\u003e");
    for form in [escaped, html_safe] {
        if !forms.contains(&form) {
            forms.push(form);
        }
    }
    // Longest first, so an escaped form is never cut in half by the verbatim one
    forms.sort_by(|a, b| b.len().cmp(&a.len()));
    forms
}
