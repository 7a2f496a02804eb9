//! Variable-reference tokens inside authored strings.
//!
//! Validation and conversion both read tokens through [`variable_tokens`]: a token the
//! converter rewrites is exactly a token validation accepts.

use flowbuilder_types::WorkflowAction;
use regex::Regex;
use std::sync::OnceLock;

const CONTACT_VARIABLE_ID: &str = "contact";

fn token_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\bvar-([A-Za-z0-9_]+(?:-[A-Za-z0-9_]+)*)(?:\.([A-Za-z0-9_]+))?")
            .expect("variable token pattern is valid")
    })
}

fn embedded_runtime_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\{\{\s*contact\.([A-Za-z0-9_]+)\s*\}\}")
            .expect("embedded runtime token pattern is valid")
    })
}

fn runtime_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\{\{\s*contact\.([A-Za-z0-9_]+)\s*\}\}$")
            .expect("runtime token pattern is valid")
    })
}

/// A `var-<id>[.<field>]` occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariableToken<'a> {
    pub raw: &'a str,
    pub variable_id: &'a str,
    pub field: Option<&'a str>,
    pub start: usize,
    pub end: usize,
}

impl<'a> VariableToken<'a> {
    /// The contact field this token names, when it is a contact-field reference.
    pub fn contact_field(&self) -> Option<&'a str> {
        if self.variable_id == CONTACT_VARIABLE_ID {
            self.field
        } else {
            None
        }
    }

    pub fn runtime_token(&self) -> Option<String> {
        self.contact_field()
            .map(|field| format!("{{{{contact.{}}}}}", field))
    }
}

pub fn variable_tokens(text: &str) -> Vec<VariableToken<'_>> {
    token_pattern()
        .captures_iter(text)
        .filter_map(|captures| {
            let whole = captures.get(0)?;
            let variable_id = captures.get(1)?.as_str();
            Some(VariableToken {
                raw: whole.as_str(),
                variable_id,
                field: captures.get(2).map(|field| field.as_str()),
                start: whole.start(),
                end: whole.end(),
            })
        })
        .collect()
}

/// Tokens the runtime cannot resolve.
pub fn unsupported_references(text: &str) -> Vec<&str> {
    variable_tokens(text)
        .into_iter()
        .filter(|token| token.contact_field().is_none())
        .map(|token| token.raw)
        .collect()
}

/// Rewrite `var-contact.<field>` as `{{contact.<field>}}`; every other token is left as is.
pub fn convert_template(text: &str) -> String {
    let mut converted = String::with_capacity(text.len());
    let mut cursor = 0;
    for token in variable_tokens(text) {
        if let Some(runtime) = token.runtime_token() {
            converted.push_str(&text[cursor..token.start]);
            converted.push_str(&runtime);
            cursor = token.end;
        }
    }
    converted.push_str(&text[cursor..]);
    converted
}

/// Inverse of [`convert_template`]: `{{contact.<field>}}` back to `var-contact.<field>`.
pub fn revert_template(text: &str) -> String {
    embedded_runtime_pattern()
        .replace_all(text, "var-contact.$1")
        .into_owned()
}

/// Normalize a branch variable reference to a `{{contact.<field>}}` template.
/// Accepts `var-contact.<field>`, `contact.<field>` and the template form itself.
pub fn normalize_variable_reference(reference: &str) -> Option<String> {
    let reference = reference.trim();
    if let Some(captures) = runtime_pattern().captures(reference) {
        return captures
            .get(1)
            .map(|field| format!("{{{{contact.{}}}}}", field.as_str()));
    }
    let candidate = if reference.starts_with("var-") {
        reference.to_string()
    } else {
        format!("var-{}", reference)
    };
    let tokens = variable_tokens(&candidate);
    match tokens.as_slice() {
        [token] if token.raw.len() == candidate.len() => token.runtime_token(),
        _ => None,
    }
}

/// A template-bearing string inside an action config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateField<'a> {
    pub path: String,
    pub value: &'a str,
}

impl<'a> TemplateField<'a> {
    fn new(path: impl Into<String>, value: &'a str) -> Self {
        Self {
            path: path.into(),
            value,
        }
    }
}

/// Every config string of `action` that may carry variable tokens, with its path relative
/// to the action.
pub fn template_fields(action: &WorkflowAction) -> Vec<TemplateField<'_>> {
    let mut fields = Vec::new();
    match action {
        WorkflowAction::SendEmail { config, .. } => {
            fields.push(TemplateField::new("config.to", &config.to));
            fields.push(TemplateField::new("config.subject", &config.subject));
            fields.push(TemplateField::new("config.body", &config.body));
            if let Some(cc) = &config.cc {
                fields.push(TemplateField::new("config.cc", cc));
            }
        }
        WorkflowAction::Notification { config, .. } => {
            fields.push(TemplateField::new("config.title", &config.title));
            fields.push(TemplateField::new("config.message", &config.message));
            if let Some(recipient) = &config.recipient {
                fields.push(TemplateField::new("config.recipient", recipient));
            }
        }
        WorkflowAction::CreateTask { config, .. } => {
            fields.push(TemplateField::new("config.title", &config.title));
            if let Some(description) = &config.description {
                fields.push(TemplateField::new("config.description", description));
            }
            for (index, link) in config.links.iter().enumerate() {
                fields.push(TemplateField::new(
                    format!("config.links[{}].label", index),
                    &link.label,
                ));
                fields.push(TemplateField::new(
                    format!("config.links[{}].url", index),
                    &link.url,
                ));
            }
        }
        WorkflowAction::UpdateContact { config, .. } => {
            for (index, update) in config.fields.iter().enumerate() {
                fields.push(TemplateField::new(
                    format!("config.fields[{}].value", index),
                    &update.value,
                ));
            }
        }
        WorkflowAction::UpdateStatus { .. }
        | WorkflowAction::UpdateTask { .. }
        | WorkflowAction::CreateContact { .. }
        | WorkflowAction::SetVariable { .. }
        | WorkflowAction::Other { .. } => {}
    }
    fields
}
