//! Explicit form schemas for user-submitted posts and comments.
//!
//! Each form is described by a static [`FormSchema`]. Validation walks the
//! schema against raw urlencoded input and yields either cleaned values or
//! per-field error messages. Rendering reuses the same schema for labels and
//! help texts.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

pub const REQUIRED_MESSAGE: &str = "This field is required.";
pub const INVALID_CHOICE_MESSAGE: &str =
    "Select a valid choice. That choice is not one of the available choices.";

/// Maximum length of the stored image reference.
pub const IMAGE_MAX_CHARS: usize = 255;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Multi-line free text, trimmed before validation.
    Text,
    /// Optional reference to another entity by numeric id.
    Choice,
    /// Path or URL of an externally stored image.
    ImageRef,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constraint {
    NotBlank,
    MaxChars(usize),
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub label: &'static str,
    pub help_text: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    pub constraints: &'static [Constraint],
}

#[derive(Debug, Clone, Copy)]
pub struct FormSchema {
    pub name: &'static str,
    pub fields: &'static [FieldSpec],
}

pub const POST_SCHEMA: FormSchema = FormSchema {
    name: "post",
    fields: &[
        FieldSpec {
            name: "text",
            label: "Text",
            help_text: "Enter the post text",
            kind: FieldKind::Text,
            required: true,
            constraints: &[Constraint::NotBlank],
        },
        FieldSpec {
            name: "group",
            label: "Group",
            help_text: "Choose a group",
            kind: FieldKind::Choice,
            required: false,
            constraints: &[],
        },
        FieldSpec {
            name: "image",
            label: "Image",
            help_text: "",
            kind: FieldKind::ImageRef,
            required: false,
            constraints: &[Constraint::MaxChars(IMAGE_MAX_CHARS)],
        },
    ],
};

pub const COMMENT_SCHEMA: FormSchema = FormSchema {
    name: "comment",
    fields: &[FieldSpec {
        name: "text",
        label: "Text",
        help_text: "Enter the comment text",
        kind: FieldKind::Text,
        required: true,
        constraints: &[Constraint::NotBlank],
    }],
};

/// A single cleaned field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanedValue {
    Text(String),
    Id(i64),
}

/// Cleaned values keyed by field name; absent optional fields are omitted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanedForm {
    values: BTreeMap<&'static str, CleanedValue>,
}

impl CleanedForm {
    pub fn text(&self, field: &str) -> Option<&str> {
        match self.values.get(field) {
            Some(CleanedValue::Text(value)) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn id(&self, field: &str) -> Option<i64> {
        match self.values.get(field) {
            Some(CleanedValue::Id(value)) => Some(*value),
            _ => None,
        }
    }
}

/// Field-level validation messages, ordered by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FieldErrors {
    errors: BTreeMap<String, Vec<String>>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.errors
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn for_field(&self, field: &str) -> &[String] {
        self.errors
            .get(field)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.errors
            .iter()
            .map(|(field, messages)| (field.as_str(), messages.as_slice()))
    }
}

impl std::fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (field, messages) in &self.errors {
            for message in messages {
                if !first {
                    f.write_str("; ")?;
                }
                write!(f, "{field}: {message}")?;
                first = false;
            }
        }
        Ok(())
    }
}

impl FormSchema {
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Validate raw submitted values against the schema.
    pub fn validate(&self, input: &HashMap<String, String>) -> Result<CleanedForm, FieldErrors> {
        let mut cleaned = CleanedForm::default();
        let mut errors = FieldErrors::new();

        for field in self.fields {
            let raw = input.get(field.name).map(|value| value.trim()).unwrap_or("");

            if raw.is_empty() {
                if field.required {
                    errors.add(field.name, REQUIRED_MESSAGE);
                }
                continue;
            }

            match field.kind {
                FieldKind::Text | FieldKind::ImageRef => {
                    let mut valid = true;
                    for constraint in field.constraints {
                        if let Some(message) = check_constraint(*constraint, raw) {
                            errors.add(field.name, message);
                            valid = false;
                        }
                    }
                    if valid {
                        cleaned
                            .values
                            .insert(field.name, CleanedValue::Text(raw.to_string()));
                    }
                }
                FieldKind::Choice => match raw.parse::<i64>() {
                    Ok(id) if id > 0 => {
                        cleaned.values.insert(field.name, CleanedValue::Id(id));
                    }
                    _ => errors.add(field.name, INVALID_CHOICE_MESSAGE),
                },
            }
        }

        if errors.is_empty() {
            Ok(cleaned)
        } else {
            Err(errors)
        }
    }
}

fn check_constraint(constraint: Constraint, value: &str) -> Option<String> {
    match constraint {
        Constraint::NotBlank if value.trim().is_empty() => Some(REQUIRED_MESSAGE.to_string()),
        Constraint::NotBlank => None,
        Constraint::MaxChars(limit) => {
            let count = value.chars().count();
            (count > limit).then(|| {
                format!("Ensure this value has at most {limit} characters (it has {count}).")
            })
        }
    }
}

/// Cleaned input of the post create/edit form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostForm {
    pub text: String,
    pub group_id: Option<i64>,
    pub image: Option<String>,
}

impl PostForm {
    pub fn parse(input: &HashMap<String, String>) -> Result<Self, FieldErrors> {
        let cleaned = POST_SCHEMA.validate(input)?;
        Ok(Self {
            text: cleaned.text("text").unwrap_or_default().to_string(),
            group_id: cleaned.id("group"),
            image: cleaned.text("image").map(str::to_string),
        })
    }
}

/// Cleaned input of the comment form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentForm {
    pub text: String,
}

impl CommentForm {
    pub fn parse(input: &HashMap<String, String>) -> Result<Self, FieldErrors> {
        let cleaned = COMMENT_SCHEMA.validate(input)?;
        Ok(Self {
            text: cleaned.text("text").unwrap_or_default().to_string(),
        })
    }
}
