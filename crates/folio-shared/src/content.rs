//! Request payloads for registration, blogs, projects and the profile.
//!
//! Every payload deserializes leniently (missing fields become empty) and is
//! then checked by its own `validate`, so a bad request always yields a
//! [`ValidationError`] with a readable message instead of a decoder error.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::constants::MIN_PASSWORD_LEN;
use crate::error::ValidationError;
use crate::slug::slugify;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn required(value: &str, field: &'static str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Missing(field));
    }
    Ok(())
}

fn title_with_slug(title: &str, field: &'static str) -> Result<(), ValidationError> {
    required(title, field)?;
    if slugify(title).is_empty() {
        return Err(ValidationError::Invalid(format!(
            "{field} must contain at least one letter or digit"
        )));
    }
    Ok(())
}

/// Trim entries, drop blanks and duplicates, keep first-seen order.
pub fn normalize_labels(labels: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(labels.len());
    for label in labels {
        let label = label.trim();
        if !label.is_empty() && !out.iter().any(|seen| seen == label) {
            out.push(label.to_string());
        }
    }
    out
}

/// Lowercase and trim an email address.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
    /// The admin client checks this locally and may omit it.
    pub confirm_password: Option<String>,
}

impl Registration {
    pub fn validate(&self) -> Result<(), ValidationError> {
        required(&self.name, "name")?;
        required(&self.email, "email")?;
        if !self.email.contains('@') {
            return Err(ValidationError::Invalid(
                "Please provide a valid email".to_string(),
            ));
        }
        if self.password.is_empty() {
            return Err(ValidationError::Missing("password"));
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ValidationError::Invalid(format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        if let Some(confirm) = &self.confirm_password {
            if confirm != &self.password {
                return Err(ValidationError::Invalid(
                    "Passwords do not match".to_string(),
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.email.trim().is_empty() || self.password.is_empty() {
            return Err(ValidationError::Invalid(
                "Please provide email and password".to_string(),
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Blogs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BlogDraft {
    pub title: String,
    pub content: String,
    pub excerpt: String,
    pub cover_image: String,
    pub tags: Vec<String>,
    pub published: bool,
}

impl BlogDraft {
    pub fn validate(&self) -> Result<(), ValidationError> {
        title_with_slug(&self.title, "Blog title")?;
        required(&self.content, "Blog content")
    }
}

/// Partial blog update: `None` leaves the stored value alone.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BlogPatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub excerpt: Option<String>,
    pub cover_image: Option<String>,
    pub tags: Option<Vec<String>>,
    pub published: Option<bool>,
}

impl BlogPatch {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(title) = &self.title {
            title_with_slug(title, "Blog title")?;
        }
        if let Some(content) = &self.content {
            required(content, "Blog content")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Projects
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProjectDraft {
    pub title: String,
    pub description: String,
    pub tech_stack: Vec<String>,
    pub thumbnail: String,
    pub live_demo_url: String,
    pub github_url: String,
    pub featured: bool,
    pub order: i64,
}

impl ProjectDraft {
    pub fn validate(&self) -> Result<(), ValidationError> {
        required(&self.title, "Project title")?;
        required(&self.description, "Project description")
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProjectPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub tech_stack: Option<Vec<String>>,
    pub thumbnail: Option<String>,
    pub live_demo_url: Option<String>,
    pub github_url: Option<String>,
    pub featured: Option<bool>,
    pub order: Option<i64>,
}

impl ProjectPatch {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(title) = &self.title {
            required(title, "Project title")?;
        }
        if let Some(description) = &self.description {
            required(description, "Project description")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Profile
// ---------------------------------------------------------------------------

/// Profile update. Blank strings are ignored rather than clearing a field;
/// social links merge key by key.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProfilePatch {
    pub name: Option<String>,
    pub title: Option<String>,
    pub bio: Option<String>,
    pub social_links: Option<BTreeMap<String, String>>,
}

impl ProfilePatch {
    /// The non-blank, trimmed value of an optional text field.
    pub fn text(value: &Option<String>) -> Option<&str> {
        value.as_deref().map(str::trim).filter(|v| !v.is_empty())
    }
}
