//! Field-level validation of form settings

use super::record::FormSettings;
use regex_lite::Regex;
use std::sync::OnceLock;
use url::Url;

/// Schemes a redirect URL may use
const REDIRECT_SCHEMES: &[&str] = &["http", "https", "ftp"];

fn hex_color() -> &'static Regex {
    static HEX_COLOR: OnceLock<Regex> = OnceLock::new();
    HEX_COLOR.get_or_init(|| {
        Regex::new(r"^#([A-Fa-f0-9]{6}|[A-Fa-f0-9]{3})$").expect("hex color pattern is valid")
    })
}

/// A settings field that can fail validation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingsField {
    Name,
    Description,
    Color,
    RedirectOnCompletion,
}

impl std::fmt::Display for SettingsField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Name => write!(f, "name"),
            Self::Description => write!(f, "description"),
            Self::Color => write!(f, "color"),
            Self::RedirectOnCompletion => write!(f, "redirectOnCompletion"),
        }
    }
}

/// A single failed field with the message to show next to it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: SettingsField,
    pub message: &'static str,
}

impl FieldError {
    pub fn new(field: SettingsField, message: &'static str) -> Self {
        Self { field, message }
    }
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn is_valid_redirect(candidate: &str) -> bool {
    match Url::parse(candidate) {
        Ok(url) => {
            REDIRECT_SCHEMES.contains(&url.scheme())
                && url.host_str().is_some_and(|host| !host.is_empty())
        }
        Err(_) => false,
    }
}

/// Validate settings, collecting every failing field.
///
/// An empty result means the settings may be written.
pub fn validate_settings(settings: &FormSettings) -> Vec<FieldError> {
    let mut errors = Vec::new();

    if settings.name.trim().is_empty() {
        errors.push(FieldError::new(SettingsField::Name, "Name is required"));
    }
    if settings.description.trim().is_empty() {
        errors.push(FieldError::new(
            SettingsField::Description,
            "Description is required",
        ));
    }
    if settings.color.is_empty() {
        errors.push(FieldError::new(SettingsField::Color, "Color is required"));
    } else if !hex_color().is_match(&settings.color) {
        errors.push(FieldError::new(
            SettingsField::Color,
            "Color must be a valid hex color code starting with \"#\"",
        ));
    }
    if let Some(redirect) = settings.redirect_on_completion.as_deref() {
        if !redirect.trim().is_empty() && !is_valid_redirect(redirect) {
            errors.push(FieldError::new(
                SettingsField::RedirectOnCompletion,
                "Redirect URL must be a valid URL",
            ));
        }
    }

    errors
}
