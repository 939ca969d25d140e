// Form validation done before anything is sent

use regex::Regex;
use std::sync::OnceLock;
use url::Url;

use crate::error::ValidationError;
use crate::models::{ClassDraft, Feedback};

const MIN_PASSWORD_LEN: usize = 6;

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email pattern"))
}

pub fn email(value: &str) -> Result<(), ValidationError> {
    if email_pattern().is_match(value.trim()) {
        Ok(())
    } else {
        Err(ValidationError::new("email", "Enter a valid email address"))
    }
}

/// At least 6 characters with an uppercase and a lowercase letter
pub fn password(value: &str) -> Result<(), ValidationError> {
    if value.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::new(
            "password",
            "Password must be at least 6 characters",
        ));
    }
    if !value.chars().any(|c| c.is_uppercase()) {
        return Err(ValidationError::new(
            "password",
            "Password must contain an uppercase letter",
        ));
    }
    if !value.chars().any(|c| c.is_lowercase()) {
        return Err(ValidationError::new(
            "password",
            "Password must contain a lowercase letter",
        ));
    }
    Ok(())
}

pub fn class_draft(draft: &ClassDraft) -> Result<(), ValidationError> {
    if draft.title.trim().is_empty() {
        return Err(ValidationError::new("title", "Title is required"));
    }
    if !draft.price.is_finite() || draft.price < 0.0 {
        return Err(ValidationError::new("price", "Price must be zero or more"));
    }
    if let Some(image) = &draft.image {
        http_url("image", image)?;
    }
    Ok(())
}

pub fn feedback(feedback: &Feedback) -> Result<(), ValidationError> {
    if !(1..=5).contains(&feedback.rating) {
        return Err(ValidationError::new("rating", "Rating must be between 1 and 5"));
    }
    if feedback.description.trim().is_empty() {
        return Err(ValidationError::new("description", "Description is required"));
    }
    Ok(())
}

/// Submissions are links to hosted work
pub fn submission_url(value: &str) -> Result<(), ValidationError> {
    http_url("url", value)
}

fn http_url(field: &'static str, value: &str) -> Result<(), ValidationError> {
    match Url::parse(value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(()),
        _ => Err(ValidationError::new(field, "Enter an http(s) link")),
    }
}
