// Client-side navigation
//
// Redirects are side effects requested by guards and by the request client.
// The Navigator decides what a redirect means for the surface (a browser
// history entry, a CLI exit code, a recorded value in tests).

use serde::Serialize;
use std::fmt;

/// Path of the denied-access page
pub const FORBIDDEN_PATH: &str = "/forbidden";

/// Path of the sign-in page
pub const LOGIN_PATH: &str = "/login";

/// Fixed redirect targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Destination {
    Forbidden,
    Login,
}

impl Destination {
    pub fn path(&self) -> &'static str {
        match self {
            Destination::Forbidden => FORBIDDEN_PATH,
            Destination::Login => LOGIN_PATH,
        }
    }
}

/// How a redirect affects history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryMode {
    /// Add an entry (back returns to the previous location)
    Push,
    /// Replace the current entry (back skips the denied attempt)
    Replace,
}

/// A requested navigation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Redirect {
    pub to: Destination,
    /// Location the user was trying to reach
    pub from: String,
    pub mode: HistoryMode,
}

impl Redirect {
    /// Denied access, replacing the attempted location
    pub fn forbidden(from: impl Into<String>) -> Self {
        Self {
            to: Destination::Forbidden,
            from: from.into(),
            mode: HistoryMode::Replace,
        }
    }

    /// Expired or missing session, replacing the attempted location
    pub fn login(from: impl Into<String>) -> Self {
        Self {
            to: Destination::Login,
            from: from.into(),
            mode: HistoryMode::Replace,
        }
    }
}

impl fmt::Display for Redirect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (from {})", self.to.path(), self.from)
    }
}

/// Performs redirects for a surface
pub trait Navigator: Send + Sync {
    fn navigate(&self, redirect: Redirect);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redirects_replace_history() {
        let redirect = Redirect::forbidden("/dashboard/users");
        assert_eq!(redirect.to.path(), "/forbidden");
        assert_eq!(redirect.from, "/dashboard/users");
        assert_eq!(redirect.mode, HistoryMode::Replace);

        let redirect = Redirect::login("/dashboard/my-classes");
        assert_eq!(redirect.to.path(), "/login");
        assert_eq!(redirect.mode, HistoryMode::Replace);
    }

    #[test]
    fn test_redirect_display() {
        assert_eq!(
            Redirect::forbidden("/dashboard/users").to_string(),
            "/forbidden (from /dashboard/users)"
        );
    }
}
