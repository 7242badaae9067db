//! Operator-entered credentials and import options.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// How many files an import should fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImportLimit {
    /// Import the whole library.
    #[default]
    All,
    /// Stop after this many files.
    Files(u32),
}

impl ImportLimit {
    /// Preset sizes offered for trial imports.
    pub const PRESETS: [Self; 4] = [Self::Files(50), Self::Files(500), Self::Files(5000), Self::All];

    /// Returns the limit as sent on the wire; `None` means a full import.
    #[must_use]
    pub const fn as_option(&self) -> Option<u32> {
        match self {
            Self::All => None,
            Self::Files(n) => Some(*n),
        }
    }
}

impl fmt::Display for ImportLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => write!(f, "full import"),
            Self::Files(n) => write!(f, "{n} files"),
        }
    }
}

/// Error returned when an import limit cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid import limit '{input}': expected a positive number or 'all'")]
pub struct LimitParseError {
    input: String,
}

impl FromStr for ImportLimit {
    type Err = LimitParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("all") || trimmed.eq_ignore_ascii_case("full") {
            return Ok(Self::All);
        }
        match trimmed.parse::<u32>() {
            Ok(n) if n > 0 => Ok(Self::Files(n)),
            _ => Err(LimitParseError {
                input: s.to_string(),
            }),
        }
    }
}

/// Converts backslash path separators to forward slashes.
///
/// No other path handling is applied: drive letters, colons and duplicate
/// separators pass through untouched.
#[must_use]
pub fn normalize_destination(destination: &str) -> String {
    destination.replace('\\', "/")
}

/// Credentials and options for the cloud account being imported.
///
/// Held only in memory for as long as a job is being set up and cleared on
/// sign-out. The password is redacted from `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct PendingCredentials {
    /// Cloud account email.
    pub email: String,
    /// Cloud account password.
    pub password: String,
    /// Destination folder as typed by the operator.
    pub destination_folder: String,
    /// Optional cap on the number of imported files.
    pub limit: ImportLimit,
}

impl PendingCredentials {
    /// Creates a new set of credentials.
    #[must_use]
    pub fn new(
        email: impl Into<String>,
        password: impl Into<String>,
        destination_folder: impl Into<String>,
        limit: ImportLimit,
    ) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            destination_folder: destination_folder.into(),
            limit,
        }
    }

    /// Returns the destination folder with forward-slash separators.
    #[must_use]
    pub fn normalized_destination(&self) -> String {
        normalize_destination(&self.destination_folder)
    }
}

impl fmt::Debug for PendingCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingCredentials")
            .field("email", &self.email)
            .field("password", &"********")
            .field("destination_folder", &self.destination_folder)
            .field("limit", &self.limit)
            .finish()
    }
}

/// Verification code requested by the backend before a job can proceed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TwoFactorChallenge {
    code: String,
}

impl TwoFactorChallenge {
    /// Returns the code typed so far.
    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Replaces the typed code.
    pub fn set_code(&mut self, code: impl Into<String>) {
        self.code = code.into();
    }

    /// Clears the typed code.
    pub fn clear(&mut self) {
        self.code.clear();
    }
}
