//! Configuration issues and notification severity

/// Severity of a configuration issue or a user-facing notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Fatal: the configuration or run cannot proceed.
    Error,
    /// Non-fatal: works, but may not behave as expected.
    Warning,
    Info,
}

/// Identifies a specific configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigIssueCode {
    UnknownProvider,
    UnknownStrategy,
    EmptyCouncil,
    UnknownDefaultCouncil,
    DepthOutOfRange,
    TooManyBranches,
    MissingCredential,
}

/// A detected issue in the loaded configuration.
#[derive(Debug, Clone)]
pub struct ConfigIssue {
    pub severity: Severity,
    pub code: ConfigIssueCode,
    pub message: String,
}

impl ConfigIssue {
    pub fn error(code: ConfigIssueCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            code,
            message: message.into(),
        }
    }

    pub fn warning(code: ConfigIssueCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            code,
            message: message.into(),
        }
    }
}

/// Whether any issue is fatal
pub fn has_errors(issues: &[ConfigIssue]) -> bool {
    issues.iter().any(|i| i.severity == Severity::Error)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_errors() {
        let warnings = vec![ConfigIssue::warning(ConfigIssueCode::DepthOutOfRange, "clamped")];
        assert!(!has_errors(&warnings));

        let mut mixed = warnings;
        mixed.push(ConfigIssue::error(ConfigIssueCode::EmptyCouncil, "no members"));
        assert!(has_errors(&mixed));
    }
}
