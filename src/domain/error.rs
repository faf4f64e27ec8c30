use thiserror::Error;

/// Core domain errors
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Not found: {message}")]
    NotFound { message: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Invalid ID format: {message}")]
    InvalidId { message: String },

    #[error("Encoding error: {message}")]
    Encoding { message: String },

    #[error("Store unavailable: {message}")]
    StoreUnavailable { message: String },

    #[error("Store error: {message}")]
    Store { message: String },

    #[error("Invalid state: {message}")]
    InvalidState { message: String },

    #[error("Conflict: {message}")]
    Conflict { message: String },

    #[error("Provider error: {provider} - {message}")]
    Provider { provider: String, message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DomainError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn invalid_id(message: impl Into<String>) -> Self {
        Self::InvalidId {
            message: message.into(),
        }
    }

    pub fn encoding(message: impl Into<String>) -> Self {
        Self::Encoding {
            message: message.into(),
        }
    }

    pub fn store_unavailable(message: impl Into<String>) -> Self {
        Self::StoreUnavailable {
            message: message.into(),
        }
    }

    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
        }
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// True for errors that mean the backing store could not be reached at all
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::StoreUnavailable { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_error() {
        let error = DomainError::not_found("Work item 'wi-1' not found");
        assert_eq!(error.to_string(), "Not found: Work item 'wi-1' not found");
    }

    #[test]
    fn test_invalid_state_error() {
        let error = DomainError::invalid_state("Work item is not blocked");
        assert_eq!(error.to_string(), "Invalid state: Work item is not blocked");
    }

    #[test]
    fn test_conflict_error() {
        let error = DomainError::conflict("Version mismatch");
        assert_eq!(error.to_string(), "Conflict: Version mismatch");
    }

    #[test]
    fn test_encoding_error() {
        let error = DomainError::encoding("text is empty");
        assert_eq!(error.to_string(), "Encoding error: text is empty");
    }

    #[test]
    fn test_is_unavailable() {
        assert!(DomainError::store_unavailable("connection refused").is_unavailable());
        assert!(!DomainError::store("bad payload").is_unavailable());
    }
}
