//! Core error types for sigcmp.

/// Core result type
pub type CoreResult<T> = Result<T, CoreError>;

/// Core error type
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    /// Element type code not part of the closed set
    #[error("Unknown element type code: {code:#06x}")]
    UnknownElementKind {
        /// Raw code as stored in the container
        code: u32,
    },

    /// Element kind name not recognised
    #[error("Unknown element kind: {name}")]
    UnknownElementName {
        /// Name that failed to parse
        name: String,
    },

    /// Container version outside the supported revisions
    #[error("Unsupported format version: {version}")]
    UnsupportedVersion {
        /// Version as read from the file
        version: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CoreError::UnknownElementKind { code: 0x8008 };
        assert_eq!(format!("{}", err), "Unknown element type code: 0x8008");

        let err = CoreError::UnsupportedVersion {
            version: "4.0.0".to_string(),
        };
        assert_eq!(format!("{}", err), "Unsupported format version: 4.0.0");
    }

    #[test]
    fn test_error_equality() {
        let err1 = CoreError::UnknownElementName {
            name: "u128".to_string(),
        };
        let err2 = CoreError::UnknownElementName {
            name: "u128".to_string(),
        };
        assert_eq!(err1, err2);
        assert_ne!(err1, CoreError::UnknownElementKind { code: 1 });
    }
}
