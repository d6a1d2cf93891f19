//! The formatter collaborator (spec §6.4): `(source bytes) -> (formatted
//! bytes, error)`.

#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error("formatter unavailable: {0}")]
    Unavailable(String),
    #[error("formatter rejected the input: {0}")]
    Invalid(String),
}

pub trait Formatter: Send + Sync {
    async fn format(&self, source: &[u8]) -> Result<Vec<u8>, FormatError>;
}

/// Returns the input unchanged. The default when no external formatter is
/// configured for a view.
pub struct IdentityFormatter;

impl Formatter for IdentityFormatter {
    async fn format(&self, source: &[u8]) -> Result<Vec<u8>, FormatError> {
        Ok(source.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn identity_formatter_returns_input_unchanged() {
        let out = IdentityFormatter.format(b"hello").await.unwrap();
        assert_eq!(out, b"hello");
    }
}
