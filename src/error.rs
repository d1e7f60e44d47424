pub type PinreelResult<T> = Result<T, PinreelError>;

#[derive(thiserror::Error, Debug)]
pub enum PinreelError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("sequence error: {0}")]
    Sequence(String),

    #[error("scroll error: {0}")]
    Scroll(String),

    #[error("render error: {0}")]
    Render(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PinreelError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn sequence(msg: impl Into<String>) -> Self {
        Self::Sequence(msg.into())
    }

    pub fn scroll(msg: impl Into<String>) -> Self {
        Self::Scroll(msg.into())
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_are_stable() {
        assert!(
            PinreelError::validation("x")
                .to_string()
                .contains("validation error:")
        );
        assert!(
            PinreelError::sequence("x")
                .to_string()
                .contains("sequence error:")
        );
        assert!(
            PinreelError::scroll("x")
                .to_string()
                .contains("scroll error:")
        );
        assert!(
            PinreelError::render("x")
                .to_string()
                .contains("render error:")
        );
    }

    #[test]
    fn other_preserves_source() {
        let base = std::io::Error::other("boom");
        let err = PinreelError::Other(anyhow::Error::new(base));
        assert!(err.to_string().contains("boom"));
    }
}
