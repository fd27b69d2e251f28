use thiserror::Error;

/// Failure of a command body. The display text is what the actor sees in the
/// private error reply, so variants keep their messages user-safe.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("{0}")]
    Failed(String),
    #[error("missing required parameter `{0}`")]
    MissingParameter(String),
    #[error("invalid value `{value}` for parameter `{name}`")]
    InvalidParameter { name: String, value: String },
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ExecutionError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }

    pub fn invalid_parameter(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidParameter { name: name.into(), value: value.into() }
    }

    pub fn error_class(&self) -> &'static str {
        match self {
            Self::Failed(_) => "failed",
            Self::MissingParameter(_) | Self::InvalidParameter { .. } => "bad_input",
            Self::Other(_) => "internal",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ExecutionError;

    #[test]
    fn parameter_errors_render_user_facing_text() {
        let missing = ExecutionError::MissingParameter("env".to_owned());
        assert_eq!(missing.to_string(), "missing required parameter `env`");
        assert_eq!(missing.error_class(), "bad_input");

        let invalid = ExecutionError::invalid_parameter("version", "latest!");
        assert_eq!(invalid.to_string(), "invalid value `latest!` for parameter `version`");
    }

    #[test]
    fn anyhow_errors_convert_transparently() {
        let error = ExecutionError::from(anyhow::anyhow!("kubectl exited with status 1"));
        assert_eq!(error.to_string(), "kubectl exited with status 1");
        assert_eq!(error.error_class(), "internal");
    }
}
