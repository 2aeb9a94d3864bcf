#[derive(Debug, thiserror::Error)]
pub enum MDError {
    #[error("[kind: io, info:{0}]")]
    Io(#[from] std::io::Error),
    #[error("[kind: invalid argument, info:{0}]")]
    InvalidArg(String),
    #[error("[kind: execution, info:{0}]")]
    Exec(String),
    #[error("[kind: parse, info:{0}]")]
    Parse(String),
    #[error("[kind: other, info: {0}]")]
    Other(String),
}

impl MDError {
    pub(crate) fn invalid_arg(e: impl ToString) -> Self {
        Self::InvalidArg(e.to_string())
    }

    pub(crate) fn exec(e: impl ToString) -> Self {
        Self::Exec(e.to_string())
    }

    pub(crate) fn other(e: impl ToString) -> Self {
        Self::Other(e.to_string())
    }

    /// Parse error for a mandatory report field that could not be located.
    pub(crate) fn missing_field(field: &str) -> Self {
        Self::Parse(format!("error: {{mandatory field `{field}` not found}}"))
    }

    pub fn is_parse_err(&self) -> bool {
        matches!(self, MDError::Parse(_))
    }

    pub fn is_invalid_arg(&self) -> bool {
        matches!(self, MDError::InvalidArg(_))
    }
}

pub type MDResult<T> = std::result::Result<T, MDError>;
