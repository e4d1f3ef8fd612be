pub type ArtwallResult<T> = Result<T, ArtwallError>;

#[derive(thiserror::Error, Debug)]
pub enum ArtwallError {
    /// Bad configuration: unknown processor or blend layer, unresolved
    /// template variable, unsupported config format.
    #[error("config error: {0}")]
    Config(String),

    /// Bad processor argument: failed coercion, invalid color, invalid
    /// factor/offset. Always names the offending argument.
    #[error("argument error: {0}")]
    Argument(String),

    /// Missing or unusable resource: oversized layer, failed art fetch,
    /// undecodable image, screen probe failure.
    #[error("resource error: {0}")]
    Resource(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ArtwallError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn argument(msg: impl Into<String>) -> Self {
        Self::Argument(msg.into())
    }

    pub fn resource(msg: impl Into<String>) -> Self {
        Self::Resource(msg.into())
    }
}
