use std::io;

use thiserror::Error;

use super::types::Context;

/// Errors raised while assembling a [`Context`].
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("failed to read context source: {0}")]
    Io(#[from] io::Error),
    #[error("malformed context row: {0}")]
    Csv(#[from] csv::Error),
    #[error("context replay exhausted")]
    Exhausted,
    #[error("reading store holds no data")]
    EmptyStore,
}

/// Source of fresh decision contexts.
///
/// Implementations own whatever I/O they need. Each `gather` call must
/// return a new snapshot; callers never cache contexts across decisions.
pub trait ContextProvider {
    /// Assembles the current context.
    fn gather(&mut self) -> Result<Context, ProviderError>;

    /// Short name used in logs.
    fn name(&self) -> &'static str;
}

impl<P: ContextProvider + ?Sized> ContextProvider for Box<P> {
    fn gather(&mut self) -> Result<Context, ProviderError> {
        (**self).gather()
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}
