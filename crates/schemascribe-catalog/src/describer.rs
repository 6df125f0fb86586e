//! Text generation interface

/// Errors from a describer backend
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DescribeError {
    #[error("Describer request failed: {0}")]
    RequestFailed(String),

    #[error("Describer returned an empty response")]
    EmptyResponse,
}

/// Something that turns a prompt into prose
///
/// Implementations wrap a concrete model provider. `max_tokens` is an upper
/// bound on the reply length; how it is enforced is up to the backend.
pub trait Describer {
    fn describe(&self, prompt: &str, max_tokens: u32) -> Result<String, DescribeError>;
}

impl<T: Describer + ?Sized> Describer for Box<T> {
    fn describe(&self, prompt: &str, max_tokens: u32) -> Result<String, DescribeError> {
        (**self).describe(prompt, max_tokens)
    }
}
