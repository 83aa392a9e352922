/// Errors raised while bootstrapping or driving a sketch.
///
/// Construction errors are unrecoverable: callers are expected to fail fast
/// at startup with the message instead of retrying.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SketchError {
    /// Missing host container, invalid grid size, malformed configuration.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// The rendering surface or the GPU objects behind it could not be created.
    #[error("resource error: {0}")]
    Resource(String),
    /// A shader source is missing or failed to compile.
    #[error("asset error: {0}")]
    Asset(String),
    /// The GPU surface was lost while the render loop was running.
    #[error("rendering surface lost")]
    SurfaceLost,
}

impl SketchError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn resource(msg: impl Into<String>) -> Self {
        Self::Resource(msg.into())
    }

    pub fn asset(msg: impl Into<String>) -> Self {
        Self::Asset(msg.into())
    }
}

pub type SketchResult<T> = Result<T, SketchError>;
