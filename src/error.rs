use thiserror::Error;

/// Errors the core surfaces to callers.
///
/// Per the error handling design, almost nothing in this crate is
/// surfaced: clock read failures, ring-buffer overflow, unresolvable
/// frames and empty-after-symbolization samples are all silently
/// absorbed (see `sampler_thread`, `symbolizer`). `Start` with a bad
/// frequency is the one caller mistake that is reported back.
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum ProfilerError {
    #[error("sampling frequency must be a positive, finite number of Hz, got {0}")]
    InvalidFrequency(f64),
}

pub type Result<T> = std::result::Result<T, ProfilerError>;
