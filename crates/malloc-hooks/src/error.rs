use std::fmt;

/// Errors returned by the strict lifecycle and configuration entry points.
///
/// The allocation paths themselves never fail on behalf of the allocator; this
/// type only covers calls made by the embedder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookError {
    /// [`try_init_once`](crate::try_init_once) was called while the hooks were
    /// already installed.
    AlreadyInstalled,
    /// A report format name that is not one of `table`, `json`, `json-pretty`.
    UnknownFormat(String),
}

impl fmt::Display for HookError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookError::AlreadyInstalled => write!(f, "malloc hooks are already installed"),
            HookError::UnknownFormat(name) => write!(
                f,
                "unknown format {name:?}, expected one of: \"table\", \"json\", \"json-pretty\""
            ),
        }
    }
}

impl std::error::Error for HookError {}
