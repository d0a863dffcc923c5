use std::path::PathBuf;
use thiserror::Error;

/// Error type for the auto-binding rewrite pass.
#[derive(Error, Debug)]
pub enum PreprocessError {
    #[error("could not read or write `{}`", .0.display())]
    IOError(PathBuf, std::io::Error),
}
