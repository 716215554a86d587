use std::io;

use thiserror::Error;

use crate::library::{FormStatus, LoadError};

#[derive(Debug, Error)]
pub enum Error {
    #[error("Load pdf docs unsuccessful: {0}.")]
    Load(#[from] LoadError),

    #[error("Unknown error in checking if doc was available.")]
    DocumentUnavailable,

    #[error("Error {} was returned in checking if form was available.", .0.code())]
    FormUnavailable(FormStatus),

    #[error("Unknown error in checking if page {0} is available.")]
    PageUnavailable(usize),

    #[error("Gave up on {what} availability after {attempts} checks.")]
    PollLimit { what: String, attempts: u64 },

    #[error("Invalid --{flag} argument {value}")]
    InvalidNumber { flag: &'static str, value: String },

    #[error("Failed to open: {path}")]
    Read { path: String, source: io::Error },
}

pub type Result<T> = std::result::Result<T, Error>;
