//! Error types returned by the writer.

use std::io;

use thiserror::Error;

/// A placeholder that could not be resolved against the supplied arguments.
///
/// Nothing is appended to the stream when a call fails with this error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    /// A placeholder has no argument left to consume.
    #[error("placeholder #{index} has no matching argument")]
    MissingArgument {
        /// Zero-based position of the placeholder.
        index: usize,
    },

    /// More arguments were supplied than the format string consumes.
    #[error("format string consumes {expected} argument(s) but {supplied} were supplied")]
    ExtraArguments {
        /// Number of placeholders.
        expected: usize,
        /// Number of arguments given.
        supplied: usize,
    },

    /// The verb cannot render a value of this type.
    #[error("verb %{verb} cannot render a value of type {type_name}")]
    UnsupportedVerb {
        /// The verb character.
        verb: char,
        /// Type name of the offending argument.
        type_name: &'static str,
    },

    /// The argument's own `Display` or `Debug` impl returned an error.
    #[error("value of type {type_name} failed to format")]
    ValueFormat {
        /// Type name of the offending argument.
        type_name: &'static str,
    },

    /// The text between `%` and the verb is not a flag/width/precision run.
    #[error("invalid placeholder modifier in {placeholder:?}")]
    InvalidModifier {
        /// The whole placeholder, `%` through verb.
        placeholder: String,
    },
}

/// Errors surfaced by [`Writer`](crate::Writer) operations.
#[derive(Error, Debug)]
pub enum Error {
    /// The message could not be formatted.
    #[error("format error: {0}")]
    Format(#[from] FormatError),

    /// The sink failed while being written or flushed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The writer was closed.
    #[error("writer is closed")]
    Closed,
}

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = core::result::Result<T, E>;
