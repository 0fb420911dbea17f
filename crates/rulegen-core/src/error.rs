//! Rule-model errors.

use thiserror::Error;

/// Fatal rule-model diagnostics. Usage and I/O failures are reported through
/// `anyhow` at the call sites that know the offending path.
#[derive(Error, Debug)]
pub enum Error {
    /// A `generate` call named outputs that span two preexisting rules.
    #[error("cannot merge: outputs {outputs:?} already belong to distinct rules")]
    CannotMerge {
        /// The offending output names.
        outputs: Vec<String>,
    },

    /// A file rule was declared over an existing directory rule.
    #[error("'{path}' is already a directory rule and cannot produce files")]
    FileOverDirectory {
        /// The colliding output path.
        path: String,
    },

    /// A directory rule was declared over an existing file rule.
    #[error("'{path}' is already a file rule and cannot become a directory")]
    DirectoryOverFile {
        /// The colliding mark path.
        path: String,
    },

    /// A rule declaration arrived with no outputs at all.
    #[error("a rule must name at least one output")]
    NoOutputs,

    /// A `rule_*` accessor named an output no rule produces.
    #[error("no rule produces '{name}'")]
    UnknownRule {
        /// The missing output name.
        name: String,
    },

    /// `load_directory` was given an absolute or upward-escaping path.
    #[error("subdirectory path '{path}' is absolute or escapes the source tree")]
    EscapingPath {
        /// The rejected path.
        path: String,
    },
}

/// Convenience alias for rule-model results.
pub type Result<T> = std::result::Result<T, Error>;
