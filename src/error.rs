use thiserror::Error;

/// Errors raised by the import, registry and analysis layers.
///
/// Degenerate tests and all-missing averages are not errors: they show up
/// as NaN in the output and are logged.
#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid control group {index:?} for {groups} groups")]
    InvalidControl { index: Option<usize>, groups: usize },

    #[error("no group other than the control is selected")]
    EmptySelection,

    #[error("unknown property: {0}")]
    UnknownProperty(String),

    #[error("a group named {0} already exists")]
    DuplicateGroup(String),

    #[error("no group at index {0}")]
    NoSuchGroup(usize),

    #[error("missing column: {0}")]
    MissingColumn(String),

    #[error("line {line}: could not parse {field} from {value:?}")]
    Field {
        line: u64,
        field: String,
        value: String,
    },

    #[error("inconsistent dataset: {0}")]
    Inconsistent(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
