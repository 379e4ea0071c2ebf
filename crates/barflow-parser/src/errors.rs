use thiserror::Error;

/// A single cell that a field cleaner could not turn into a usable value.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CleanError {
    #[error("stock value {0:?} has no leading digits and is not an integer")]
    Stock(Option<String>),

    #[error("monetary value {0:?} is not a number")]
    Value(Option<String>),

    #[error("required value is missing")]
    Missing,
}

#[derive(Debug, Error)]
pub enum ParserError {
    #[error("{format} CSV error: {source}")]
    Csv {
        format: &'static str,
        #[source]
        source: csv::Error,
    },

    #[error("{format} could not be decompressed: {source}")]
    Decompress {
        format: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("{format} file has no header row")]
    MissingHeader { format: &'static str },

    #[error("{format} is missing canonical column {column}")]
    MissingColumn {
        format: &'static str,
        column: &'static str,
    },

    #[error("{format} maps more than one source column onto {column}")]
    DuplicateColumn { format: &'static str, column: String },

    #[error("{format} data row {row_index} column {column}: {source}")]
    DataQuality {
        format: &'static str,
        row_index: usize,
        column: &'static str,
        #[source]
        source: CleanError,
    },

    #[error("{format} frame could not be built: {message}")]
    Frame {
        format: &'static str,
        message: String,
    },
}
