use thiserror::Error;

#[derive(Error, Debug)]
pub enum Nem12Error {
    #[error("Input file not found: {0}")]
    InputNotFound(String),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decode {path}: {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },
}
