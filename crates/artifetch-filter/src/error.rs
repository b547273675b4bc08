#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("pattern '{pattern}' is empty once negation is removed")]
    EmptyPattern { pattern: String },

    #[error("pattern '{pattern}' expands to more than {limit} alternatives")]
    TooManyExpansions { pattern: String, limit: usize },

    #[error("pattern '{pattern}' is not a valid glob: {source}")]
    InvalidGlob {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
