use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoverallsError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("{0} is not a valid boolean value")]
    InvalidBool(String),

    #[error("{0} is not a string or boolean")]
    InvalidBoolType(String),

    #[error("Coveralls rejected submission with service_name {service_name}: {message}")]
    Submission {
        service_name: String,
        message: String,
    },

    #[error("Failed to submit coverage")]
    SubmissionFailed,

    #[error("Coveralls webhook did not confirm build completion: {0}")]
    WebhookNotDone(String),

    #[error("Unexpected Coveralls response: {0}")]
    UnexpectedResponse(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CoverallsError>;
