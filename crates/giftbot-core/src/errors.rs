/// Core error type for the bot.
///
/// Adapter crates map their specific errors into this type so the flow can
/// tell a degraded dependency (generation) from a transport problem.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("generation error: {0}")]
    Generation(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("external error: {0}")]
    External(String),
}

pub type Result<T> = std::result::Result<T, Error>;
