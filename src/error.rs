use crate::boxes::FourCC;

/// Everything that can go wrong while rotating a single file.
///
/// None of these abort a batch; the runner records them per file.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("incomplete container: {needed} header bytes needed at offset {offset}, {available} available")]
    IncompleteContainer {
        offset: u64,
        needed: u64,
        available: u64,
    },
    #[error("corrupt container: box '{typ}' at offset {offset}: {reason}")]
    CorruptContainer {
        typ: FourCC,
        offset: u64,
        reason: &'static str,
    },
    #[error("missing ftyp box at start of file")]
    MissingFtyp,
    #[error("no track header found under moov")]
    NoTrackHeaderFound,
    #[error("unsupported rotation angle: {0} degrees")]
    UnsupportedAngle(i32),
    #[error("external engine failure: {0}")]
    ExternalEngineFailure(String),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Short stable name for reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::IncompleteContainer { .. } => "IncompleteContainer",
            Error::CorruptContainer { .. } => "CorruptContainer",
            Error::MissingFtyp => "MissingFtyp",
            Error::NoTrackHeaderFound => "NoTrackHeaderFound",
            Error::UnsupportedAngle(_) => "UnsupportedAngle",
            Error::ExternalEngineFailure(_) => "ExternalEngineFailure",
            Error::Io(_) => "IOFailure",
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
