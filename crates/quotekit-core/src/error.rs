use std::path::PathBuf;
use thiserror::Error;

/// The input could not be turned into solid geometry. No partial component
/// list is ever returned alongside this error.
#[derive(Debug, Error)]
pub enum GeometryParseError {
    #[error("failed to read STEP input")]
    Io(#[from] std::io::Error),
    #[error("input is not a readable STEP exchange file: {0}")]
    Syntax(String),
    #[error("STEP file has no DATA section")]
    NoDataSection,
    #[error("failed to convert shell #{shell} into topology: {message}")]
    Topology { shell: u64, message: String },
    #[error("no usable solid bodies found in STEP file")]
    NoSolids,
}

/// The parallel arrays of a project specification do not line up.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "project arrays are misaligned: components={components}, materials={materials}, quantities={quantities}, volumes={volumes}"
)]
pub struct MalformedProjectError {
    pub components: usize,
    pub materials: usize,
    pub quantities: usize,
    pub volumes: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot read {value:?} as {expected}")]
pub struct CoercionError {
    pub value: String,
    pub expected: &'static str,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unknown company id {0}")]
    UnknownCompany(i64),
    #[error("unknown material id {0}")]
    UnknownMaterial(i64),
    #[error("unknown finish id {0}")]
    UnknownFinish(i64),
    #[error("company {company} has more than one active price for {kind} {id}")]
    DuplicateActivePrice {
        company: i64,
        kind: &'static str,
        id: i64,
    },
    #[error("read catalog: {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parse catalog")]
    Json(#[from] serde_json::Error),
}
