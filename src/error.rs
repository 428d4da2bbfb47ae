use std::fmt;

/// Which team attribute collided with an existing team.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictField {
    Number,
    Name,
}

impl ConflictField {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictField::Number => "number",
            ConflictField::Name => "name",
        }
    }
}

/// Bad input that the caller can fix and resubmit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    EmptyParticipantName,
    UnknownTeam(u64),
    MissingField(String),
    ScoreOutOfRange {
        field: String,
        value: i64,
        min: i64,
        max: i64,
    },
    UnknownField(String),
    /// A team needs a number or a name.
    MissingIdentity,
    InvalidNumber,
    UnknownLocation(String),
}

impl ValidationError {
    /// Stable machine-readable code, used in bulk import reports.
    pub fn code(&self) -> &'static str {
        match self {
            ValidationError::EmptyParticipantName => "EmptyParticipantName",
            ValidationError::UnknownTeam(_) => "UnknownTeam",
            ValidationError::MissingField(_) => "MissingField",
            ValidationError::ScoreOutOfRange { .. } => "ScoreOutOfRange",
            ValidationError::UnknownField(_) => "UnknownField",
            ValidationError::MissingIdentity => "MissingIdentity",
            ValidationError::InvalidNumber => "InvalidNumber",
            ValidationError::UnknownLocation(_) => "UnknownLocation",
        }
    }

    /// The score field the error is about, if any.
    pub fn field(&self) -> Option<&str> {
        match self {
            ValidationError::MissingField(f)
            | ValidationError::UnknownField(f)
            | ValidationError::ScoreOutOfRange { field: f, .. } => Some(f.as_str()),
            _ => None,
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::EmptyParticipantName => write!(f, "Judge name cannot be empty"),
            ValidationError::UnknownTeam(id) => write!(f, "Unknown or inactive team #{}", id),
            ValidationError::MissingField(field) => write!(f, "Missing score for '{}'", field),
            ValidationError::ScoreOutOfRange {
                field,
                value,
                min,
                max,
            } => write!(
                f,
                "Score for '{}' is {}, must be between {} and {}",
                field, value, min, max
            ),
            ValidationError::UnknownField(field) => {
                write!(f, "'{}' is not a field of the score model", field)
            }
            ValidationError::MissingIdentity => write!(f, "Team needs a number or a name"),
            ValidationError::InvalidNumber => write!(f, "Team number must be a positive integer"),
            ValidationError::UnknownLocation(loc) => write!(f, "Unknown location '{}'", loc),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Errors surfaced by registry, submission and query operations.
#[derive(Debug)]
pub enum Error {
    Validation(ValidationError),
    NotFound { entity: &'static str, id: u64 },
    Conflict { field: ConflictField, value: String },
    /// Delete refused while other records still reference the target.
    Dependency { blocking_count: usize },
    Store(anyhow::Error),
}

impl Error {
    /// Stable machine-readable code, used in bulk import reports.
    pub fn code(&self) -> &'static str {
        match self {
            Error::Validation(e) => e.code(),
            Error::NotFound { .. } => "NotFound",
            Error::Conflict {
                field: ConflictField::Number,
                ..
            } => "DuplicateNumber",
            Error::Conflict {
                field: ConflictField::Name,
                ..
            } => "DuplicateName",
            Error::Dependency { .. } => "TeamHasEvaluations",
            Error::Store(_) => "StoreError",
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Validation(e) => write!(f, "Invalid input: {}", e),
            Error::NotFound { entity, id } => write!(f, "No {} with id {}", entity, id),
            Error::Conflict { field, value } => {
                write!(f, "A team with {} '{}' already exists", field.as_str(), value)
            }
            Error::Dependency { blocking_count } => write!(
                f,
                "Team still has {} evaluation(s); delete them first",
                blocking_count
            ),
            Error::Store(e) => write!(f, "Store failure: {:#}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Validation(e) => Some(e),
            Error::Store(e) => Some(&**e),
            _ => None,
        }
    }
}

impl From<ValidationError> for Error {
    fn from(e: ValidationError) -> Self {
        Error::Validation(e)
    }
}

impl From<anyhow::Error> for Error {
    fn from(e: anyhow::Error) -> Self {
        Error::Store(e)
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
