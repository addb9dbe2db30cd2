use std::fmt;

/// Why an operation was refused. Refusals never mutate either store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyViolation {
    /// Upload name starts with a prefix the engine uses internally.
    ReservedPrefix(&'static str),
    InvalidName(String),
    /// A file or record already sits at the path.
    PathOccupied(String),
    /// Replacement target is waiting on another change.
    PendingChange(String),
    /// Delete target is not Stable.
    NotStable(String),
    /// Apply and reject are reserved to privileged identities.
    NotPrivileged,
    /// The target record was removed by an earlier call.
    RecordGone,
}

impl fmt::Display for PolicyViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyViolation::ReservedPrefix(prefix) => {
                write!(f, "File names cannot start with \"{}\"", prefix)
            }
            PolicyViolation::InvalidName(name) => write!(f, "\"{}\" is not a valid file name", name),
            PolicyViolation::PathOccupied(name) => {
                write!(f, "A file named \"{}\" already exists", name)
            }
            PolicyViolation::PendingChange(name) => write!(
                f,
                "\"{}\" has a pending change and cannot be replaced until it is applied or rejected",
                name
            ),
            PolicyViolation::NotStable(name) => write!(
                f,
                "\"{}\" has a pending change and cannot be deleted until it is applied or rejected",
                name
            ),
            PolicyViolation::NotPrivileged => {
                write!(f, "Only administrators can apply or reject changes")
            }
            PolicyViolation::RecordGone => write!(f, "The file no longer exists"),
        }
    }
}

impl PolicyViolation {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            PolicyViolation::ReservedPrefix(_) => "RESERVED_PREFIX",
            PolicyViolation::InvalidName(_) => "INVALID_NAME",
            PolicyViolation::PathOccupied(_) => "PATH_OCCUPIED",
            PolicyViolation::PendingChange(_) => "PENDING_CHANGE",
            PolicyViolation::NotStable(_) => "NOT_STABLE",
            PolicyViolation::NotPrivileged => "NOT_PRIVILEGED",
            PolicyViolation::RecordGone => "RECORD_GONE",
        }
    }
}

/// Result of an operation that did not fault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Done,
    Refused(PolicyViolation),
}

impl Outcome {
    pub fn is_done(&self) -> bool {
        matches!(self, Outcome::Done)
    }

    pub fn refusal(&self) -> Option<&PolicyViolation> {
        match self {
            Outcome::Refused(violation) => Some(violation),
            Outcome::Done => None,
        }
    }
}

impl From<PolicyViolation> for Outcome {
    fn from(violation: PolicyViolation) -> Self {
        Outcome::Refused(violation)
    }
}
