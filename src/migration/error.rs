use crate::migration::UnitKey;
use crate::store::StoreError;

use std::error::Error;
use std::fmt;


#[derive(Debug)]
#[non_exhaustive]
pub struct MigrationError {
    pub kind: MigrationErrorKind
}

impl MigrationError {
    pub fn new(kind: MigrationErrorKind) -> Self {
        MigrationError { kind }
    }

    /// Cursor value left behind by a run that halted part-way.
    /// `None` for errors raised before any unit could run.
    pub fn applied_version(&self) -> Option<i64> {
        match &self.kind {
            MigrationErrorKind::UnitExecution { applied_version, .. }
            | MigrationErrorKind::CursorWrite { applied_version, .. }
            | MigrationErrorKind::Cancelled { applied_version } => Some(*applied_version),
            _ => None,
        }
    }
}

impl fmt::Display for MigrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MigrationError: {}", self.kind)
    }
}

impl Error for MigrationError {
	fn source(&self) -> Option<&(dyn Error + 'static)> {
		Some(&self.kind)
	}
}

#[derive(Debug)]
pub enum MigrationErrorKind {
    Cancelled { applied_version: i64 },
    CursorWrite { unit: UnitKey, applied_version: i64, source: StoreError },
    DuplicateReceiver(String),
    DuplicateUnit(UnitKey),
    MissingDirection(UnitKey),
    NegativeTarget(i64),
    Store(StoreError),
    UnitExecution { unit: UnitKey, applied_version: i64, source: anyhow::Error },
    UnknownDriver(String),
}

impl fmt::Display for MigrationErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cancelled { applied_version } => write!(f, "Run cancelled; cursor left at version {applied_version}"),
            Self::CursorWrite { unit, applied_version, .. } => write!(
                f, "Unit '{unit}' succeeded but the cursor could not be saved; cursor left at version {applied_version}"
            ),
            Self::DuplicateReceiver(driver) => write!(f, "A receiver is already registered for driver '{driver}'"),
            Self::DuplicateUnit(key) => write!(f, "Duplicate migration unit: '{key}'"),
            Self::MissingDirection(key) => write!(
                f, "Missing '{}' direction for version {} '{}'", key.direction, key.version, key.description
            ),
            Self::NegativeTarget(version) => write!(f, "Target version {version} is negative; 0 means nothing applied"),
            Self::Store(error) => write!(f, "{}", error.kind),
            Self::UnitExecution { unit, applied_version, source } => write!(
                f, "Unit '{unit}' failed: {source}; cursor left at version {applied_version}"
            ),
            Self::UnknownDriver(driver) => write!(f, "No receiver registered for driver '{driver}'"),
        }
    }
}

impl Error for MigrationErrorKind {
	fn source(&self) -> Option<&(dyn Error + 'static)> {
		match self {
			Self::CursorWrite { source, .. } => Some(source),
			Self::Store(source) => Some(source),
			Self::UnitExecution { source, .. } => Some(&**source),
			_ => None,
		}
	}
}

impl From<StoreError> for MigrationError {
    fn from(error: StoreError) -> Self {
        MigrationError { kind: MigrationErrorKind::Store(error) }
    }
}
