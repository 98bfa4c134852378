use crate::migration::MigrationError;
use crate::store::StoreError;

use std::error::Error;
use std::fmt;
use tracing::subscriber::SetGlobalDefaultError;


#[derive(Debug)]
pub struct SwellowError {
    pub kind: SwellowErrorKind
}

impl fmt::Display for SwellowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SwellowError: {}", self.kind)
    }
}

impl Error for SwellowError {
	fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.kind)
	}
}

#[derive(Debug)]
pub enum SwellowErrorKind {
    InvalidVersionInterval(i64, i64),
    Json(serde_json::Error),
    Migration(MigrationError),
    SetGlobalDefault(SetGlobalDefaultError),
    Store(StoreError),
}

impl fmt::Display for SwellowErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidVersionInterval(from, to) => write!(f, "Invalid version interval: from ({from}) -> to ({to})"),
            Self::Json(error) => write!(f, "Failed to serialize output: {error}"),
            Self::Migration(error) => write!(f, "{}", error.kind),
            Self::SetGlobalDefault(error) => write!(f, "Failed to set global default subscriber: {error}"),
            Self::Store(error) => write!(f, "{}", error.kind),
        }
    }
}

impl Error for SwellowErrorKind {
	fn source(&self) -> Option<&(dyn Error + 'static)> {
		match self {
			Self::Json(source) => Some(source),
			Self::Migration(source) => Some(source),
			Self::SetGlobalDefault(source) => Some(source),
			Self::Store(source) => Some(source),
			_ => None,
		}
	}
}

impl From<MigrationError> for SwellowError {
    fn from(error: MigrationError) -> Self {
        SwellowError { kind: SwellowErrorKind::Migration(error) }
    }
}

impl From<StoreError> for SwellowError {
    fn from(error: StoreError) -> Self {
        SwellowError { kind: SwellowErrorKind::Store(error) }
    }
}

impl From<SetGlobalDefaultError> for SwellowError {
    fn from(error: SetGlobalDefaultError) -> Self {
        SwellowError { kind: SwellowErrorKind::SetGlobalDefault(error) }
    }
}

impl From<serde_json::Error> for SwellowError {
    fn from(error: serde_json::Error) -> Self {
        SwellowError { kind: SwellowErrorKind::Json(error) }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::migration::MigrationErrorKind;
    use crate::store::StoreErrorKind;
    use std::error::Error;

    #[test]
    fn swellow_error_display_formats_correctly() {
        let cases: Vec<(SwellowErrorKind, &str)> = vec![
            (SwellowErrorKind::InvalidVersionInterval(10, 5), "Invalid version interval"),
            (
                SwellowErrorKind::Migration(MigrationError::new(MigrationErrorKind::UnknownDriver("x".into()))),
                "No receiver registered for driver 'x'",
            ),
            (SwellowErrorKind::Store(StoreError::new(StoreErrorKind::LockConflict)), "Lock acquisition failed"),
        ];

        for (kind, expect) in cases {
            let text = kind.to_string();
            assert!(
                text.contains(expect),
                "Expected `{}` in `{}`",
                expect,
                text
            );
        }
    }

    #[test]
    fn swellow_error_source_chain_works() {
        let kind = SwellowErrorKind::Store(StoreError::new(StoreErrorKind::Unavailable("refused".into())));
        let src = kind.source().unwrap().to_string();
        assert!(src.contains("refused"));
    }

    #[test]
    fn swellow_error_from_conversions_work() {
        let s1: SwellowError = MigrationError::new(MigrationErrorKind::DuplicateReceiver("generic".into())).into();
        let s2: SwellowError = StoreError::new(StoreErrorKind::NotInitialized).into();

        assert!(matches!(s1.kind, SwellowErrorKind::Migration(_)));
        assert!(matches!(s2.kind, SwellowErrorKind::Store(_)));
    }
}
