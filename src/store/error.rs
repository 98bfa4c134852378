use std::error::Error;
use std::fmt;


#[derive(Debug)]
#[non_exhaustive]
pub struct StoreError {
    pub kind: StoreErrorKind
}

impl StoreError {
    pub fn new(kind: StoreErrorKind) -> Self {
        StoreError { kind }
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StoreError: {}", self.kind)
    }
}

impl Error for StoreError {
	fn source(&self) -> Option<&(dyn Error + 'static)> {
		Some(&self.kind)
	}
}

#[derive(Debug)]
pub enum StoreErrorKind {
    LockConflict,
    NotInitialized,
    SQLX(sqlx::Error),
    Unavailable(String),
}

impl fmt::Display for StoreErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LockConflict => write!(f, "Lock acquisition failed - another run holds the version lock"),
            Self::NotInitialized => write!(f, "Version store is not initialized"),
            Self::SQLX(e) => write!(f, "Version store unavailable: {e}"),
            Self::Unavailable(reason) => write!(f, "Version store unavailable: {reason}"),
        }
    }
}

impl Error for StoreErrorKind {
	fn source(&self) -> Option<&(dyn Error + 'static)> {
		match self {
			Self::SQLX(source) => Some(source),
			_ => None,
		}
	}
}

impl From<sqlx::Error> for StoreError {
    fn from(error: sqlx::Error) -> Self {
        StoreError { kind: StoreErrorKind::SQLX(error) }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_error_display_formats_correctly() {
        let cases: Vec<(StoreErrorKind, &str)> = vec![
            (StoreErrorKind::LockConflict, "Lock acquisition failed"),
            (StoreErrorKind::NotInitialized, "not initialized"),
            (StoreErrorKind::SQLX(sqlx::Error::RowNotFound), "no rows returned"),
            (StoreErrorKind::Unavailable("disk full".into()), "unavailable: disk full"),
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
    fn store_error_from_sqlx() {
        let e: StoreError = sqlx::Error::RowNotFound.into();
        assert!(matches!(e.kind, StoreErrorKind::SQLX(_)));
        assert!(e.kind.source().is_some());
    }
}
