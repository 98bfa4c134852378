use crate::migration::{MethodFuture, MigrationDirection, MigrationUnit, UnitBody, UnitKey};
use crate::receiver::{ErasedMethod, Receiver, Signature};

use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::sync::{Arc, LazyLock};


static METHOD_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^V(\d+)_([A-Za-z0-9_]+)_(up|down)$").expect("method name pattern is valid")
});


/// Why a method with a migration name was left out of the set.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Defect {
    Signature { params: usize, returns: usize },
    VersionOutOfRange { version: String },
}

impl fmt::Display for Defect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Signature { params, returns } => write!(
                f,
                "takes {params} parameter(s) and returns {returns} value(s); expected no parameters and a single result"
            ),
            Self::VersionOutOfRange { version } => write!(f, "version '{version}' is not a positive 64-bit integer"),
        }
    }
}


/// A method that follows the naming convention but cannot be run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct InvalidCandidate {
    pub method: String,
    pub defect: Defect,
}

impl fmt::Display for InvalidCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Method '{}' {}", self.method, self.defect)
    }
}


/// Units and diagnostics found on one receiver.
#[derive(Debug, Default)]
pub struct Scan {
    pub units: Vec<MigrationUnit>,
    pub diagnostics: Vec<InvalidCandidate>,
}


/// Parse a method name following `V<version>_<description>_<up|down>`.
///
/// Returns `None` for names outside the convention.
pub fn parse_method_name(name: &str) -> Option<Result<UnitKey, Defect>> {
    let captures = METHOD_NAME.captures(name)?;
    let version = &captures[1];
    let direction = MigrationDirection::from_suffix(&captures[3])?;

    let key = match version.parse::<i64>() {
        Ok(v) if v > 0 => Ok(UnitKey::new(v, &captures[2], direction)),
        _ => Err(Defect::VersionOutOfRange { version: version.to_string() }),
    };
    Some(key)
}


struct Bound<R> {
    receiver: Arc<R>,
    method: Arc<dyn ErasedMethod<R>>,
}

impl<R: Send + Sync> UnitBody for Bound<R> {
    fn invoke(&self) -> MethodFuture<'_> {
        self.method.call(&self.receiver)
    }
}


/// Collect the migration units exposed by `receiver`.
///
/// Names outside the convention are ignored. Convention names whose signature
/// does not conform are reported in `diagnostics` and never bound.
pub fn scan<R: Receiver>(receiver: Arc<R>) -> Scan {
    let mut scan = Scan::default();

    for method in R::methods().iter() {
        let name = method.name();
        let key = match parse_method_name(name) {
            None => {
                tracing::trace!("Skipping method '{name}': not a migration name");
                continue;
            }
            Some(Err(defect)) => {
                scan.diagnostics.push(InvalidCandidate { method: name.to_string(), defect });
                continue;
            }
            Some(Ok(key)) => key,
        };

        let Signature { params, returns } = method.signature();
        match method.callable() {
            Some(call) => {
                tracing::debug!("Found migration method '{name}'");
                let body = Arc::new(Bound { receiver: Arc::clone(&receiver), method: call });
                scan.units.push(MigrationUnit::new(key, name, body));
            }
            None => scan.diagnostics.push(InvalidCandidate {
                method: name.to_string(),
                defect: Defect::Signature { params, returns },
            }),
        }
    }

    for candidate in &scan.diagnostics {
        tracing::warn!("Excluding invalid migration candidate: {candidate}");
    }

    scan
}
