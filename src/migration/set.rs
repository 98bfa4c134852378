use crate::migration::{MigrationDirection, MigrationError, MigrationErrorKind, MigrationUnit, UnitKey};

use std::collections::BTreeMap;


#[derive(Clone, Debug, Default)]
struct Pair {
    up: Option<MigrationUnit>,
    down: Option<MigrationUnit>,
}

impl Pair {
    fn slot(&mut self, direction: MigrationDirection) -> &mut Option<MigrationUnit> {
        match direction {
            MigrationDirection::Up => &mut self.up,
            MigrationDirection::Down => &mut self.down,
        }
    }

    fn get(&self, direction: MigrationDirection) -> Option<&MigrationUnit> {
        match direction {
            MigrationDirection::Up => self.up.as_ref(),
            MigrationDirection::Down => self.down.as_ref(),
        }
    }
}


/// Validated units of one receiver, keyed by `(version, description)`.
///
/// Up and down units sharing a key form a pair. A pair may be one-directional;
/// that only becomes an error when a plan needs the missing direction.
#[derive(Clone, Debug, Default)]
pub struct MigrationSet {
    pairs: BTreeMap<(i64, String), Pair>,
}

impl MigrationSet {
    pub fn build(units: impl IntoIterator<Item = MigrationUnit>) -> Result<Self, MigrationError> {
        let mut pairs: BTreeMap<(i64, String), Pair> = BTreeMap::new();

        for unit in units {
            let key = (unit.version(), unit.description().to_string());
            let slot = pairs.entry(key).or_default().slot(unit.direction());

            if slot.is_some() {
                return Err(MigrationError::new(MigrationErrorKind::DuplicateUnit(unit.key().clone())));
            }
            *slot = Some(unit);
        }

        Ok(MigrationSet { pairs })
    }

    /// Number of units across both directions.
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// All units by ascending key, up before down within a pair.
    pub fn iter(&self) -> impl Iterator<Item = &MigrationUnit> {
        self.pairs
            .values()
            .flat_map(|pair| pair.up.iter().chain(pair.down.iter()))
    }

    pub fn get(&self, key: &UnitKey) -> Option<&MigrationUnit> {
        self.pairs
            .get(&(key.version, key.description.clone()))
            .and_then(|pair| pair.get(key.direction))
    }

    /// Distinct versions, ascending.
    pub fn versions(&self) -> Vec<i64> {
        let mut versions: Vec<i64> = self.pairs.keys().map(|(version, _)| *version).collect();
        versions.dedup();
        versions
    }

    /// Highest known version, or 0 for an empty set.
    pub fn latest_version(&self) -> i64 {
        self.pairs.keys().next_back().map_or(0, |(version, _)| *version)
    }

    /// Units needed to move the cursor from `from_version` to `to_version`.
    ///
    /// Fails with `MissingDirection` if any selected pair lacks the needed
    /// direction, before anything has been executed. A negative target is
    /// rejected since the cursor never goes below 0.
    pub fn pending(&self, from_version: i64, to_version: i64) -> Result<Plan, MigrationError> {
        if to_version < 0 {
            return Err(MigrationError::new(MigrationErrorKind::NegativeTarget(to_version)));
        }

        let direction = if to_version >= from_version {
            MigrationDirection::Up
        } else {
            MigrationDirection::Down
        };

        let (low, high) = match direction {
            MigrationDirection::Up => (from_version, to_version),
            MigrationDirection::Down => (to_version, from_version),
        };
        let selected = self
            .pairs
            .iter()
            .filter(|((version, _), _)| *version > low && *version <= high);

        let selected: Vec<(&(i64, String), &Pair)> = match direction {
            MigrationDirection::Up => selected.collect(),
            // Reverse execution order when rolling back.
            MigrationDirection::Down => selected.rev().collect(),
        };

        let units = selected
            .into_iter()
            .map(|((version, description), pair)| {
                pair.get(direction).cloned().ok_or_else(|| {
                    MigrationError::new(MigrationErrorKind::MissingDirection(UnitKey::new(
                        *version,
                        description.clone(),
                        direction,
                    )))
                })
            })
            .collect::<Result<Vec<MigrationUnit>, MigrationError>>()?;

        Ok(Plan { from_version, to_version, direction, units })
    }

    /// Version a run towards `target` should end at, starting from `current`.
    ///
    /// `Latest` never moves the cursor down, even when it sits above every
    /// known version.
    pub fn resolve(&self, current: i64, target: Target) -> i64 {
        match target {
            Target::Latest => self.latest_version().max(current),
            Target::Version(version) => version,
            Target::Steps(steps) => self.target_for_steps(current, steps),
        }
    }

    /// Resolves a relative step count into a target version.
    ///
    /// `+n` lands on the n-th distinct version above `current`, `-n` rolls back
    /// the n most recent distinct versions at or below `current`. Steps past
    /// either end clamp to the latest version or to 0.
    pub fn target_for_steps(&self, current: i64, steps: i64) -> i64 {
        let versions = self.versions();
        let n = steps.unsigned_abs() as usize;

        if steps > 0 {
            let ahead: Vec<i64> = versions.into_iter().filter(|v| *v > current).collect();
            match ahead.get(n - 1).or(ahead.last()) {
                Some(version) => *version,
                None => current,
            }
        } else if steps < 0 {
            let applied: Vec<i64> = versions.into_iter().rev().filter(|v| *v <= current).collect();
            applied.get(n).copied().unwrap_or(0)
        } else {
            current
        }
    }
}


/// Where a run should leave the cursor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Target {
    /// The highest version the set knows about.
    Latest,
    /// An explicit version; 0 rolls everything back.
    Version(i64),
    /// Relative to the current cursor, counted in distinct versions.
    Steps(i64),
}


/// Ordered units for one run, plus the interval they were selected for.
#[derive(Clone, Debug)]
pub struct Plan {
    from_version: i64,
    to_version: i64,
    direction: MigrationDirection,
    units: Vec<MigrationUnit>,
}

impl Plan {
    pub fn from_version(&self) -> i64 {
        self.from_version
    }

    pub fn to_version(&self) -> i64 {
        self.to_version
    }

    pub fn direction(&self) -> MigrationDirection {
        self.direction
    }

    pub fn units(&self) -> &[MigrationUnit] {
        &self.units
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MigrationUnit> {
        self.units.iter()
    }
}

impl<'a> IntoIterator for &'a Plan {
    type Item = &'a MigrationUnit;
    type IntoIter = std::slice::Iter<'a, MigrationUnit>;

    fn into_iter(self) -> Self::IntoIter {
        self.units.iter()
    }
}
