use super::{DbError, DbResult};
use serde::Serialize;
use std::fmt::{Display, Formatter};

/// Two end-member labels of a pseudo-binary alloy, e.g. `GaAs InAs`.
///
/// The stored order is the caller's order and decides how composition
/// fractions are read; [`BinaryPair::canonical`] is the order-free identity
/// used for every lookup.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct BinaryPair {
    first: String,
    second: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Aligned,
    Reversed,
}

impl Orientation {
    pub fn apply(self, values: [f64; 2]) -> [f64; 2] {
        match self {
            Self::Aligned => values,
            Self::Reversed => [values[1], values[0]],
        }
    }
}

impl BinaryPair {
    pub fn new(first: impl Into<String>, second: impl Into<String>) -> DbResult<Self> {
        let first = first.into().trim().to_string();
        let second = second.into().trim().to_string();
        if first.is_empty() || second.is_empty() {
            return Err(DbError::invalid_query(
                "binary labels must not be empty".to_string(),
            ));
        }
        if first == second {
            return Err(DbError::invalid_query(format!(
                "binary '{first} {second}' repeats the same component"
            )));
        }
        Ok(Self { first, second })
    }

    pub fn parse(label: &str) -> DbResult<Self> {
        let components: Vec<&str> = label.split_whitespace().collect();
        match components.as_slice() {
            [first, second] => Self::new(*first, *second),
            _ => Err(DbError::invalid_query(format!(
                "invalid binary format '{}'; expected two components (e.g. 'GaAs InAs')",
                label
            ))),
        }
    }

    pub fn first(&self) -> &str {
        &self.first
    }

    pub fn second(&self) -> &str {
        &self.second
    }

    pub fn canonical(&self) -> String {
        if self.first <= self.second {
            format!("{} {}", self.first, self.second)
        } else {
            format!("{} {}", self.second, self.first)
        }
    }

    pub fn same_system(&self, other: &Self) -> bool {
        self.canonical() == other.canonical()
    }

    /// How `labels` (in some stored order) line up against this pair.
    pub fn orientation_of(&self, labels: [&str; 2]) -> Option<Orientation> {
        if labels == [self.first.as_str(), self.second.as_str()] {
            Some(Orientation::Aligned)
        } else if labels == [self.second.as_str(), self.first.as_str()] {
            Some(Orientation::Reversed)
        } else {
            None
        }
    }
}

impl Display for BinaryPair {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.first, self.second)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct AlloyKey {
    pub pair: BinaryPair,
    pub structure: String,
    pub functional: String,
}

impl AlloyKey {
    pub fn new(
        pair: BinaryPair,
        structure: impl Into<String>,
        functional: impl Into<String>,
    ) -> Self {
        Self {
            pair,
            structure: structure.into(),
            functional: functional.into(),
        }
    }
}

impl Display for AlloyKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}, {})", self.pair, self.structure, self.functional)
    }
}
