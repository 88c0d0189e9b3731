pub mod errors;
mod pair;

pub use errors::{DbError, DbResult, ErrorCategory, ExitPlaceholder};
pub use pair::{AlloyKey, BinaryPair, Orientation};

use serde::Serialize;
use std::fmt::{Display, Formatter};

pub const DEFAULT_FUNCTIONAL: &str = "PBE";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dataset {
    Convergence,
    EvPoints,
    VinetFit,
    Alloy,
}

impl Dataset {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Convergence => "convergence",
            Self::EvPoints => "E-V point",
            Self::VinetFit => "Vinet fit",
            Self::Alloy => "alloy",
        }
    }
}

impl Display for Dataset {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

/// (material, structure, functional) triple shared by the convergence and
/// equation-of-state tables.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SystemKey {
    pub material: String,
    pub structure: String,
    pub functional: String,
}

impl SystemKey {
    pub fn new(
        material: impl Into<String>,
        structure: impl Into<String>,
        functional: impl Into<String>,
    ) -> Self {
        Self {
            material: material.into(),
            structure: structure.into(),
            functional: functional.into(),
        }
    }
}

impl Display for SystemKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({}, {})",
            self.material, self.structure, self.functional
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TestType {
    Kpt,
    Encut,
}

impl TestType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Kpt => "kpt",
            Self::Encut => "encut",
        }
    }

    /// Exact table token; no case folding.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "kpt" => Some(Self::Kpt),
            "encut" => Some(Self::Encut),
            _ => None,
        }
    }

    /// Caller input, case-insensitive.
    pub fn parse(token: &str) -> DbResult<Self> {
        Self::from_token(&token.trim().to_ascii_lowercase()).ok_or_else(|| {
            DbError::invalid_query(format!(
                "unknown convergence test type '{}'; expected 'kpt' or 'encut'",
                token
            ))
        })
    }

    pub const fn axis_label(self) -> &'static str {
        match self {
            Self::Kpt => "N_kpoints",
            Self::Encut => "ENCUT (eV)",
        }
    }
}

impl Display for TestType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}
