use super::{AlloyKey, Dataset, SystemKey, TestType};
use crate::numerics::LeastSquaresError;
use std::path::PathBuf;

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    InputValidationError,
    IoSystemError,
    DataNotFound,
    ComputationError,
}

impl ErrorCategory {
    pub const fn exit_placeholder(self) -> ExitPlaceholder {
        match self {
            Self::InputValidationError => ExitPlaceholder {
                exit_code: 2,
                category_name: "InputValidationError",
            },
            Self::IoSystemError => ExitPlaceholder {
                exit_code: 3,
                category_name: "IoSystemError",
            },
            Self::DataNotFound => ExitPlaceholder {
                exit_code: 4,
                category_name: "DataNotFound",
            },
            Self::ComputationError => ExitPlaceholder {
                exit_code: 5,
                category_name: "ComputationError",
            },
        }
    }

    pub const fn exit_code(self) -> i32 {
        self.exit_placeholder().exit_code
    }

    pub const fn category_name(self) -> &'static str {
        self.exit_placeholder().category_name
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitPlaceholder {
    pub exit_code: i32,
    pub category_name: &'static str,
}

/// Failures surfaced by loading and querying the database.
///
/// Every variant carries the key (or source location) that produced it so
/// the message alone identifies the failing combination.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DbError {
    #[error("failed to load {dataset} source '{}': {reason}", path.display())]
    SourceLoad {
        dataset: Dataset,
        path: PathBuf,
        reason: String,
    },
    #[error("no {dataset} tables could be loaded from '{}'", path.display())]
    NoSources { dataset: Dataset, path: PathBuf },
    #[error("no {dataset} data for {key}")]
    NoData { dataset: Dataset, key: String },
    #[error("no {test_type} convergence data for {key}")]
    NoConvergenceData { key: SystemKey, test_type: TestType },
    #[error("no Vinet fit data for {key}")]
    NoFitData { key: SystemKey },
    #[error("no exact composition match for {key} with composition [{}, {}]", composition[0], composition[1])]
    NoMatch { key: AlloyKey, composition: [f64; 2] },
    #[error("bowing fit skipped for {key}: {found} samples, at least {required} required")]
    InsufficientSamples {
        key: AlloyKey,
        found: usize,
        required: usize,
    },
    #[error("bowing fit failed for {key}: {source}")]
    FitConvergence {
        key: AlloyKey,
        source: LeastSquaresError,
    },
    #[error("could not parse lattice matrix for {key}: '{raw}'")]
    LatticeParse { key: AlloyKey, raw: String },
    #[error("{0}")]
    InvalidQuery(String),
}

impl DbError {
    pub fn invalid_query(message: impl Into<String>) -> Self {
        Self::InvalidQuery(message.into())
    }

    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::SourceLoad { .. } | Self::NoSources { .. } => ErrorCategory::IoSystemError,
            Self::NoData { .. }
            | Self::NoConvergenceData { .. }
            | Self::NoFitData { .. }
            | Self::NoMatch { .. } => ErrorCategory::DataNotFound,
            Self::InsufficientSamples { .. }
            | Self::FitConvergence { .. }
            | Self::LatticeParse { .. } => ErrorCategory::ComputationError,
            Self::InvalidQuery(_) => ErrorCategory::InputValidationError,
        }
    }

    pub const fn placeholder(&self) -> &'static str {
        match self {
            Self::SourceLoad { .. } => "IO.SOURCE_LOAD",
            Self::NoSources { .. } => "IO.NO_SOURCES",
            Self::NoData { .. } => "DATA.NO_DATA",
            Self::NoConvergenceData { .. } => "DATA.NO_CONVERGENCE",
            Self::NoFitData { .. } => "DATA.NO_FIT",
            Self::NoMatch { .. } => "DATA.NO_MATCH",
            Self::InsufficientSamples { .. } => "FIT.INSUFFICIENT_SAMPLES",
            Self::FitConvergence { .. } => "FIT.NOT_CONVERGED",
            Self::LatticeParse { .. } => "DATA.LATTICE_PARSE",
            Self::InvalidQuery(_) => "INPUT.INVALID_QUERY",
        }
    }

    pub const fn exit_code(&self) -> i32 {
        self.category().exit_code()
    }

    pub fn diagnostic_line(&self) -> String {
        format!("ERROR: [{}] {}", self.placeholder(), self)
    }

    pub fn fatal_exit_line(&self) -> String {
        format!("FATAL EXIT CODE: {}", self.exit_code())
    }
}

#[cfg(test)]
mod tests {
    use super::{DbError, ErrorCategory};
    use crate::domain::{AlloyKey, BinaryPair, Dataset, SystemKey, TestType};
    use std::path::PathBuf;

    #[test]
    fn exit_mapping_is_stable() {
        let cases = [
            (ErrorCategory::InputValidationError, 2, "InputValidationError"),
            (ErrorCategory::IoSystemError, 3, "IoSystemError"),
            (ErrorCategory::DataNotFound, 4, "DataNotFound"),
            (ErrorCategory::ComputationError, 5, "ComputationError"),
        ];

        for (category, exit_code, name) in cases {
            let placeholder = category.exit_placeholder();
            assert_eq!(placeholder.exit_code, exit_code);
            assert_eq!(placeholder.category_name, name);
        }
    }

    #[test]
    fn convergence_error_names_the_full_key() {
        let error = DbError::NoConvergenceData {
            key: SystemKey::new("GaN", "zb", "PBE"),
            test_type: TestType::Kpt,
        };

        assert_eq!(error.category(), ErrorCategory::DataNotFound);
        assert_eq!(
            error.diagnostic_line(),
            "ERROR: [DATA.NO_CONVERGENCE] no kpt convergence data for GaN (zb, PBE)"
        );
        assert_eq!(error.fatal_exit_line(), "FATAL EXIT CODE: 4");
    }

    #[test]
    fn alloy_errors_render_pair_and_composition() {
        let key = AlloyKey::new(
            BinaryPair::parse("GaAs InAs").expect("pair should parse"),
            "zb",
            "PBE",
        );
        let error = DbError::NoMatch {
            key,
            composition: [0.25, 0.75],
        };

        assert_eq!(
            error.to_string(),
            "no exact composition match for GaAs InAs (zb, PBE) with composition [0.25, 0.75]"
        );
    }

    #[test]
    fn source_errors_are_io_category() {
        let error = DbError::SourceLoad {
            dataset: Dataset::VinetFit,
            path: PathBuf::from("vinet_fit_summary.csv"),
            reason: "file not found".to_string(),
        };

        assert_eq!(error.exit_code(), 3);
        assert_eq!(
            error.to_string(),
            "failed to load Vinet fit source 'vinet_fit_summary.csv': file not found"
        );
    }
}
