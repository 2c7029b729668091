use thiserror::Error;

/// Conditions raised while extracting expression and fitting the two-way model.
///
/// Fallible functions in this crate return `anyhow::Result`; the typed value
/// can be recovered with `err.downcast_ref::<AnovaError>()`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnovaError {
    /// The gene is absent from both the raw and the primary expression view
    #[error("gene {0} not found")]
    GeneNotFound(String),

    /// A requested factor is not a column of the observation metadata
    #[error("observation metadata has no column named {0:?}")]
    MissingFactorColumn(String),

    #[error("expression has {expression} values but metadata has {observations} observations")]
    RowMisalignment {
        expression: usize,
        observations: usize,
    },

    /// Same length, but the observation identifiers differ in content or order
    #[error("observation names differ between expression source and metadata (first mismatch at row {row})")]
    ObservationOrderMismatch { row: usize },

    #[error("{count} observations have missing factor levels or non-finite expression")]
    MissingValues { count: usize },

    #[error("need at least 2 observations, got {0}")]
    InsufficientObservations(usize),

    /// Some model terms are not estimable, e.g. a factor1 x factor2 cell is empty
    #[error("design matrix is rank deficient (rank {rank} < {columns} columns)")]
    SingularDesign { rank: usize, columns: usize },

    #[error("model leaves no residual degrees of freedom ({observations} observations, rank {rank})")]
    NoResidualDegreesOfFreedom { observations: usize, rank: usize },
}
