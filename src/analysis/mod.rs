//! Single-gene two-way ANOVA over annotated expression data.
//!
//! [`run_two_way_anova`] extracts one gene, joins it with two observation metadata columns,
//! fits `Expression ~ C(factor1) + C(factor2) + C(factor1):C(factor2)` by least squares and
//! returns the type-II ANOVA table.

use log::{debug, warn};

use crate::data::{AnnotatedExpression, ViewKind};
use crate::error::AnovaError;
use crate::modeling::anova::type_ii_anova;
use crate::modeling::formula::ModelSpec;
use crate::modeling::{AnovaConfig, AnovaTable};

mod frame;

pub use frame::AnovaFrame;

/// Gene and the two metadata columns to stratify it by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    gene: String,
    factor1: String,
    factor2: String,
}

impl AnalysisRequest {
    /// Request for `gene` with the default factors `Diet` and `Genotype`.
    pub fn new(gene: &str) -> Self {
        AnalysisRequest {
            gene: gene.to_string(),
            factor1: "Diet".to_string(),
            factor2: "Genotype".to_string(),
        }
    }

    pub fn with_factors(mut self, factor1: &str, factor2: &str) -> Self {
        self.factor1 = factor1.to_string();
        self.factor2 = factor2.to_string();
        self
    }

    pub fn gene(&self) -> &str {
        &self.gene
    }

    pub fn factor1(&self) -> &str {
        &self.factor1
    }

    pub fn factor2(&self) -> &str {
        &self.factor2
    }
}

/// One gene's expression column and the view it came from.
#[derive(Debug, Clone)]
pub struct GeneExpression<'a> {
    pub values: Vec<f64>,
    pub view: ViewKind,
    pub obs_names: Option<&'a [String]>,
}

/// Extract `gene` from the first view that contains it, raw before primary.
///
/// # Errors
///
/// [`AnovaError::GeneNotFound`] if no view contains the gene.
pub fn extract_gene_expression<'a>(
    data: &AnnotatedExpression<'a>,
    gene: &str,
) -> anyhow::Result<GeneExpression<'a>> {
    for (view, source) in data.sources() {
        if let Some(values) = source.gene_expression(gene)? {
            debug!("Gene {} taken from the {} view", gene, view);
            return Ok(GeneExpression {
                values,
                view,
                obs_names: source.obs_names(),
            });
        }
    }
    Err(AnovaError::GeneNotFound(gene.to_string()).into())
}

/// Run the two-way ANOVA described by `request`.
///
/// Returns `Ok(None)` after logging a warning when the gene is in neither view. Every other
/// failure (missing factor column, misaligned rows, singular design, ...) is returned as an
/// error carrying an [`AnovaError`] where one applies.
pub fn run_two_way_anova(
    data: &AnnotatedExpression<'_>,
    request: &AnalysisRequest,
    config: &AnovaConfig,
) -> anyhow::Result<Option<AnovaTable>> {
    let expression = match extract_gene_expression(data, request.gene()) {
        Ok(expression) => expression,
        Err(err) => {
            if let Some(AnovaError::GeneNotFound(gene)) = err.downcast_ref::<AnovaError>() {
                warn!("Gene {} not found.", gene);
                return Ok(None);
            }
            return Err(err);
        }
    };

    let frame = AnovaFrame::assemble(
        expression.values,
        expression.obs_names,
        data.obs(),
        request.factor1(),
        request.factor2(),
    )?
    .complete_cases(config.missing())?;

    let spec = ModelSpec::two_way(config.response_name(), request.factor1(), request.factor2());
    type_ii_anova(
        frame.response(),
        &[frame.factor1(), frame.factor2()],
        &spec,
        config,
    )
    .map(Some)
}

/// [`run_two_way_anova`] with the default configuration.
pub fn two_way_anova(
    data: &AnnotatedExpression<'_>,
    gene: &str,
    factor1: &str,
    factor2: &str,
) -> anyhow::Result<Option<AnovaTable>> {
    let request = AnalysisRequest::new(gene).with_factors(factor1, factor2);
    run_two_way_anova(data, &request, &AnovaConfig::default())
}
