use std::fmt;

use crate::modeling::formula::{ModelSpec, Term};

pub mod anova;
pub mod design;
pub mod formula;
pub mod ols;

/// What to do with observations that have a missing factor level or a non-finite expression
/// value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MissingPolicy {
    /// Drop incomplete observations before fitting
    #[default]
    Drop,
    /// Fail with `AnovaError::MissingValues`
    Raise,
}

#[derive(Debug, Clone)]
pub struct AnovaConfig {
    missing: MissingPolicy,
    rank_tolerance: Option<f64>,
    response_name: String,
}

impl Default for AnovaConfig {
    fn default() -> Self {
        AnovaConfig {
            missing: MissingPolicy::Drop,
            rank_tolerance: None,
            response_name: "Expression".to_string(),
        }
    }
}

impl AnovaConfig {
    pub fn with_missing(mut self, missing: MissingPolicy) -> Self {
        self.missing = missing;
        self
    }

    /// Singular values at or below `tolerance` count as zero when determining rank.
    /// A negative or NaN tolerance is rejected when the model is fitted.
    pub fn with_rank_tolerance(mut self, tolerance: f64) -> Self {
        self.rank_tolerance = Some(tolerance);
        self
    }

    /// Name of the response column, used in labels only
    pub fn with_response_name(mut self, name: &str) -> Self {
        self.response_name = name.to_string();
        self
    }

    pub fn missing(&self) -> MissingPolicy {
        self.missing
    }

    pub fn rank_tolerance(&self) -> Option<f64> {
        self.rank_tolerance
    }

    pub fn response_name(&self) -> &str {
        &self.response_name
    }
}

/// Row label of an ANOVA table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnovaTerm {
    Main(String),
    Interaction(String, String),
    Residual,
}

impl AnovaTerm {
    pub fn label(&self) -> String {
        match self {
            AnovaTerm::Main(name) => Term::Categorical(name.clone()).label(),
            AnovaTerm::Interaction(a, b) => Term::Interaction(a.clone(), b.clone()).label(),
            AnovaTerm::Residual => "Residual".to_string(),
        }
    }
}

impl TryFrom<&Term> for AnovaTerm {
    type Error = anyhow::Error;

    /// The intercept has no row of its own and is rejected.
    fn try_from(term: &Term) -> anyhow::Result<Self> {
        match term {
            Term::Categorical(name) => Ok(AnovaTerm::Main(name.clone())),
            Term::Interaction(a, b) => Ok(AnovaTerm::Interaction(a.clone(), b.clone())),
            Term::Intercept => Err(anyhow::anyhow!("The intercept is not an ANOVA table term")),
        }
    }
}

impl fmt::Display for AnovaTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnovaRow {
    pub term: AnovaTerm,
    /// Type-II sum of squares
    pub sum_sq: f64,
    pub df: f64,
    /// `None` for the residual row and for effects with zero degrees of freedom
    pub f_statistic: Option<f64>,
    /// Upper-tail probability of the F statistic
    pub p_value: Option<f64>,
}

impl AnovaRow {
    pub fn mean_sq(&self) -> Option<f64> {
        if self.df > 0.0 {
            Some(self.sum_sq / self.df)
        } else {
            None
        }
    }

    pub fn is_significant(&self, alpha: f64) -> bool {
        self.p_value.is_some_and(|p| p < alpha)
    }
}

/// Two-way ANOVA table: factor1, factor2, interaction, residual.
#[derive(Debug, Clone, PartialEq)]
pub struct AnovaTable {
    spec: ModelSpec,
    n_obs: usize,
    rows: Vec<AnovaRow>,
}

impl AnovaTable {
    pub fn new(spec: ModelSpec, n_obs: usize, rows: Vec<AnovaRow>) -> Self {
        AnovaTable { spec, n_obs, rows }
    }

    pub fn spec(&self) -> &ModelSpec {
        &self.spec
    }

    /// Observations that entered the fit
    pub fn n_obs(&self) -> usize {
        self.n_obs
    }

    pub fn rows(&self) -> &[AnovaRow] {
        &self.rows
    }

    pub fn row(&self, term: &AnovaTerm) -> Option<&AnovaRow> {
        self.rows.iter().find(|r| &r.term == term)
    }

    pub fn main_effect(&self, factor: &str) -> Option<&AnovaRow> {
        self.row(&AnovaTerm::Main(factor.to_string()))
    }

    pub fn interaction(&self) -> Option<&AnovaRow> {
        self.rows
            .iter()
            .find(|r| matches!(r.term, AnovaTerm::Interaction(..)))
    }

    pub fn residual(&self) -> Option<&AnovaRow> {
        self.row(&AnovaTerm::Residual)
    }
}

fn fmt_value(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.6}", v),
        None => "NaN".to_string(),
    }
}

impl fmt::Display for AnovaTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let labels: Vec<String> = self.rows.iter().map(|r| r.term.label()).collect();
        let cells: Vec<[String; 4]> = self
            .rows
            .iter()
            .map(|r| {
                [
                    fmt_value(Some(r.sum_sq)),
                    format!("{:.1}", r.df),
                    fmt_value(r.f_statistic),
                    fmt_value(r.p_value),
                ]
            })
            .collect();

        let header = ["sum_sq", "df", "F", "PR(>F)"];
        let label_width = labels.iter().map(String::len).max().unwrap_or(0);
        let mut widths = header.map(str::len);
        for row in &cells {
            for (w, cell) in widths.iter_mut().zip(row) {
                *w = (*w).max(cell.len());
            }
        }

        write!(f, "{:label_width$}", "")?;
        for (h, w) in header.iter().zip(widths) {
            write!(f, "  {:>w$}", h)?;
        }
        writeln!(f)?;
        for (label, row) in labels.iter().zip(&cells) {
            write!(f, "{:<label_width$}", label)?;
            for (cell, w) in row.iter().zip(widths) {
                write!(f, "  {:>w$}", cell)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
