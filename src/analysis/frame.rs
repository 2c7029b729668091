use log::debug;

use crate::data::{Factor, ObservationMetadata};
use crate::error::AnovaError;
use crate::modeling::MissingPolicy;

/// Row-aligned response values and the two grouping factors.
#[derive(Debug, Clone, PartialEq)]
pub struct AnovaFrame {
    response: Vec<f64>,
    factor1: Factor,
    factor2: Factor,
}

impl AnovaFrame {
    /// Join expression values with two metadata columns.
    ///
    /// Row `i` of the frame is observation `i` of both inputs. The expression length must match
    /// the metadata row count, and when both sides carry observation names they must agree in
    /// content and order.
    pub fn assemble(
        expression: Vec<f64>,
        expression_obs: Option<&[String]>,
        obs: &ObservationMetadata,
        factor1: &str,
        factor2: &str,
    ) -> anyhow::Result<Self> {
        if expression.len() != obs.n_obs() {
            return Err(AnovaError::RowMisalignment {
                expression: expression.len(),
                observations: obs.n_obs(),
            }
            .into());
        }

        if let (Some(expr_names), Some(obs_names)) = (expression_obs, obs.obs_names()) {
            if let Some(row) = first_mismatch(expr_names, obs_names) {
                return Err(AnovaError::ObservationOrderMismatch { row }.into());
            }
        }

        Ok(AnovaFrame {
            response: expression,
            factor1: obs.factor(factor1)?,
            factor2: obs.factor(factor2)?,
        })
    }

    pub fn n_rows(&self) -> usize {
        self.response.len()
    }

    pub fn response(&self) -> &[f64] {
        &self.response
    }

    pub fn factor1(&self) -> &Factor {
        &self.factor1
    }

    pub fn factor2(&self) -> &Factor {
        &self.factor2
    }

    /// (expression, factor1 level, factor2 level) of row `i`
    pub fn row(&self, i: usize) -> Option<(f64, Option<&str>, Option<&str>)> {
        let value = *self.response.get(i)?;
        Some((value, self.factor1.level_of(i), self.factor2.level_of(i)))
    }

    /// Rows with a non-finite response or a missing level in either factor.
    pub fn incomplete_rows(&self) -> Vec<usize> {
        (0..self.n_rows())
            .filter(|&i| {
                !self.response[i].is_finite()
                    || self.factor1.codes()[i].is_none()
                    || self.factor2.codes()[i].is_none()
            })
            .collect()
    }

    /// Apply `policy` to incomplete rows. Levels that lose all their observations are dropped.
    pub fn complete_cases(self, policy: MissingPolicy) -> anyhow::Result<Self> {
        let incomplete = self.incomplete_rows();
        if incomplete.is_empty() {
            return Ok(self);
        }
        if policy == MissingPolicy::Raise {
            return Err(AnovaError::MissingValues {
                count: incomplete.len(),
            }
            .into());
        }

        debug!(
            "Dropping {} of {} observations with missing values",
            incomplete.len(),
            self.n_rows()
        );
        let keep: Vec<usize> = (0..self.n_rows())
            .filter(|i| incomplete.binary_search(i).is_err())
            .collect();
        Ok(AnovaFrame {
            response: keep.iter().map(|&i| self.response[i]).collect(),
            factor1: self.factor1.subset(&keep),
            factor2: self.factor2.subset(&keep),
        })
    }
}

fn first_mismatch(a: &[String], b: &[String]) -> Option<usize> {
    a.iter()
        .zip(b)
        .position(|(x, y)| x != y)
        .or(if a.len() != b.len() {
            Some(a.len().min(b.len()))
        } else {
            None
        })
}
