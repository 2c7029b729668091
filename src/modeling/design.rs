use std::ops::Range;

use nalgebra::DMatrix;

use crate::data::Factor;
use crate::modeling::formula::{ModelSpec, Term};

/// Treatment-coded design matrix with the column range each term occupies.
///
/// The first level of every factor is the reference level. A factor with `k` observed levels
/// contributes `k - 1` indicator columns and an interaction contributes the products of its
/// factors' indicator columns, so a single-level factor contributes no columns at all.
#[derive(Debug, Clone)]
pub struct DesignMatrix {
    matrix: DMatrix<f64>,
    terms: Vec<(Term, Range<usize>)>,
    column_names: Vec<String>,
}

fn find_factor<'a>(factors: &[&'a Factor], name: &str) -> anyhow::Result<&'a Factor> {
    factors
        .iter()
        .copied()
        .find(|f| f.name() == name)
        .ok_or_else(|| anyhow::anyhow!("No factor named {:?} was supplied for the design", name))
}

/// Level code per row; every row must have an observed level.
fn complete_codes(factor: &Factor) -> anyhow::Result<Vec<usize>> {
    factor
        .codes()
        .iter()
        .enumerate()
        .map(|(row, code)| {
            code.ok_or_else(|| {
                anyhow::anyhow!("Factor {:?} has a missing level in row {}", factor.name(), row)
            })
        })
        .collect()
}

impl DesignMatrix {
    pub fn build(spec: &ModelSpec, factors: &[&Factor], n_obs: usize) -> anyhow::Result<Self> {
        let mut columns: Vec<Vec<f64>> = Vec::new();
        let mut column_names = Vec::new();
        let mut terms = Vec::with_capacity(spec.terms().len());

        for term in spec.terms() {
            let start = columns.len();
            match term {
                Term::Intercept => {
                    columns.push(vec![1.0; n_obs]);
                    column_names.push("Intercept".to_string());
                }
                Term::Categorical(name) => {
                    let factor = find_factor(factors, name)?;
                    let codes = complete_codes(factor)?;
                    check_len(factor, &codes, n_obs)?;
                    for level in 1..factor.n_levels() {
                        columns.push(indicator(&codes, level));
                        column_names.push(format!("{}[T.{}]", term.label(), factor.levels()[level]));
                    }
                }
                Term::Interaction(a, b) => {
                    let fa = find_factor(factors, a)?;
                    let fb = find_factor(factors, b)?;
                    let codes_a = complete_codes(fa)?;
                    let codes_b = complete_codes(fb)?;
                    check_len(fa, &codes_a, n_obs)?;
                    check_len(fb, &codes_b, n_obs)?;
                    for level_b in 1..fb.n_levels() {
                        for level_a in 1..fa.n_levels() {
                            let col = codes_a
                                .iter()
                                .zip(&codes_b)
                                .map(|(&ca, &cb)| {
                                    if ca == level_a && cb == level_b {
                                        1.0
                                    } else {
                                        0.0
                                    }
                                })
                                .collect();
                            columns.push(col);
                            column_names.push(format!(
                                "{}[T.{}]:{}[T.{}]",
                                Term::Categorical(a.clone()).label(),
                                fa.levels()[level_a],
                                Term::Categorical(b.clone()).label(),
                                fb.levels()[level_b]
                            ));
                        }
                    }
                }
            }
            terms.push((term.clone(), start..columns.len()));
        }

        let matrix = DMatrix::from_fn(n_obs, columns.len(), |r, c| columns[c][r]);
        Ok(DesignMatrix {
            matrix,
            terms,
            column_names,
        })
    }

    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.matrix
    }

    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    pub fn n_columns(&self) -> usize {
        self.matrix.ncols()
    }

    /// Columns belonging to `term`, empty if the term is not part of the design
    pub fn term_columns(&self, term: &Term) -> Range<usize> {
        self.terms
            .iter()
            .find(|(t, _)| t == term)
            .map(|(_, range)| range.clone())
            .unwrap_or(0..0)
    }

    /// Sub-design made of the given terms' columns, in design order.
    pub fn select_terms(&self, keep: &[&Term]) -> DMatrix<f64> {
        let indices: Vec<usize> = self
            .terms
            .iter()
            .filter(|(t, _)| keep.contains(&t))
            .flat_map(|(_, range)| range.clone())
            .collect();
        self.matrix.select_columns(indices.iter())
    }
}

fn indicator(codes: &[usize], level: usize) -> Vec<f64> {
    codes
        .iter()
        .map(|&c| if c == level { 1.0 } else { 0.0 })
        .collect()
}

fn check_len(factor: &Factor, codes: &[usize], n_obs: usize) -> anyhow::Result<()> {
    if codes.len() != n_obs {
        return Err(anyhow::anyhow!(
            "Factor {:?} has {} rows, expected {}",
            factor.name(),
            codes.len(),
            n_obs
        ));
    }
    Ok(())
}
