//! Type-II ANOVA by nested model comparison.
//!
//! For each effect `E` of the model, let `M(E)` be the model holding every term except those of
//! higher order that contain `E`. The sum of squares of `E` is
//! `RSS(M(E) without E) - RSS(M(E))`, with the matching difference in rank as its degrees
//! of freedom. Each main effect is therefore adjusted for the other main effect but not for the
//! interaction, and the interaction is adjusted for both main effects.

use log::debug;
use nalgebra::DVector;
use statrs::distribution::{ContinuousCDF, FisherSnedecor};

use crate::data::Factor;
use crate::error::AnovaError;
use crate::modeling::design::DesignMatrix;
use crate::modeling::formula::{ModelSpec, Term};
use crate::modeling::ols::{self, OlsFit};
use crate::modeling::{AnovaConfig, AnovaRow, AnovaTable, AnovaTerm};

/// Fit `spec` and decompose its sums of squares.
///
/// `factors` must hold complete (no missing levels) factors row-aligned with `response`.
///
/// # Errors
///
/// * [`AnovaError::InsufficientObservations`] for fewer than two observations
/// * [`AnovaError::SingularDesign`] if the full design is rank deficient, e.g. when a
///   combination of factor levels has no observations
/// * [`AnovaError::NoResidualDegreesOfFreedom`] if the model interpolates the data
/// * a negative or NaN rank tolerance in `config`
pub fn type_ii_anova(
    response: &[f64],
    factors: &[&Factor],
    spec: &ModelSpec,
    config: &AnovaConfig,
) -> anyhow::Result<AnovaTable> {
    let n_obs = response.len();
    if n_obs < 2 {
        return Err(AnovaError::InsufficientObservations(n_obs).into());
    }

    let design = DesignMatrix::build(spec, factors, n_obs)?;
    let y = DVector::from_column_slice(response);
    let tolerance = config.rank_tolerance();

    let full = ols::fit(design.matrix(), &y, tolerance)?;
    if !full.is_full_rank() {
        return Err(AnovaError::SingularDesign {
            rank: full.rank,
            columns: full.n_params,
        }
        .into());
    }
    let df_resid = full.df_resid();
    if df_resid == 0 {
        return Err(AnovaError::NoResidualDegreesOfFreedom {
            observations: n_obs,
            rank: full.rank,
        }
        .into());
    }
    debug!(
        "Fitted {} on {} observations: rank {}, residual SS {}, columns {:?}",
        spec,
        n_obs,
        full.rank,
        full.rss,
        design.column_names()
    );

    // Sums of squares at the round-off level of the response count as exactly zero
    let noise_floor = f64::EPSILON * n_obs as f64 * y.norm_squared();
    let rss = zero_below(full.rss, noise_floor);
    let scale = rss / df_resid as f64;
    let mut rows = Vec::with_capacity(spec.terms().len());

    for term in spec.terms().iter().filter(|t| **t != Term::Intercept) {
        let with_term: Vec<&Term> = spec.terms().iter().filter(|t| !t.contains(term)).collect();
        let without_term: Vec<&Term> = with_term.iter().copied().filter(|t| *t != term).collect();

        let larger = fit_terms(&design, &with_term, &y, tolerance)?;
        let smaller = fit_terms(&design, &without_term, &y, tolerance)?;

        let df = larger.rank.saturating_sub(smaller.rank);
        let sum_sq = if df == 0 {
            0.0
        } else {
            zero_below(smaller.rss - larger.rss, noise_floor)
        };
        let (f_statistic, p_value) = f_test(sum_sq, df, scale, df_resid)?;

        rows.push(AnovaRow {
            term: AnovaTerm::try_from(term)?,
            sum_sq,
            df: df as f64,
            f_statistic,
            p_value,
        });
    }

    rows.push(AnovaRow {
        term: AnovaTerm::Residual,
        sum_sq: rss,
        df: df_resid as f64,
        f_statistic: None,
        p_value: None,
    });

    Ok(AnovaTable::new(spec.clone(), n_obs, rows))
}

fn fit_terms(
    design: &DesignMatrix,
    terms: &[&Term],
    y: &DVector<f64>,
    tolerance: Option<f64>,
) -> anyhow::Result<OlsFit> {
    ols::fit(&design.select_terms(terms), y, tolerance)
}

/// Clamps `value` to zero when it does not exceed `floor`; negative round-off included.
fn zero_below(value: f64, floor: f64) -> f64 {
    if value <= floor { 0.0 } else { value }
}

/// F statistic and upper-tail p-value.
///
/// `None` for effects without degrees of freedom and when both the effect and the residual
/// sums of squares are zero. A positive effect over a zero residual gives an infinite F.
fn f_test(
    sum_sq: f64,
    df: usize,
    scale: f64,
    df_resid: usize,
) -> anyhow::Result<(Option<f64>, Option<f64>)> {
    if df == 0 {
        return Ok((None, None));
    }
    if scale == 0.0 {
        if sum_sq == 0.0 {
            return Ok((None, None));
        }
        return Ok((Some(f64::INFINITY), Some(0.0)));
    }

    let f = (sum_sq / df as f64) / scale;
    let dist = FisherSnedecor::new(df as f64, df_resid as f64).map_err(|e| {
        anyhow::anyhow!("F distribution with df ({}, {}): {}", df, df_resid, e)
    })?;
    Ok((Some(f), Some(dist.sf(f).clamp(0.0, 1.0))))
}
