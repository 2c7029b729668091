//! Ordinary least squares through the singular value decomposition.

use nalgebra::{DMatrix, DVector};

#[derive(Debug, Clone)]
pub struct OlsFit {
    pub coefficients: DVector<f64>,
    /// Residual sum of squares
    pub rss: f64,
    /// Numerical rank of the design
    pub rank: usize,
    pub n_obs: usize,
    pub n_params: usize,
}

impl OlsFit {
    pub fn df_resid(&self) -> usize {
        self.n_obs.saturating_sub(self.rank)
    }

    pub fn is_full_rank(&self) -> bool {
        self.rank == self.n_params
    }
}

/// Default tolerance below which a singular value counts as zero.
pub fn default_rank_tolerance(design: &DMatrix<f64>, singular_values: &DVector<f64>) -> f64 {
    let max_sv = if singular_values.is_empty() {
        0.0
    } else {
        singular_values.max()
    };
    max_sv * design.nrows().max(design.ncols()) as f64 * f64::EPSILON
}

/// Fit `response ~ design` by least squares.
///
/// Rank-deficient designs are solved with the pseudo-inverse (minimum-norm coefficients);
/// callers that need estimable terms check [`OlsFit::is_full_rank`].
pub fn fit(
    design: &DMatrix<f64>,
    response: &DVector<f64>,
    rank_tolerance: Option<f64>,
) -> anyhow::Result<OlsFit> {
    let n_obs = design.nrows();
    let n_params = design.ncols();
    if response.len() != n_obs {
        return Err(anyhow::anyhow!(
            "Response has {} values but the design has {} rows",
            response.len(),
            n_obs
        ));
    }
    if let Some(tolerance) = rank_tolerance {
        if tolerance.is_nan() || tolerance < 0.0 {
            return Err(anyhow::anyhow!(
                "Rank tolerance must be a non-negative number, got {}",
                tolerance
            ));
        }
    }

    if n_params == 0 {
        return Ok(OlsFit {
            coefficients: DVector::zeros(0),
            rss: response.norm_squared(),
            rank: 0,
            n_obs,
            n_params,
        });
    }

    let svd = design.clone().svd(true, true);
    let tolerance =
        rank_tolerance.unwrap_or_else(|| default_rank_tolerance(design, &svd.singular_values));
    let rank = svd.rank(tolerance);
    let coefficients = svd
        .solve(response, tolerance)
        .map_err(|e| anyhow::anyhow!("Least squares solve failed: {}", e))?;

    let residuals = response - design * &coefficients;

    Ok(OlsFit {
        coefficients,
        rss: residuals.norm_squared(),
        rank,
        n_obs,
        n_params,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_simple_line() {
        // y = 1 + 2x exactly
        let design = DMatrix::from_row_slice(4, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0, 1.0, 3.0]);
        let y = DVector::from_vec(vec![1.0, 3.0, 5.0, 7.0]);
        let fit = fit(&design, &y, None).unwrap();

        assert_eq!(fit.rank, 2);
        assert!(fit.is_full_rank());
        assert_eq!(fit.df_resid(), 2);
        assert_abs_diff_eq!(fit.coefficients[0], 1.0, epsilon = 1e-10);
        assert_abs_diff_eq!(fit.coefficients[1], 2.0, epsilon = 1e-10);
        assert_abs_diff_eq!(fit.rss, 0.0, epsilon = 1e-10);
    }

    #[test]
    fn test_intercept_only_rss_is_total_ss() {
        let design = DMatrix::from_element(4, 1, 1.0);
        let y = DVector::from_vec(vec![2.0, 4.0, 6.0, 8.0]);
        let fit = fit(&design, &y, None).unwrap();
        // mean 5, deviations -3 -1 1 3
        assert_abs_diff_eq!(fit.coefficients[0], 5.0, epsilon = 1e-10);
        assert_abs_diff_eq!(fit.rss, 20.0, epsilon = 1e-10);
    }

    #[test]
    fn test_collinear_columns_reduce_rank() {
        let design = DMatrix::from_row_slice(3, 3, &[1.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0, 0.0, 1.0]);
        let y = DVector::from_vec(vec![1.0, 2.0, 3.0]);
        let fit = fit(&design, &y, None).unwrap();
        assert_eq!(fit.rank, 2);
        assert!(!fit.is_full_rank());
        // first two rows share a fitted value of 1.5
        assert_abs_diff_eq!(fit.rss, 0.5, epsilon = 1e-10);
    }

    #[test]
    fn test_invalid_tolerance_is_an_error() {
        let design = DMatrix::from_element(3, 1, 1.0);
        let y = DVector::from_vec(vec![1.0, 2.0, 3.0]);
        assert!(fit(&design, &y, Some(-1.0)).is_err());
        assert!(fit(&design, &y, Some(f64::NAN)).is_err());
        assert_eq!(fit(&design, &y, Some(0.0)).unwrap().rank, 1);
    }

    #[test]
    fn test_length_mismatch() {
        let design = DMatrix::from_element(3, 1, 1.0);
        let y = DVector::from_vec(vec![1.0, 2.0]);
        assert!(fit(&design, &y, None).is_err());
    }
}
