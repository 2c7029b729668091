//! Gene-indexed expression storage.
//!
//! Both implementations store observations (cells) in rows and genes in columns, the AnnData
//! orientation, and hand out one gene's column as a dense `f64` vector in observation order.

use std::collections::HashMap;

use nalgebra_sparse::{CscMatrix, CsrMatrix};
use ndarray::Array2;
use single_utilities::traits::FloatOpsTS;

/// A view of an expression matrix that can be queried gene by gene.
pub trait ExpressionSource: Send + Sync {
    /// Number of observations (rows)
    fn n_obs(&self) -> usize;

    /// Observation identifiers, if the view carries them
    fn obs_names(&self) -> Option<&[String]>;

    /// Column position of `gene`, or `None` if the view does not contain it
    fn gene_index(&self, gene: &str) -> Option<usize>;

    /// Expression of the gene at column `gene_idx`, one value per observation.
    fn column(&self, gene_idx: usize) -> anyhow::Result<Vec<f64>>;

    fn contains_gene(&self, gene: &str) -> bool {
        self.gene_index(gene).is_some()
    }

    /// Look the gene up by name and extract its column.
    ///
    /// Returns `Ok(None)` when the gene is not part of this view.
    fn gene_expression(&self, gene: &str) -> anyhow::Result<Option<Vec<f64>>> {
        match self.gene_index(gene) {
            Some(idx) => self.column(idx).map(Some),
            None => Ok(None),
        }
    }
}

/// Gene name to column lookup shared by the storage types.
#[derive(Debug, Clone)]
struct GeneIndex {
    positions: HashMap<String, usize>,
}

impl GeneIndex {
    fn new(names: Vec<String>) -> anyhow::Result<Self> {
        let mut positions = HashMap::with_capacity(names.len());
        for (idx, name) in names.iter().enumerate() {
            if positions.insert(name.clone(), idx).is_some() {
                return Err(anyhow::anyhow!("Duplicate gene name {:?} in var names", name));
            }
        }
        Ok(GeneIndex { positions })
    }

    fn get(&self, gene: &str) -> Option<usize> {
        self.positions.get(gene).copied()
    }

    fn len(&self) -> usize {
        self.positions.len()
    }
}

fn check_obs_names(names: &[String], n_obs: usize) -> anyhow::Result<()> {
    if names.len() != n_obs {
        return Err(anyhow::anyhow!(
            "Got {} observation names for a matrix with {} rows",
            names.len(),
            n_obs
        ));
    }
    Ok(())
}

fn widen<T: FloatOpsTS>(value: T, obs: usize) -> anyhow::Result<f64> {
    num_traits::cast::<T, f64>(value)
        .ok_or_else(|| anyhow::anyhow!("Expression value in row {} is not representable as f64", obs))
}

/// Dense observations x genes matrix.
#[derive(Debug, Clone)]
pub struct DenseExpression<T> {
    matrix: Array2<T>,
    genes: GeneIndex,
    obs_names: Option<Vec<String>>,
}

impl<T> DenseExpression<T>
where
    T: FloatOpsTS,
{
    pub fn new(matrix: Array2<T>, var_names: Vec<String>) -> anyhow::Result<Self> {
        if matrix.ncols() != var_names.len() {
            return Err(anyhow::anyhow!(
                "Matrix has {} columns but {} var names were given",
                matrix.ncols(),
                var_names.len()
            ));
        }
        Ok(DenseExpression {
            matrix,
            genes: GeneIndex::new(var_names)?,
            obs_names: None,
        })
    }

    pub fn with_obs_names(mut self, obs_names: Vec<String>) -> anyhow::Result<Self> {
        check_obs_names(&obs_names, self.matrix.nrows())?;
        self.obs_names = Some(obs_names);
        Ok(self)
    }
}

impl<T> ExpressionSource for DenseExpression<T>
where
    T: FloatOpsTS,
{
    fn n_obs(&self) -> usize {
        self.matrix.nrows()
    }

    fn obs_names(&self) -> Option<&[String]> {
        self.obs_names.as_deref()
    }

    fn gene_index(&self, gene: &str) -> Option<usize> {
        self.genes.get(gene)
    }

    fn column(&self, gene_idx: usize) -> anyhow::Result<Vec<f64>> {
        if gene_idx >= self.matrix.ncols() {
            return Err(anyhow::anyhow!("Gene index {} out of bounds", gene_idx));
        }
        self.matrix
            .column(gene_idx)
            .iter()
            .enumerate()
            .map(|(obs, &value)| widen(value, obs))
            .collect()
    }
}

#[derive(Debug, Clone)]
enum SparseStorage<T> {
    Csr(CsrMatrix<T>),
    Csc(CscMatrix<T>),
}

/// Sparse observations x genes matrix in either compressed layout.
///
/// Column extraction is cheapest for CSC; CSR does one lookup per observation.
#[derive(Debug, Clone)]
pub struct SparseExpression<T> {
    storage: SparseStorage<T>,
    genes: GeneIndex,
    obs_names: Option<Vec<String>>,
}

impl<T> SparseExpression<T>
where
    T: FloatOpsTS,
{
    pub fn from_csr(matrix: CsrMatrix<T>, var_names: Vec<String>) -> anyhow::Result<Self> {
        Self::build(SparseStorage::Csr(matrix), var_names)
    }

    pub fn from_csc(matrix: CscMatrix<T>, var_names: Vec<String>) -> anyhow::Result<Self> {
        Self::build(SparseStorage::Csc(matrix), var_names)
    }

    fn build(storage: SparseStorage<T>, var_names: Vec<String>) -> anyhow::Result<Self> {
        let ncols = match &storage {
            SparseStorage::Csr(m) => m.ncols(),
            SparseStorage::Csc(m) => m.ncols(),
        };
        if ncols != var_names.len() {
            return Err(anyhow::anyhow!(
                "Matrix has {} columns but {} var names were given",
                ncols,
                var_names.len()
            ));
        }
        Ok(SparseExpression {
            storage,
            genes: GeneIndex::new(var_names)?,
            obs_names: None,
        })
    }

    pub fn with_obs_names(mut self, obs_names: Vec<String>) -> anyhow::Result<Self> {
        check_obs_names(&obs_names, self.n_obs())?;
        self.obs_names = Some(obs_names);
        Ok(self)
    }
}

impl<T> ExpressionSource for SparseExpression<T>
where
    T: FloatOpsTS,
{
    fn n_obs(&self) -> usize {
        match &self.storage {
            SparseStorage::Csr(m) => m.nrows(),
            SparseStorage::Csc(m) => m.nrows(),
        }
    }

    fn obs_names(&self) -> Option<&[String]> {
        self.obs_names.as_deref()
    }

    fn gene_index(&self, gene: &str) -> Option<usize> {
        self.genes.get(gene)
    }

    fn column(&self, gene_idx: usize) -> anyhow::Result<Vec<f64>> {
        if gene_idx >= self.genes.len() {
            return Err(anyhow::anyhow!("Gene index {} out of bounds", gene_idx));
        }

        let mut values = vec![0.0; self.n_obs()];
        match &self.storage {
            SparseStorage::Csc(matrix) => {
                let col = matrix.col(gene_idx);
                for (&row, &value) in col.row_indices().iter().zip(col.values()) {
                    values[row] = widen(value, row)?;
                }
            }
            SparseStorage::Csr(matrix) => {
                for (row, slot) in values.iter_mut().enumerate() {
                    if let Some(entry) = matrix.get_entry(row, gene_idx) {
                        *slot = widen(entry.into_value(), row)?;
                    }
                }
            }
        }
        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra_sparse::CooMatrix;
    use ndarray::array;

    fn genes(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn create_test_coo() -> CooMatrix<f64> {
        // 4 cells x 3 genes, gene 1 is all zeros
        let rows = vec![0, 1, 3, 0, 2];
        let cols = vec![0, 0, 0, 2, 2];
        let vals = vec![1.5, 2.0, 4.0, 7.0, 9.0];
        CooMatrix::try_from_triplets(4, 3, rows, cols, vals).unwrap()
    }

    #[test]
    fn test_dense_column_extraction() {
        let matrix = array![[1.0_f64, 2.0], [3.0, 4.0], [5.0, 6.0]];
        let dense = DenseExpression::new(matrix, genes(&["Muc2", "Reg4"])).unwrap();

        assert_eq!(dense.n_obs(), 3);
        assert!(dense.contains_gene("Reg4"));
        assert!(!dense.contains_gene("Lyz1"));
        assert_eq!(dense.gene_expression("Reg4").unwrap(), Some(vec![2.0, 4.0, 6.0]));
        assert_eq!(dense.gene_expression("Lyz1").unwrap(), None);
    }

    #[test]
    fn test_sparse_layouts_agree() {
        let coo = create_test_coo();
        let names = genes(&["Muc2", "Zero", "Tff3"]);
        let csr = SparseExpression::from_csr(CsrMatrix::from(&coo), names.clone()).unwrap();
        let csc = SparseExpression::from_csc(CscMatrix::from(&coo), names).unwrap();

        for gene in ["Muc2", "Zero", "Tff3"] {
            assert_eq!(
                csr.gene_expression(gene).unwrap(),
                csc.gene_expression(gene).unwrap()
            );
        }
        assert_eq!(csc.gene_expression("Muc2").unwrap(), Some(vec![1.5, 2.0, 0.0, 4.0]));
        assert_eq!(csr.gene_expression("Zero").unwrap(), Some(vec![0.0; 4]));
    }

    #[test]
    fn test_f32_values_are_widened() {
        let matrix = array![[0.5_f32], [1.25]];
        let dense = DenseExpression::new(matrix, genes(&["Muc2"])).unwrap();
        assert_eq!(dense.column(0).unwrap(), vec![0.5, 1.25]);
    }

    #[test]
    fn test_construction_errors() {
        let matrix = array![[1.0_f64, 2.0]];
        assert!(DenseExpression::new(matrix.clone(), genes(&["Muc2"])).is_err());
        assert!(DenseExpression::new(matrix.clone(), genes(&["Muc2", "Muc2"])).is_err());

        let dense = DenseExpression::new(matrix, genes(&["Muc2", "Reg4"])).unwrap();
        assert!(dense.clone().with_obs_names(genes(&["c1", "c2"])).is_err());
        let named = dense.with_obs_names(genes(&["c1"])).unwrap();
        assert_eq!(named.obs_names(), Some(&["c1".to_string()][..]));
        assert!(named.column(5).is_err());
    }
}
