//! Observation metadata and categorical factors.

use std::collections::BTreeSet;

use crate::error::AnovaError;

/// One column of observation metadata.
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataColumn {
    /// Pandas-style categorical: `codes[i]` indexes `categories`, `-1` marks a missing value
    Categorical {
        categories: Vec<String>,
        codes: Vec<i32>,
    },
    Text(Vec<Option<String>>),
    Integer(Vec<Option<i64>>),
    Boolean(Vec<Option<bool>>),
}

impl MetadataColumn {
    /// Build a categorical column from labels, with categories in sorted order.
    pub fn categorical<S: AsRef<str>>(labels: &[S]) -> Self {
        let categories: Vec<String> = labels
            .iter()
            .map(|l| l.as_ref().to_string())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let codes = labels
            .iter()
            .map(|l| {
                categories
                    .binary_search_by(|c| c.as_str().cmp(l.as_ref()))
                    .map(|idx| idx as i32)
                    .unwrap_or(-1)
            })
            .collect();
        MetadataColumn::Categorical { categories, codes }
    }

    pub fn len(&self) -> usize {
        match self {
            MetadataColumn::Categorical { codes, .. } => codes.len(),
            MetadataColumn::Text(v) => v.len(),
            MetadataColumn::Integer(v) => v.len(),
            MetadataColumn::Boolean(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Interpret the column as a categorical factor.
    ///
    /// Categorical columns keep their declared category order; other kinds order levels by
    /// value. Levels that no observation uses are dropped, so every level of the returned
    /// factor is observed at least once.
    pub fn to_factor(&self, name: &str) -> anyhow::Result<Factor> {
        match self {
            MetadataColumn::Categorical { categories, codes } => {
                let mut used = vec![false; categories.len()];
                for (row, &code) in codes.iter().enumerate() {
                    match code {
                        -1 => {}
                        c if c >= 0 && (c as usize) < categories.len() => used[c as usize] = true,
                        c => {
                            return Err(anyhow::anyhow!(
                                "Column {:?} row {}: code {} outside of {} categories",
                                name,
                                row,
                                c,
                                categories.len()
                            ));
                        }
                    }
                }

                let mut remap = vec![None; categories.len()];
                let mut levels = Vec::new();
                for (idx, category) in categories.iter().enumerate() {
                    if used[idx] {
                        remap[idx] = Some(levels.len());
                        levels.push(category.clone());
                    }
                }
                let codes = codes
                    .iter()
                    .map(|&c| if c < 0 { None } else { remap[c as usize] })
                    .collect();
                Ok(Factor::new(name, levels, codes))
            }
            MetadataColumn::Text(values) => Ok(Factor::from_ordered(name, values, |s| s.clone())),
            MetadataColumn::Integer(values) => {
                Ok(Factor::from_ordered(name, values, |v| v.to_string()))
            }
            MetadataColumn::Boolean(values) => {
                Ok(Factor::from_ordered(name, values, |v| v.to_string()))
            }
        }
    }
}

/// A categorical variable: observed levels plus one optional level code per observation.
#[derive(Debug, Clone, PartialEq)]
pub struct Factor {
    name: String,
    levels: Vec<String>,
    codes: Vec<Option<usize>>,
}

impl Factor {
    fn new(name: &str, levels: Vec<String>, codes: Vec<Option<usize>>) -> Self {
        Factor {
            name: name.to_string(),
            levels,
            codes,
        }
    }

    /// Levels sorted by `Ord` on the raw values, not on their labels, so `2 < 10`.
    fn from_ordered<V, F>(name: &str, values: &[Option<V>], label: F) -> Self
    where
        V: Ord + Clone,
        F: Fn(&V) -> String,
    {
        let distinct: Vec<V> = values
            .iter()
            .flatten()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let codes = values
            .iter()
            .map(|v| v.as_ref().and_then(|v| distinct.binary_search(v).ok()))
            .collect();
        let levels = distinct.iter().map(label).collect();
        Factor::new(name, levels, codes)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn levels(&self) -> &[String] {
        &self.levels
    }

    pub fn n_levels(&self) -> usize {
        self.levels.len()
    }

    pub fn codes(&self) -> &[Option<usize>] {
        &self.codes
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Label of observation `row`, `None` when missing
    pub fn level_of(&self, row: usize) -> Option<&str> {
        self.codes
            .get(row)
            .copied()
            .flatten()
            .map(|c| self.levels[c].as_str())
    }

    /// Keep only the given rows (in the given order), dropping levels that become unused.
    pub fn subset(&self, rows: &[usize]) -> Factor {
        let mut used = vec![false; self.levels.len()];
        for &row in rows {
            if let Some(c) = self.codes[row] {
                used[c] = true;
            }
        }
        let mut remap = vec![None; self.levels.len()];
        let mut levels = Vec::new();
        for (idx, level) in self.levels.iter().enumerate() {
            if used[idx] {
                remap[idx] = Some(levels.len());
                levels.push(level.clone());
            }
        }
        let codes = rows
            .iter()
            .map(|&row| self.codes[row].and_then(|c| remap[c]))
            .collect();
        Factor::new(&self.name, levels, codes)
    }
}

/// Observation-level annotations, row-aligned with the expression views.
#[derive(Debug, Clone, Default)]
pub struct ObservationMetadata {
    n_obs: usize,
    obs_names: Option<Vec<String>>,
    columns: Vec<(String, MetadataColumn)>,
}

impl ObservationMetadata {
    pub fn new(n_obs: usize) -> Self {
        ObservationMetadata {
            n_obs,
            obs_names: None,
            columns: Vec::new(),
        }
    }

    pub fn with_obs_names(mut self, obs_names: Vec<String>) -> anyhow::Result<Self> {
        if obs_names.len() != self.n_obs {
            return Err(anyhow::anyhow!(
                "Got {} observation names for metadata with {} observations",
                obs_names.len(),
                self.n_obs
            ));
        }
        self.obs_names = Some(obs_names);
        Ok(self)
    }

    /// Add a column, replacing any existing column of the same name.
    pub fn with_column(mut self, name: &str, column: MetadataColumn) -> anyhow::Result<Self> {
        if column.len() != self.n_obs {
            return Err(anyhow::anyhow!(
                "Column {:?} has {} values but metadata has {} observations",
                name,
                column.len(),
                self.n_obs
            ));
        }
        match self.columns.iter().position(|(n, _)| n == name) {
            Some(idx) => self.columns[idx].1 = column,
            None => self.columns.push((name.to_string(), column)),
        }
        Ok(self)
    }

    pub fn n_obs(&self) -> usize {
        self.n_obs
    }

    pub fn obs_names(&self) -> Option<&[String]> {
        self.obs_names.as_deref()
    }

    pub fn column(&self, name: &str) -> anyhow::Result<&MetadataColumn> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, c)| c)
            .ok_or_else(|| AnovaError::MissingFactorColumn(name.to_string()).into())
    }

    pub fn factor(&self, name: &str) -> anyhow::Result<Factor> {
        self.column(name)?.to_factor(name)
    }
}
