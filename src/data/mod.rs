//! Annotated expression data consumed by the analysis.
//!
//! An [`AnnotatedExpression`] borrows up to two expression views and the observation metadata
//! they are row-aligned with, much like an AnnData object with `.X`, `.raw` and `.obs`.

use std::fmt;

mod metadata;
mod source;

pub use metadata::{Factor, MetadataColumn, ObservationMetadata};
pub use source::{DenseExpression, ExpressionSource, SparseExpression};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewKind {
    /// Unprocessed counts kept alongside the processed matrix
    Raw,
    /// The processed matrix
    Primary,
}

impl fmt::Display for ViewKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewKind::Raw => write!(f, "raw"),
            ViewKind::Primary => write!(f, "primary"),
        }
    }
}

pub struct AnnotatedExpression<'a> {
    primary: &'a dyn ExpressionSource,
    raw: Option<&'a dyn ExpressionSource>,
    obs: &'a ObservationMetadata,
}

impl<'a> AnnotatedExpression<'a> {
    pub fn new(primary: &'a dyn ExpressionSource, obs: &'a ObservationMetadata) -> Self {
        AnnotatedExpression {
            primary,
            raw: None,
            obs,
        }
    }

    pub fn with_raw(mut self, raw: &'a dyn ExpressionSource) -> Self {
        self.raw = Some(raw);
        self
    }

    pub fn obs(&self) -> &'a ObservationMetadata {
        self.obs
    }

    /// The available views in lookup precedence order: raw first, then primary.
    pub fn sources(&self) -> Vec<(ViewKind, &'a dyn ExpressionSource)> {
        let mut sources = Vec::with_capacity(2);
        if let Some(raw) = self.raw {
            sources.push((ViewKind::Raw, raw));
        }
        sources.push((ViewKind::Primary, self.primary));
        sources
    }
}
