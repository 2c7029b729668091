//! # single-anova
//!
//! Two-way analysis of variance of single-cell gene expression, part of the single-rust
//! ecosystem.
//!
//! For one gene, this crate pulls the expression column out of an annotated expression
//! dataset (preferring the raw view over the processed one), joins it with two categorical
//! observation metadata columns such as diet and genotype, fits an ordinary least squares
//! model with both main effects and their interaction, and reports a type-II ANOVA table.
//!
//! ## Core Features
//!
//! - **Expression Views**: Dense (`ndarray`) and sparse (`CsrMatrix`/`CscMatrix` from
//!   nalgebra-sparse) storage behind the [`data::ExpressionSource`] trait
//! - **Typed Models**: [`modeling::formula::ModelSpec`] instead of formula strings, so any
//!   factor name is safe
//! - **Type-II ANOVA**: Sums of squares, degrees of freedom, F statistics and p-values
//!
//! ## Quick Start
//!
//! Build an [`data::AnnotatedExpression`] from your views and metadata, then call
//! [`analysis::two_way_anova`]. A gene that is in neither view yields `Ok(None)` and a
//! `log` warning.
//!
//! ## Module Organization
//!
//! - **[`data`]**: Expression views, observation metadata and categorical factors
//! - **[`analysis`]**: Gene extraction, table assembly and the two-way ANOVA entry point
//! - **[`modeling`]**: Model specification, design matrices, least squares and ANOVA
//! - **[`error`]**: The [`AnovaError`] taxonomy

pub mod analysis;
pub mod data;
pub mod error;
pub mod modeling;

pub use analysis::{AnalysisRequest, run_two_way_anova, two_way_anova};
pub use error::AnovaError;
pub use modeling::{AnovaConfig, AnovaRow, AnovaTable, AnovaTerm, MissingPolicy};
