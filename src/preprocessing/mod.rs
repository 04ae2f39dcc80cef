//! Data preprocessing module
//!
//! Stratified train/test splitting and feature scaling. Scalers are fit on the
//! training split only and then applied to both sides.

mod scaler;
mod split;

pub use scaler::{Scaler, ScalerType};
pub use split::{stratified_split_indices, train_test_split, SplitIndices};
