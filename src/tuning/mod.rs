//! Hyperparameter tuning
//!
//! A [`ParameterGrid`] lists candidate values per parameter; [`GridSearchCV`]
//! cross-validates every combination and refits the winner.

mod grid;
mod search;

pub use grid::{
    bool_param, float_param, format_params, string_param, usize_param, GridParameter, ParameterGrid,
    ParameterValue, TrialParams,
};
pub use search::{GridSearchCV, ModelBuilder, Scoring, SearchSummary, TrialResult, TunedModel};
