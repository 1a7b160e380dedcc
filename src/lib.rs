pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::TomlConfig;

pub use adapters::{ApiClient, LocalStorage, MemoryStorage};
pub use app::{EstimationSession, Estimator};
pub use core::{
    CartEvent, CartStore, CartSubmission, EstimateCalculator, EstimateForm, EstimateView,
    InputSchemaResolver, ResolvedInputs, SlugNormalizer, SubmitNotice,
};
pub use domain::model::{CartItem, ContactForm, EstimateResult, ParameterSet};
pub use utils::error::{EstimatorError, Result};
