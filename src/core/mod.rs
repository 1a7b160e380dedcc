pub mod calculator;
pub mod cart;
pub mod form;
pub mod schema;
pub mod slug;
pub mod submission;

pub use calculator::{EstimateCalculator, EstimateView};
pub use cart::{CartEvent, CartStore, CartSubscription};
pub use form::EstimateForm;
pub use schema::{InputSchemaResolver, ResolvedInputs};
pub use slug::SlugNormalizer;
pub use submission::{CartSubmission, SubmitNotice};
