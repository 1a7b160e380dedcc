pub mod estimator;
pub mod session;

pub use estimator::Estimator;
pub use session::EstimationSession;
