pub mod position_optimizer;
pub mod retry_policy;
pub mod validator;

pub use position_optimizer::optimize_position;
pub use retry_policy::{Backoff, RetryPolicy};
pub use validator::{validate_signature_file, validate_signing_form, ValidationResult, ValidationRules};
