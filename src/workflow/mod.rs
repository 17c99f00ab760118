pub mod recipient_ctx;
pub mod recipient_flow;

pub use recipient_ctx::{idempotency_key, RecipientCtx};
pub use recipient_flow::{RecipientFlow, RecipientOutcome};
