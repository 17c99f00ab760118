pub mod document;
pub mod loaders;
pub mod position;
pub mod progress;
pub mod signature;

pub use document::{Document, PageSize, Recipient, SigningRequest};
pub use loaders::{load_job_file, load_protected_regions, SigningJobFile};
pub use position::{ProtectedRegion, Rect, SignaturePosition};
pub use progress::{BatchOutcome, BatchProgress, JobState, RecipientError};
pub use signature::Signature;
