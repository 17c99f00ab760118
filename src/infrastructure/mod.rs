pub mod job_registry;
pub mod preview;
pub mod signer;

pub use job_registry::{JobGuard, JobInfo, JobRegistry};
pub use preview::{PreviewArtifact, PreviewRenderer};
pub use signer::{DryRunSigner, SignBackend, SignOneRequest};
