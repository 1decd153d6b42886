pub mod audit;
pub mod bulk;
pub mod error;
pub mod matching;
pub mod services;
pub mod store;
pub mod workflow;

// Re-export commonly used types for convenience.
pub use error::{CoreError, CoreResult};
pub use matching::{DuplicateCandidate, MatchMethod};
pub use services::{FaqPatch, FaqService, NewFaqInput};
pub use store::{
    AppConfig, Brand, ChangeType, Channel, Environment, Faq, FaqStore, FaqVersion,
    PublishRequest, PublishTarget, RequestStatus, Role, User,
};
