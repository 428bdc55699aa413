//! Application contracts
//!
//! Status gates return `SdError::InvalidTransition`; input contracts return
//! field errors.

mod create;
mod status;
mod update;
mod workflow;

pub use create::CreateApplicationContract;
pub use status::{
    can_transition, ensure_assignable, ensure_editable, ensure_in_progress, ensure_transition,
};
pub use update::UpdateApplicationContract;
pub use workflow::{
    Assignment, AssignmentContract, CompletionContract, DeadlineExtension,
    DeadlineExtensionContract, StatusChange, StatusChangeContract, REJECTION_REQUIRES_COMMENT,
};
