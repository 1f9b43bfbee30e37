pub mod config;
pub mod deploy;
pub mod domain;
pub mod errors;

pub use deploy::{DeploymentTarget, DeploymentTrigger};
pub use domain::gift::{ConversationStep, Gift, GiftState};
pub use errors::{ApplicationError, DomainError, InterfaceError};
