pub mod model;
pub mod service;

pub use model::{CategoryLayout, TaskCategory};
pub use service::CredentialPool;
