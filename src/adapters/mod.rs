//! Device adapters and the command vocabulary shared with hosts

pub mod receiver;
pub mod traits;

pub use receiver::ReceiverAdapter;
pub use traits::{AdapterCommand, AdapterCommandResponse, AdapterContext};
