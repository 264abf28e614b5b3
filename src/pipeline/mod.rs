// Ingestion pipeline: masking, validation, transform, batch persistence and the poll loop

pub mod masking;
pub mod persist;
pub mod poll;
pub mod transform;
pub mod validate;

pub use masking::mask;
pub use persist::SqliteStore;
pub use poll::{PollController, PollState};
pub use transform::{process_message, transform};
pub use validate::validate;
