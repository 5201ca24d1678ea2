pub mod diff;
pub mod editor;
pub mod handlers;
pub mod store;

pub use diff::{is_reserved_key, record_creation, record_update};
