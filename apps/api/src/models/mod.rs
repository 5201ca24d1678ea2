pub mod history;
pub mod resource;
