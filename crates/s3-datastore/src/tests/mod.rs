pub mod common;
pub mod store;
