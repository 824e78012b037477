pub mod cache;
pub mod error;
pub mod source;
pub mod synthetic;
