pub mod api;
pub mod client;
pub mod error;
pub mod model;
pub mod redis;
