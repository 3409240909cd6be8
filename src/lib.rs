pub mod api;
pub mod board;
pub mod config;
pub mod coordinator;
pub mod deletion;
pub mod drag;
pub mod engine;
pub mod handlers;
pub mod model;
pub mod notify;
pub mod store;
pub mod timer;
