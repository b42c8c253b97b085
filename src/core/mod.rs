pub mod app;
pub mod attachment;
pub mod config;
pub mod constants;
pub mod conversation;
pub mod payload;
pub mod request;
pub mod typewriter;
