pub mod app;
pub mod canvas;
pub mod catalog;
pub mod chat;
pub mod collection;
pub mod config;
pub mod intent;
pub mod progress;
pub mod shared;
pub mod status;
