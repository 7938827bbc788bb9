pub mod aggregate;
pub mod clipboard;
pub mod config;
pub mod diagram;
pub mod error;
pub mod log;
pub mod markdown;
pub mod model;
pub mod nav;
pub mod present;
pub mod sanitize;
pub mod service;
pub mod templates;
pub mod util;

// Decoupled game loop architecture
pub mod app;
pub mod render;
pub mod tea;
pub mod ui;

pub use error::{Error, Result};
