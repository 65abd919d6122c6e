pub mod config;
pub mod error;
pub mod freezer;
pub mod intent;
pub mod ir;
pub mod models;
pub mod pipeline;
pub mod progress;
pub mod quality;
pub mod sentinels;
pub mod structure;
pub mod terminology;

pub use error::TranslateError;
