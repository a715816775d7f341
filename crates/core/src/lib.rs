pub mod config;
pub mod error;
pub mod format;
pub mod summary;

pub use config::Config;
pub use error::*;
pub use summary::*;
