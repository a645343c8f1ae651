pub mod config;
pub mod error;
pub mod logging;
pub mod types;

pub use error::{AencError, AencResult};
pub use types::{CipherSuite, KeyMode, Stage};
