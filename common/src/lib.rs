pub mod config;
pub mod envelope;
pub mod models;
pub mod session;
pub mod utils;

pub use config::*;
pub use envelope::*;
pub use utils::*;
