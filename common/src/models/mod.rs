pub mod detection;
pub mod session;
