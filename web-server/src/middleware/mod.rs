pub mod token_gate;

pub use token_gate::TokenGate;
