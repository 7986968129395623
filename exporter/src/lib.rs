pub mod cli;
pub mod env;
pub mod error;
pub mod export;
