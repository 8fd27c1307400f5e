pub mod config;
pub mod protocol;
mod server;

pub use config::*;
pub use server::*;
