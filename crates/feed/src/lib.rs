pub mod config;
pub mod pose;
pub mod task;

pub use config::*;
pub use pose::*;
pub use task::*;
