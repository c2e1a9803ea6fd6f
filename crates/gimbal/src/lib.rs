pub mod command;
pub mod config;
pub mod controller;
pub mod interpret;
pub mod state;
pub mod task;

pub use command::*;
pub use config::*;
pub use controller::*;
pub use interpret::*;
pub use state::*;
pub use task::*;
