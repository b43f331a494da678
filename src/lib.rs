pub mod controller;
pub mod types;
pub mod utils;

pub use controller::{Controller, TaskHandle};
pub use types::error::{Error, Result};
