pub mod config;
pub mod error;
pub mod interface;
pub mod pipewire;
pub mod process;
