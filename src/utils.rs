pub mod command;
pub mod config;
pub mod interfaces;
pub mod logging;
pub mod pipewire;
pub mod runner;
pub mod targets;

#[cfg(test)]
pub(crate) mod testing;
