// TabSync shared type definitions
// Each submodule defines types used across the application.

pub mod command;
pub mod config;
pub mod device;
pub mod errors;
pub mod settings;
pub mod tab;
