pub mod app;
pub mod config;
pub mod input_manager;
pub mod time_manager;
