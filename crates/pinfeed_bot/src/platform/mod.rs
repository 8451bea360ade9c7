mod app;
mod config;
mod delivery;
mod logging;

pub use app::run_app;
