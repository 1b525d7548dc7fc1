pub mod backend;
pub mod cli;
pub mod color;
pub mod config;
pub mod export;
pub mod logging;
pub mod media;
pub mod picker;
pub mod region;
pub mod selection;
pub mod session;
pub mod trim;
pub mod tui;
