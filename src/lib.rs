pub mod app;
pub mod board;
pub mod cli;
pub mod db;
pub mod form;
pub mod keybindings;
pub mod logging;
pub mod realm;
pub mod settings;
pub mod store;
pub mod types;
pub mod ui;
