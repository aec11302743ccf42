//! Installer and configurator for Spotify and the spicetify customization CLI.
//!
//! All client state lives in spicetify's own config store; this crate reads and
//! writes it by running `spicetify config` and never keeps a copy.

pub mod app;
pub mod apply;
pub mod cli;
pub mod client;
pub mod config_list;
pub mod error;
pub mod invoker;
pub mod menu;
pub mod paths;
pub mod release;
pub mod session;
pub mod settings;
pub mod ui;
