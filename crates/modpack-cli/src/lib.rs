//! Command-line front end for the modpack loader.

pub mod cli;
