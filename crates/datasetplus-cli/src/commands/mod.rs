pub mod config;
pub mod download;
pub mod extract;
pub mod info;
pub mod process;
