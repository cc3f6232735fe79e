mod config;
mod constants;
mod data;
mod db;
mod report;
mod stats;

pub use config::*;
pub use constants::*;
pub use data::*;
pub use db::*;
pub use report::*;
pub use stats::*;
