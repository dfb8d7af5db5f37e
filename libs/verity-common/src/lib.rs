pub mod config;
pub mod display;
pub mod messages;
pub mod testplan;
pub mod types;
pub mod value;
