pub mod config;
pub mod retrieve;
pub mod steps;
