pub mod api;
pub mod common;
pub mod gallery;
pub mod output;
pub mod workflow;
