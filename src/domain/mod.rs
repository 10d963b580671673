pub mod hooks;
pub mod models;
pub mod scope;
pub mod scoring;
