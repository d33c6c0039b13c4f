pub mod handlers;
pub mod languages;
pub mod models;
pub mod orchestrator;
pub mod prompts;
pub mod service;
pub mod view;
