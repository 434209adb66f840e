#![forbid(unsafe_code)]

pub mod app;
pub mod assemble;
pub mod cli;
pub mod commands;
pub mod config;
pub mod formats;
pub mod logging;
pub mod openai;
pub mod orchestrator;
pub mod parse;
pub mod pipeline;
pub mod prompt;
pub mod quiz;
pub mod retry;
pub mod source;
pub mod wikipedia;
