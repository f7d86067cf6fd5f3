//! Terminal client for the Solar Buddy question/answer service.

pub mod ask_client;
pub mod cli;
pub mod config;
