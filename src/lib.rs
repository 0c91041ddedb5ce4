//! Vietgate - Vietnamese Translation/Transcription Gateway
//!
//! A small gateway that accepts Vietnamese text or audio, decides whether
//! processing is worthwhile, forwards worthwhile payloads to an external
//! LLM or speech-to-text provider, and normalizes the provider's response.

pub mod cli;
pub mod config;
pub mod error;
pub mod gate;
pub mod sanitize;
pub mod server;
pub mod transcribe;
pub mod translate;
