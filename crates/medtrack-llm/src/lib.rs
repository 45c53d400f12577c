//! Patient name extraction for uploaded medical documents.
//!
//! This crate sends a document image (or PDF) to a hosted multimodal model
//! with a fixed instruction and a structured-output schema, and turns the
//! reply into a tagged [`NameExtraction`].

pub mod client;
pub mod extraction;
pub mod prompts;

pub use client::*;
pub use extraction::*;
pub use prompts::*;
