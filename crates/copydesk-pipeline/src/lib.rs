//! Prompt pipeline for generating marketing copy through hosted LLM edge
//! functions.
//!
//! [`Pipeline::run`] takes a validated [`copydesk_core::GenerationRequest`]
//! and calls the channel's stages in the order [`stages::plan`] lists them,
//! feeding each stage's output into the next prompt.

pub mod client;
pub mod error;
pub mod fallback;
pub mod pipeline;
pub mod prompts;
pub(crate) mod retry;
pub mod stages;
pub mod template;

pub use client::FunctionsClient;
pub use error::PipelineError;
pub use pipeline::Pipeline;
pub use prompts::PromptCatalog;
pub use template::PromptContext;
