//! RagBuddy - grounded question answering over a document index
//!
//! Every question runs one pipeline: hybrid retrieval, context composition
//! with numbered sources, a grounded and cited answer, citation filtering,
//! related-item recommendations, and a forensic self-evaluation.
//!
//! # Architecture
//!
//! - **services**: the three remote contracts (embeddings, search, chat)
//! - **models** / **search**: Azure, Ollama and Qdrant implementations
//! - **rag**: the pipeline stages and the orchestrator
//! - **bootstrap** / **doctor** / **cli**: wiring, diagnostics and the binary

pub mod errors;
pub mod types;
pub mod services;
pub mod config;

// Re-export commonly used types
pub use errors::{RagError, Result};

pub mod models;
pub mod search;
pub mod rag;

pub use rag::{RAGPipeline, ServiceHandles};
pub use types::{ChatOutcome, RagResponse};

pub mod telemetry;
pub mod bootstrap;
pub mod doctor;
pub mod cli;
