//! Retrieval-augmented generation core for the study-buddy backend.
//!
//! The crate wires three pipelines around a shared vector store:
//! - ingest: extract text, chunk it, embed it, store it per owner
//! - respond: retrieve relevant chunks, assemble context, generate a reply
//! - maintenance: per-owner stats and bulk deletion
//!
//! The HTTP surface, authentication and chat CRUD live in the host
//! application; this crate only depends on the message-persistence
//! collaborator through the `MessageStore` trait.

pub mod config;
pub mod document;
pub mod embedding;
pub mod errors;
pub mod history;
pub mod llm;
pub mod logging;
pub mod rag;
pub mod store;
