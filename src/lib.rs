//! # docqa
//!
//! Question answering over your own documents, powered by a local Ollama
//! model. Stage PDF, DOCX, or TXT files, build a vector index snapshot,
//! then ask questions answered from the most relevant chunks.
//!
//! ```text
//!  upload            build                                ask
//!  ──────►  staging  ─────►  extract ─► chunk ─► embed    ───►  embed query
//!           dir                                    │                 │
//!                                                  ▼                 ▼
//!                                          snapshot (SQLite)  ─► cosine top-k
//!                                                                    │
//!                                                                    ▼
//!                                                          prompt ─► Ollama
//! ```
//!
//! The snapshot is the only persistent state: builds replace it atomically
//! and queries only read it. See the `docqa` binary for the CLI and
//! [`server`] for the HTTP surface.

pub mod chunk;
pub mod config;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod generate;
pub mod index;
pub mod ingest;
pub mod models;
pub mod pipeline;
pub mod prompt;
pub mod server;
pub mod staging;
