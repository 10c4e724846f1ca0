//! A demand-driven type inference engine for a dynamically typed,
//! class-based object-oriented language (§1-§2).
//!
//! The pipeline is `lower` (AST → IR, §4.1) → `resolver` (lazy, request-local
//! inference over the IR, §4.2-§4.3) with declared third-party signatures
//! supplied through the `adapter` boundary (§4.4) and a process-wide `cache`
//! for their extracted signatures (§4.6). `hover` and `coverage` are the two
//! consumer-facing views over a resolved `resolver::Engine` (§6).

pub mod adapter;
pub mod cache;
pub mod config;
pub mod coverage;
pub mod error;
pub mod hover;
pub mod ir;
pub mod lower;
pub mod registry;
pub mod resolver;
pub mod ty;

pub use config::Config;
pub use error::CoreError;
pub use resolver::Engine;
