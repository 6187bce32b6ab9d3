//! Live scripture annotation pipeline.
//!
//! Audio chunks arrive at the ingestion endpoint, get transcribed by an
//! external speech-to-text provider, are scanned for verse citations, and the
//! cited verse text is looked up in the seeded corpus. The `record` module is
//! the matching capture-and-upload client.

pub mod config;
pub mod detect;
pub mod record;
pub mod reference;
pub mod server;
pub mod store;
pub mod transcribe;
