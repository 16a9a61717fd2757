//! Everything that produces text or files from the processed script.
pub mod cpp;
pub mod workspace;
