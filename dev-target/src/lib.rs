//! Annotated sample records, a by-hand target for the checkgen CLI.

pub mod models;
