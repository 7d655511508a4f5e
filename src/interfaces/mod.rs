//! Transport-facing adapters: request decoding and batch CSV I/O.

pub mod csv;
pub mod request;
