//! Domain model module declarations.

pub mod transcript;
pub mod transport;
