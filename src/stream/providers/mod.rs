//! Built-in host providers

pub mod direct;

pub use direct::DirectProvider;
