

pub mod client;

pub use client::{GraphHandle, HelixClient, HelixClientError};
