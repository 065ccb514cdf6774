pub mod client;

pub use client::{IngestClient, IngestError};
