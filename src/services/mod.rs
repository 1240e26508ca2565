// src/services/mod.rs
pub mod video_store;

pub use video_store::{InMemoryVideoStore, PgVideoStore, VideoStore};
