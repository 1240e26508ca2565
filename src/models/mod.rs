pub mod video;

pub use video::{InsertOutcome, NewVideo, Video, VideoFilter, VideoUpdate};
