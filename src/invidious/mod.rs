// Invidious API access - the metadata provider for playback

pub mod client;
pub mod errors;
pub mod models;
pub mod traits;

pub use client::InvidiousClient;
pub use errors::ApiError;
pub use models::{ChannelItem, CommentItem, CommentPage, VideoItem};
pub use traits::MetadataProvider;
