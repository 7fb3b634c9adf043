//! Network-facing strategies and the per-track / per-batch orchestration

pub mod batch_controller;
pub mod descriptor_client;
pub mod http_session;
pub mod preview_fetcher;
pub mod preview_locator;
pub mod track_resolver;

pub use batch_controller::{
    parse_playlist_id, BatchController, BatchOutcome, BatchRequest, BatchStatus, TrackSource, DONE_MESSAGE,
};
pub use descriptor_client::DescriptorClient;
pub use http_session::build_http_client;
pub use preview_fetcher::PreviewFetcher;
pub use preview_locator::{select_candidate, sanitize_title, MatchTier, PreviewLocator};
pub use track_resolver::TrackResolver;
