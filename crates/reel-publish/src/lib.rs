//! Publishing finished shorts to a video-hosting service.
//!
//! - [`VideoPublisher`] is the seam the pipeline uploads through
//! - [`YoutubeClient`] implements it with the YouTube Data API v3 resumable upload
//! - [`CredentialStore`] supplies the OAuth access token; [`InMemoryCredentials`]
//!   is the process-local implementation

pub mod client;
pub mod credentials;
pub mod error;

pub use client::{share_url, PublishedVideo, VideoPublisher, VideoUpload, YoutubeClient, YoutubeConfig};
pub use credentials::{AccessToken, CredentialStore, InMemoryCredentials};
pub use error::{PublishError, PublishResult};
