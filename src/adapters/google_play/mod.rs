//! Google Play adapters.
//!
//! - `GooglePlayNotificationDecoder` - RTDN Pub/Sub payloads to renewal events
//! - `GooglePlayDeveloperApiClient` - Subscription state from the Developer API
//! - `StaticAccessTokenSource` - Configured bearer token

mod access_token;
mod developer_api_client;
mod developer_api_models;
mod rtdn_decoder;
mod rtdn_models;

pub use access_token::StaticAccessTokenSource;
pub use developer_api_client::{GooglePlayDeveloperApiClient, DEFAULT_API_BASE_URL};
pub use rtdn_decoder::GooglePlayNotificationDecoder;
