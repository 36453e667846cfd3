//! NLU provider boundary: session keys, the detect-intent client, and response normalization.
//!
//! Provider-specific request/response shapes stay inside this module; the rest of the crate
//! only sees `NormalizedExtras`.

mod client;
mod credentials;
mod normalize;
mod response;
mod session;

pub use client::{DialogflowClient, NluClient, NluConfig, NluError, DEFAULT_ENDPOINT};
pub use credentials::resolve_token;
pub use normalize::{normalize, NormalizedExtras};
pub use response::{DetectResult, Intent, QueryResult};
pub use session::{derive_session_key, session_path};
