//! HTTP layer of the device REST client.
//!
//! ```text
//! ┌──────────────────┐
//! │ RequestExecutor  │  - blocking call, timeout, diagnostics
//! └────────┬─────────┘
//!          │
//!          ▼
//! ┌──────────────────┐
//! │    Transport     │  - reqwest + rustls with the pinning verifier
//! └────────┬─────────┘
//!          │ RawReply
//!          ▼
//! ┌──────────────────┐
//! │ResponseTranslator│  - status/headers/body/error → Response
//! └──────────────────┘
//! ```

mod executor;
mod request;
mod response;
mod translator;
mod transport;

pub use executor::{RequestExecutor, DEFAULT_TIMEOUT};
pub use request::{HttpMethod, RequestHeaders, RestRequest};
pub use response::{Response, ResponseBody};
pub use translator::{
    advisory, canonical_reason, RawReply, ResponseTranslator, TransportFailure, TIMEOUT_REASON,
};
pub use transport::{ReqwestTransport, Transport, MAX_REDIRECTS};
