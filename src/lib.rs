// Public modules
pub mod accumulating_stream;
pub mod chat;
pub mod client;
pub mod client_logger;
pub mod credentials;
pub mod error;
pub mod models;
pub mod observability;
pub mod render;
pub mod session;
pub mod sse;
pub mod transport;
pub mod types;

// Re-exports
pub use accumulating_stream::{TextAccumulator, accumulate};
pub use client::{DEFAULT_API_URL, OpenRouter};
pub use client_logger::{ClientLogger, FileLogger};
pub use credentials::{Credential, CredentialStore, DEFAULT_SECRETS_FILE};
pub use error::{Error, ErrorKind, Result};
pub use models::ModelCatalog;
pub use observability::register_biometrics;
pub use render::{PlainTextRenderer, Renderer};
pub use session::SessionState;
pub use sse::{SseEvent, process_sse, text_fragments};
pub use transport::{CompletionTransport, FragmentStream};
pub use types::*;
