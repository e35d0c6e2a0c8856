// Public modules for testing
pub mod config;
pub mod endpoint;
pub mod error;
pub mod query;
pub mod server;
pub mod store;

// Re-export main types
pub use config::{Direction, EndpointConfig, EndpointDecl, OrderSpec, ServerConfig, Source};
pub use endpoint::Registry;
pub use error::Error;
pub use query::RequestContext;
pub use store::{MemoryStore, Record};
