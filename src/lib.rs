pub mod backend;
pub mod config;
pub mod error;
pub mod model;
pub mod server;
pub mod translate;
pub mod transport;

pub use backend::{Backend, BackendChunk, ChunkStream, HttpBackend};
pub use config::AppConfig;
pub use error::AdapterError;
pub use model::{GenerationRequest, OutputEvent};
pub use server::build_router;
pub use translate::{StreamTranslator, translate};
