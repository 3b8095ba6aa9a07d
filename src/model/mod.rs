mod params;
mod types;

pub use params::{
    DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE, GenerationDefaults, ResolvedParameters, resolve,
};
pub use types::{
    Details, GenerationParameters, GenerationRequest, GenerationResponse, OutputEvent, Token,
};
