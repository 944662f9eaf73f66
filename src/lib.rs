pub mod audio;
pub mod config;
pub mod credentials;
pub mod dispatcher;
pub mod error;
pub mod handlers;
pub mod prompt;
pub mod report;
pub mod routes;
pub mod state;
pub mod websocket;

pub use config::Config;
pub use dispatcher::{Dispatcher, GeminiClient, GenerationClient, ScriptedClient};
pub use error::{ConfigError, RequestError};
pub use state::AppState;
