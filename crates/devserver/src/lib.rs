//! Development server exposing an `fsmapper` namespace over HTTP and
//! WebSocket.

pub mod config;
pub mod error;
pub mod server;

pub use config::{Args, DevServerConfig};
pub use error::{ServerError, ServerResult};
pub use server::Server;
