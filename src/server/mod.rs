//! HTTP transport over `may_minihttp` coroutines.

mod http_server;
mod request;
mod response;
mod service;

pub use http_server::{HttpServer, ServerHandle};
pub use service::AppService;
