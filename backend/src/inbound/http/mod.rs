//! Inbound HTTP adapters: handlers, session extraction, and error mapping.

pub mod error;
pub mod health;
pub mod session;
pub mod state;
#[cfg(test)]
pub mod test_utils;
pub mod workspaces;

pub use error::ApiResult;
pub use state::HttpState;

use actix_web::error::JsonPayloadError;
use actix_web::{web, HttpRequest, HttpResponse};

/// Map JSON bodies that fail to decode onto the engine's payload shape
/// instead of Actix's plain-text default.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err: JsonPayloadError, _req: &HttpRequest| {
        let response = HttpResponse::BadRequest().json(error::invalid_body_payload());
        actix_web::error::InternalError::from_response(err, response).into()
    })
}
