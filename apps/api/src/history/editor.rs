use std::convert::Infallible;
use std::net::SocketAddr;

use async_trait::async_trait;
use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::request::Parts;
use axum::http::HeaderMap;

use crate::models::history::Editor;

/// Set by the authenticating front end for signed-in admins.
pub const EDITOR_ID_HEADER: &str = "x-editor-id";
const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// First hop of `X-Forwarded-For`, else the socket peer.
fn client_address(parts: &Parts) -> Option<String> {
    header_value(&parts.headers, FORWARDED_FOR_HEADER)
        .and_then(|list| list.split(',').next().map(|ip| ip.trim().to_string()))
        .filter(|ip| !ip.is_empty())
        .or_else(|| {
            parts
                .extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
        })
}

#[async_trait]
impl<S> FromRequestParts<S> for Editor
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Editor::attribute(
            header_value(&parts.headers, EDITOR_ID_HEADER),
            client_address(parts),
        ))
    }
}
