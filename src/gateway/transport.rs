//! HTTP dispatch for gateway calls.

use reqwest::header::CONTENT_TYPE;
use reqwest::Method;
use serde_json::Value;

use crate::http::Reply;

/// Issue one request and read its full reply.
///
/// The JSON content type is always sent; a bearer header only when a token
/// is available.
pub(super) async fn dispatch(
    http: &reqwest::Client,
    url: &str,
    method: &Method,
    body: Option<&Value>,
    bearer: Option<&str>,
) -> Result<Reply, reqwest::Error> {
    let mut request = http
        .request(method.clone(), url)
        .header(CONTENT_TYPE, "application/json");
    if let Some(token) = bearer {
        request = request.bearer_auth(token);
    }
    if let Some(body) = body {
        request = request.body(body.to_string());
    }
    let reply = Reply::read(request.send().await?).await?;
    tracing::debug!(%method, url, status = reply.status, "api call");
    Ok(reply)
}
