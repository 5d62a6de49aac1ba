//! Authenticated API calls
use serde::Serialize;
use serde_json::Value;
use studyai_core::{ApiRequest, App, HttpResponse, Method};

use super::CommandResult;
use crate::{Error, Result};

#[derive(Debug, Serialize)]
pub struct CallResponse {
    pub status: u16,
    /// Parsed JSON when the body is JSON, the raw text otherwise
    pub body: Value,
}

impl From<HttpResponse> for CallResponse {
    fn from(response: HttpResponse) -> Self {
        let body = serde_json::from_str(&response.body).unwrap_or(Value::String(response.body));
        Self {
            status: response.status,
            body,
        }
    }
}

pub async fn call(
    app: &App,
    endpoint: &str,
    method: Method,
    body: Option<String>,
    headers: &[String],
) -> CommandResult<CallResponse> {
    let request = match build_request(method, body, headers) {
        Ok(request) => request,
        Err(e) => return CommandResult::err(e.to_string()),
    };

    match app.session_manager().api_call(endpoint, request).await {
        Ok(response) if response.is_success() => CommandResult::ok(response.into()),
        Ok(response) => CommandResult::err(response.error_detail()),
        Err(e) => CommandResult::err(e.to_string()),
    }
}

fn build_request(method: Method, body: Option<String>, headers: &[String]) -> Result<ApiRequest> {
    let mut request = ApiRequest::new(method);
    for raw in headers {
        let (name, value) = parse_header(raw)?;
        request = request.header(name, value);
    }
    if let Some(body) = body {
        request = request.body(body);
    }
    Ok(request)
}

fn parse_header(raw: &str) -> Result<(String, String)> {
    raw.split_once(':')
        .map(|(name, value)| (name.trim().to_string(), value.trim().to_string()))
        .filter(|(name, _)| !name.is_empty())
        .ok_or_else(|| Error::Custom(format!("Invalid header {raw:?}, expected \"Name: value\"")))
}
