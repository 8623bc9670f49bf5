use anyhow::{anyhow, Context};
use reqwest::{Method, StatusCode};
use serde_json::Value;
use url::Url;

/// Thin HTTP client for the API's JSON envelope
pub struct ApiClient {
    http: reqwest::Client,
    base: Url,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(server: &str, token: Option<String>) -> anyhow::Result<Self> {
        let base = Url::parse(server).with_context(|| format!("invalid server URL '{}'", server))?;
        Ok(Self { http: reqwest::Client::new(), base, token })
    }

    pub fn url(&self, path: &str, query: &[(String, String)]) -> anyhow::Result<Url> {
        let mut url = self.base.join(path.trim_start_matches('/'))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    /// Send a request and return `(status, body)` without interpreting the envelope
    pub async fn raw(&self, method: Method, path: &str, query: &[(String, String)]) -> anyhow::Result<(StatusCode, Value)> {
        let mut request = self.http.request(method, self.url(path, query)?);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await.with_context(|| format!("request to {} failed", self.base))?;
        let status = response.status();
        let body = response.json::<Value>().await.unwrap_or(Value::Null);
        Ok((status, body))
    }

    /// Send a request and return the envelope's `data`, turning failures into errors
    pub async fn call(&self, method: Method, path: &str, query: &[(String, String)]) -> anyhow::Result<Value> {
        let (status, body) = self.raw(method, path, query).await?;
        envelope_data(status, body)
    }
}

pub fn envelope_data(status: StatusCode, body: Value) -> anyhow::Result<Value> {
    if body.get("success").and_then(Value::as_bool) == Some(true) {
        return Ok(body.get("data").cloned().unwrap_or(Value::Null));
    }
    let message = body.get("error").and_then(Value::as_str).unwrap_or("request failed");
    let code = body.get("code").and_then(Value::as_str).unwrap_or("UNKNOWN");
    Err(anyhow!("{} ({}, HTTP {})", message, code, status.as_u16()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builds_urls_with_query_pairs() {
        let client = ApiClient::new("http://localhost:3000/", None).unwrap();
        let url = client
            .url("/api/admin/database/data/questions", &[("subject".into(), "Didática".into())])
            .unwrap();
        assert_eq!(url.path(), "/api/admin/database/data/questions");
        assert_eq!(url.query_pairs().next().unwrap().1, "Didática");
    }

    #[test]
    fn unwraps_success_and_reports_errors() {
        let data = envelope_data(StatusCode::OK, json!({ "success": true, "data": [1, 2] })).unwrap();
        assert_eq!(data, json!([1, 2]));

        let err = envelope_data(
            StatusCode::FORBIDDEN,
            json!({ "success": false, "error": "Admin access required", "code": "FORBIDDEN" }),
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "Admin access required (FORBIDDEN, HTTP 403)");
    }
}
