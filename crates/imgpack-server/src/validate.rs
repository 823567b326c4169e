//! Request-body validation for `POST /api/create-zip`.
//!
//! # ルール
//! - `urls` は 1 件以上の配列
//! - 各要素は `http` / `https` の絶対 URL
//!
//! 違反はすべて集めてから返します（最初の 1 件で止めない）。

use serde::Serialize;
use serde_json::Value;
use url::Url;

use imgpack_core::domain::FetchRequest;

const MSG_URLS: &str = "Must provide array of URLs";
const MSG_URL_FORMAT: &str = "Invalid URL format";

/// One rejected field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldError {
    pub msg: &'static str,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

/// Parse and validate a raw request body.
pub fn create_zip_request(body: &[u8]) -> Result<FetchRequest, Vec<FieldError>> {
    let parsed: Option<Value> = serde_json::from_slice(body).ok();
    let urls = parsed.as_ref().and_then(|v| v.get("urls"));

    let Some(Value::Array(items)) = urls else {
        return Err(vec![FieldError {
            msg: MSG_URLS,
            path: "urls".to_string(),
            value: urls.cloned(),
        }]);
    };
    if items.is_empty() {
        return Err(vec![FieldError {
            msg: MSG_URLS,
            path: "urls".to_string(),
            value: Some(Value::Array(Vec::new())),
        }]);
    }

    let mut errors = Vec::new();
    let mut accepted = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        match item.as_str().filter(|s| is_fetchable(s)) {
            Some(url) => accepted.push(url.to_string()),
            None => errors.push(FieldError {
                msg: MSG_URL_FORMAT,
                path: format!("urls[{i}]"),
                value: Some(item.clone()),
            }),
        }
    }

    if !errors.is_empty() {
        return Err(errors);
    }
    FetchRequest::new(accepted).map_err(|_| {
        vec![FieldError {
            msg: MSG_URLS,
            path: "urls".to_string(),
            value: None,
        }]
    })
}

fn is_fetchable(raw: &str) -> bool {
    match Url::parse(raw) {
        Ok(url) => matches!(url.scheme(), "http" | "https") && url.host_str().is_some(),
        Err(_) => false,
    }
}
