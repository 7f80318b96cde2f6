//! The API client collaborator.
//!
//! The dispatcher only needs `request` plus the five CRUD helpers. The
//! helpers default to a conventional REST mapping over `request`, so a
//! client may implement just `request`, or override individual helpers.

use std::fmt;

use futures_util::future::BoxFuture;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::binding::expr::to_display_string;
use crate::error::ApiError;

pub type ApiResult = Result<Value, ApiError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    #[serde(alias = "get")]
    Get,
    #[serde(alias = "post")]
    Post,
    #[serde(alias = "put")]
    Put,
    #[serde(alias = "patch")]
    Patch,
    #[serde(alias = "delete")]
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Backend access used by fetch effects.
pub trait ApiClient: Send + Sync {
    fn request(&self, method: Method, path: String, body: Option<Value>) -> BoxFuture<'_, ApiResult>;

    /// `GET /<entity>?<params>`
    fn list(&self, entity: &str, params: Option<Value>) -> BoxFuture<'_, ApiResult> {
        let path = format!("/{}{}", entity, query_string(params.as_ref()));
        self.request(Method::Get, path, None)
    }

    /// `GET /<entity>/<id>`
    fn read(&self, entity: &str, id: &Value) -> BoxFuture<'_, ApiResult> {
        self.request(Method::Get, item_path(entity, id), None)
    }

    /// `POST /<entity>`
    fn create(&self, entity: &str, body: Value) -> BoxFuture<'_, ApiResult> {
        self.request(Method::Post, format!("/{entity}"), Some(body))
    }

    /// `PUT /<entity>/<id>`
    fn update(&self, entity: &str, id: &Value, body: Value) -> BoxFuture<'_, ApiResult> {
        self.request(Method::Put, item_path(entity, id), Some(body))
    }

    /// `DELETE /<entity>/<id>`
    fn remove(&self, entity: &str, id: &Value) -> BoxFuture<'_, ApiResult> {
        self.request(Method::Delete, item_path(entity, id), None)
    }
}

impl<T: ApiClient + ?Sized> ApiClient for std::sync::Arc<T> {
    fn request(&self, method: Method, path: String, body: Option<Value>) -> BoxFuture<'_, ApiResult> {
        (**self).request(method, path, body)
    }

    fn list(&self, entity: &str, params: Option<Value>) -> BoxFuture<'_, ApiResult> {
        (**self).list(entity, params)
    }

    fn read(&self, entity: &str, id: &Value) -> BoxFuture<'_, ApiResult> {
        (**self).read(entity, id)
    }

    fn create(&self, entity: &str, body: Value) -> BoxFuture<'_, ApiResult> {
        (**self).create(entity, body)
    }

    fn update(&self, entity: &str, id: &Value, body: Value) -> BoxFuture<'_, ApiResult> {
        (**self).update(entity, id, body)
    }

    fn remove(&self, entity: &str, id: &Value) -> BoxFuture<'_, ApiResult> {
        (**self).remove(entity, id)
    }
}

/// Encode one path or query component.
pub fn encode_component(value: &Value) -> String {
    utf8_percent_encode(&to_display_string(value), NON_ALPHANUMERIC).to_string()
}

fn item_path(entity: &str, id: &Value) -> String {
    format!("/{}/{}", entity, encode_component(id))
}

/// `?a=1&b=x` from the scalar fields of an object; empty otherwise.
fn query_string(params: Option<&Value>) -> String {
    let Some(Value::Object(params)) = params else {
        return String::new();
    };
    let pairs: Vec<String> = params
        .iter()
        .filter(|(_, value)| !value.is_null() && !value.is_object() && !value.is_array())
        .map(|(key, value)| {
            format!(
                "{}={}",
                utf8_percent_encode(key, NON_ALPHANUMERIC),
                encode_component(value)
            )
        })
        .collect();
    if pairs.is_empty() {
        String::new()
    } else {
        format!("?{}", pairs.join("&"))
    }
}
