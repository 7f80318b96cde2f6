//! Fetch effect plumbing: operation mapping and entity naming.

use std::fmt;

use serde_json::Value;

use super::api::{ApiClient, ApiResult, Method};
use crate::error::ApiError;

/// CRUD operation a fetch effect performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    List,
    Read,
    Create,
    Update,
    Remove,
}

impl Operation {
    /// Recognize an operation name, including common aliases.
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "list" | "all" | "fetch" | "index" => Some(Operation::List),
            "read" | "get" | "show" => Some(Operation::Read),
            "create" | "add" => Some(Operation::Create),
            "update" | "edit" => Some(Operation::Update),
            "remove" | "delete" | "destroy" => Some(Operation::Remove),
            _ => None,
        }
    }

    /// Pick the operation for an effect.
    ///
    /// An explicit, recognized `operation` wins. Otherwise the HTTP method
    /// decides: `GET` reads when the payload carries an `id` and lists
    /// otherwise. With neither, the effect lists.
    pub fn resolve(operation: Option<&str>, method: Option<Method>, payload: &Value) -> Self {
        if let Some(name) = operation {
            match Self::parse(name) {
                Some(op) => return op,
                None => tracing::warn!(operation = name, "unknown fetch operation, using method"),
            }
        }
        match method {
            Some(Method::Post) => Operation::Create,
            Some(Method::Put | Method::Patch) => Operation::Update,
            Some(Method::Delete) => Operation::Remove,
            Some(Method::Get) | None => {
                if payload_id(payload).is_some() {
                    Operation::Read
                } else {
                    Operation::List
                }
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::List => "list",
            Operation::Read => "read",
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Remove => "remove",
        }
    }

    pub fn needs_id(&self) -> bool {
        matches!(self, Operation::Read | Operation::Update | Operation::Remove)
    }

    /// Run the operation against `client`.
    pub async fn perform(&self, client: &dyn ApiClient, entity: &str, payload: Value) -> ApiResult {
        let id = payload_id(&payload).cloned();
        if self.needs_id() && id.is_none() {
            return Err(ApiError::MissingId {
                entity: entity.to_string(),
                operation: self.as_str().to_string(),
            });
        }
        let id = id.unwrap_or(Value::Null);

        match self {
            Operation::List => {
                let params = match &payload {
                    Value::Object(map) if map.is_empty() => None,
                    Value::Null => None,
                    other => Some(other.clone()),
                };
                client.list(entity, params).await
            }
            Operation::Read => client.read(entity, &id).await,
            Operation::Create => client.create(entity, payload).await,
            Operation::Update => client.update(entity, &id, payload).await,
            Operation::Remove => client.remove(entity, &id).await,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn payload_id(payload: &Value) -> Option<&Value> {
    payload.get("id").filter(|id| !id.is_null())
}

/// Entity endpoint for a service: strip `_service`, then pluralize.
///
/// `task_service` becomes `tasks`, `category_service` becomes `categories`,
/// and names already ending in `s` are kept.
pub fn entity_name(service: &str) -> String {
    let base = service.strip_suffix("_service").unwrap_or(service);
    pluralize(base)
}

fn pluralize(word: &str) -> String {
    if word.is_empty() || word.ends_with('s') {
        return word.to_string();
    }
    let mut chars = word.chars().rev();
    if let (Some('y'), Some(before)) = (chars.next(), chars.next()) {
        if !"aeiou".contains(before.to_ascii_lowercase()) {
            return format!("{}ies", &word[..word.len() - 1]);
        }
    }
    format!("{word}s")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn entity_names() {
        assert_eq!(entity_name("task_service"), "tasks");
        assert_eq!(entity_name("category_service"), "categories");
        assert_eq!(entity_name("day_service"), "days");
        assert_eq!(entity_name("users"), "users");
        assert_eq!(entity_name("invoice"), "invoices");
    }

    #[test]
    fn operation_wins_over_method() {
        assert_eq!(
            Operation::resolve(Some("delete"), Some(Method::Get), &json!({})),
            Operation::Remove
        );
        assert_eq!(Operation::resolve(Some("list"), None, &json!({"id": 1})), Operation::List);
    }

    #[test]
    fn method_mapping() {
        let with_id = json!({"id": 4});
        let without = json!({});
        assert_eq!(Operation::resolve(None, Some(Method::Get), &with_id), Operation::Read);
        assert_eq!(Operation::resolve(None, Some(Method::Get), &without), Operation::List);
        assert_eq!(Operation::resolve(None, Some(Method::Post), &without), Operation::Create);
        assert_eq!(Operation::resolve(None, Some(Method::Patch), &with_id), Operation::Update);
        assert_eq!(Operation::resolve(None, Some(Method::Delete), &with_id), Operation::Remove);
        assert_eq!(Operation::resolve(Some("bogus"), None, &without), Operation::List);
    }
}
