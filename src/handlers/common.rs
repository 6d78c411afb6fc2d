use crate::errors::ServiceError;
use axum::{
    extract::{FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};

/// Standard success response
pub fn success_response<T: Serialize>(data: T) -> Response {
    (StatusCode::OK, Json(data)).into_response()
}

/// `{"Status": true}` plus the given fields
pub fn status_response(status: StatusCode, fields: Value) -> Response {
    let mut body = Map::new();
    body.insert("Status".to_string(), Value::Bool(true));
    if let Value::Object(extra) = fields {
        body.extend(extra);
    }
    (status, Json(Value::Object(body))).into_response()
}

pub fn status_ok(fields: Value) -> Response {
    status_response(StatusCode::OK, fields)
}

/// JSON body whose rejections are reported as validation errors in the
/// standard error body.
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| ServiceError::ValidationError(rejection.body_text()))?;
        Ok(Self(value))
    }
}

/// Identifier sent either as a number or as a numeric string
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum FlexibleId {
    Number(i32),
    Text(String),
}

impl FlexibleId {
    pub fn parse(&self) -> Result<i32, ServiceError> {
        match self {
            Self::Number(id) => Ok(*id),
            Self::Text(text) => text
                .trim()
                .parse()
                .map_err(|_| ServiceError::ValidationError(format!("'{}' is not a valid id", text))),
        }
    }
}

/// One entry of an id list: a bare id or a basket line such as
/// `{"product_info": 3, "quantity": 1}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum IdEntry {
    Id(FlexibleId),
    Line { product_info: Option<FlexibleId> },
}

/// Id list sent as a JSON array or as a comma-separated string (`"1,2,3"`).
/// Line entries without `product_info` are skipped.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum IdList {
    List(Vec<IdEntry>),
    Joined(String),
}

impl IdList {
    pub fn parse(&self) -> Result<Vec<i32>, ServiceError> {
        match self {
            Self::List(entries) => entries
                .iter()
                .filter_map(|entry| match entry {
                    IdEntry::Id(id) => Some(id.parse()),
                    IdEntry::Line { product_info } => product_info.as_ref().map(FlexibleId::parse),
                })
                .collect(),
            Self::Joined(joined) => joined
                .split(',')
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .map(|part| {
                    part.parse().map_err(|_| {
                        ServiceError::ValidationError(format!("'{}' is not a valid id", part))
                    })
                })
                .collect(),
        }
    }
}

/// `{"items": ...}` body shared by the delete endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct ItemsRequest {
    pub items: Option<IdList>,
}

impl ItemsRequest {
    pub fn ids(&self) -> Result<Vec<i32>, ServiceError> {
        match &self.items {
            Some(items) => items.parse(),
            None => Err(ServiceError::ValidationError("items are required".to_string())),
        }
    }
}
