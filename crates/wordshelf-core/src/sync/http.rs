//! REST binding of the remote backend contract

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use serde::Deserialize;
use uuid::Uuid;

use super::backend::{BackendError, BackendResult, RemoteBackend, RemoteId};
use crate::error::{Error, Result};
use crate::models::{Book, Entity, EntityType, VocabWord};
use crate::util::{compact_text, is_http_url, normalize_text_option};

/// Backend reached over HTTP
///
/// Routes: `POST /v1/{books|words}`, `PUT|DELETE /v1/{books|words}/{id}`,
/// `GET /v1/{books|words}?updated_since={ms}`.
#[derive(Clone)]
pub struct HttpBackend {
    base_url: String,
    auth_token: Option<String>,
    client: reqwest::Client,
}

impl std::fmt::Debug for HttpBackend {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("HttpBackend")
            .field("base_url", &self.base_url)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "[REDACTED]"))
            .finish_non_exhaustive()
    }
}

impl HttpBackend {
    pub fn new(
        base_url: impl Into<String>,
        auth_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let base_url = normalize_base_url(base_url.into())?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| Error::Config(format!("failed to build HTTP client: {error}")))?;

        Ok(Self {
            base_url,
            auth_token: normalize_text_option(auth_token),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn collection_url(&self, entity_type: EntityType) -> String {
        format!("{}/v1/{}", self.base_url, collection_path(entity_type))
    }

    fn record_url(&self, entity_type: EntityType, id: Uuid) -> String {
        format!("{}/{id}", self.collection_url(entity_type))
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let request = request.header(reqwest::header::ACCEPT, "application/json");
        match &self.auth_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> BackendResult<Response> {
        let response = self.authorize(request).send().await.map_err(map_transport_error)?;
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(classify_status(status, &body))
    }
}

#[derive(Debug, Deserialize)]
struct CreatedResponse {
    id: Option<String>,
}

#[async_trait]
impl RemoteBackend for HttpBackend {
    async fn create_remote(
        &self,
        entity_type: EntityType,
        record: &Entity,
    ) -> BackendResult<RemoteId> {
        let response = self
            .send(self.client.post(self.collection_url(entity_type)).json(record))
            .await?;

        // Some deployments answer 201/204 without a body
        let body = response.text().await.map_err(map_transport_error)?;
        if body.trim().is_empty() {
            return Ok(record.id().to_string());
        }
        let created: CreatedResponse = serde_json::from_str(&body)
            .map_err(|error| BackendError::InvalidResponse(error.to_string()))?;
        Ok(created.id.unwrap_or_else(|| record.id().to_string()))
    }

    async fn update_remote(
        &self,
        entity_type: EntityType,
        id: Uuid,
        record: &Entity,
    ) -> BackendResult<()> {
        self.send(self.client.put(self.record_url(entity_type, id)).json(record))
            .await?;
        Ok(())
    }

    async fn delete_remote(&self, entity_type: EntityType, id: Uuid) -> BackendResult<()> {
        match self
            .send(self.client.delete(self.record_url(entity_type, id)))
            .await
        {
            Ok(_) => Ok(()),
            // Already gone remotely is the state we wanted
            Err(BackendError::Status { status: 404, .. }) => Ok(()),
            Err(error) => Err(error),
        }
    }

    async fn fetch_updated_since(
        &self,
        entity_type: EntityType,
        since_ms: i64,
    ) -> BackendResult<Vec<Entity>> {
        let request = self
            .client
            .get(self.collection_url(entity_type))
            .query(&[("updated_since", since_ms)]);
        let body = self
            .send(request)
            .await?
            .text()
            .await
            .map_err(map_transport_error)?;
        parse_records(entity_type, &body)
    }
}

const fn collection_path(entity_type: EntityType) -> &'static str {
    match entity_type {
        EntityType::Book => "books",
        EntityType::VocabWord => "words",
    }
}

fn parse_records(entity_type: EntityType, body: &str) -> BackendResult<Vec<Entity>> {
    let invalid = |error: serde_json::Error| BackendError::InvalidResponse(error.to_string());
    match entity_type {
        EntityType::Book => Ok(serde_json::from_str::<Vec<Book>>(body)
            .map_err(invalid)?
            .into_iter()
            .map(Entity::Book)
            .collect()),
        EntityType::VocabWord => Ok(serde_json::from_str::<Vec<VocabWord>>(body)
            .map_err(invalid)?
            .into_iter()
            .map(Entity::Word)
            .collect()),
    }
}

fn map_transport_error(error: reqwest::Error) -> BackendError {
    if error.is_timeout() {
        BackendError::Timeout
    } else if error.is_decode() {
        BackendError::InvalidResponse(error.to_string())
    } else {
        BackendError::Unreachable(error.to_string())
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<String>,
    message: Option<String>,
}

fn parse_api_error(body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ApiErrorBody>(body) {
        if let Some(message) = payload.message.or(payload.error) {
            return compact_text(&message);
        }
    }
    compact_text(body)
}

fn classify_status(status: StatusCode, body: &str) -> BackendError {
    let message = parse_api_error(body);
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => BackendError::Auth(message),
        StatusCode::UNPROCESSABLE_ENTITY => BackendError::Verification(message),
        _ => BackendError::Status {
            status: status.as_u16(),
            message,
        },
    }
}

fn normalize_base_url(raw: String) -> Result<String> {
    let url = normalize_text_option(Some(raw))
        .ok_or_else(|| Error::Config("backend URL must not be empty".to_string()))?;
    if is_http_url(&url) {
        Ok(url.trim_end_matches('/').to_string())
    } else {
        Err(Error::Config(
            "backend URL must include http:// or https://".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OwnerId;

    fn backend() -> HttpBackend {
        HttpBackend::new(
            "https://api.example.com/",
            Some("secret".to_string()),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn normalize_base_url_rejects_invalid_values() {
        assert!(normalize_base_url(String::new()).is_err());
        assert!(normalize_base_url("api.example.com".to_string()).is_err());
        assert_eq!(
            normalize_base_url(" https://api.example.com/ ".to_string()).unwrap(),
            "https://api.example.com"
        );
    }

    #[test]
    fn routes_per_collection() {
        let backend = backend();
        let id = Uuid::nil();
        assert_eq!(
            backend.collection_url(EntityType::Book),
            "https://api.example.com/v1/books"
        );
        assert_eq!(
            backend.record_url(EntityType::VocabWord, id),
            format!("https://api.example.com/v1/words/{id}")
        );
    }

    #[test]
    fn debug_redacts_token() {
        let debug = format!("{:?}", backend());
        assert!(!debug.contains("secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn classify_status_maps_auth_and_verification() {
        assert_eq!(
            classify_status(StatusCode::UNAUTHORIZED, r#"{"error":"expired"}"#),
            BackendError::Auth("expired".to_string())
        );
        assert_eq!(
            classify_status(StatusCode::UNPROCESSABLE_ENTITY, r#"{"message":"title required"}"#),
            BackendError::Verification("title required".to_string())
        );
        assert_eq!(
            classify_status(StatusCode::BAD_GATEWAY, "upstream down"),
            BackendError::Status {
                status: 502,
                message: "upstream down".to_string()
            }
        );
    }

    #[test]
    fn parse_records_reads_typed_arrays() {
        let book = Book::new(OwnerId::new(), "Emma", "Jane Austen");
        let body = serde_json::to_string(&vec![book.clone()]).unwrap();
        let records = parse_records(EntityType::Book, &body).unwrap();
        assert_eq!(records, vec![Entity::Book(book)]);

        assert!(matches!(
            parse_records(EntityType::VocabWord, "{}"),
            Err(BackendError::InvalidResponse(_))
        ));
    }
}
