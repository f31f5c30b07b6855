//! Breed catalog lookups.
//!
//! Cat creation and updates only accept breeds known to an external catalog.
//! [`CatApiBreedValidator`] asks the public cat API; [`StaticBreedCatalog`]
//! checks against a fixed list taken from configuration.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use thiserror::Error;

/// Default catalog endpoint.
pub const DEFAULT_BREEDS_URL: &str = "https://api.thecatapi.com/v1/breeds";

#[derive(Debug, Error)]
pub enum BreedError {
    #[error("breed {0:?} is not in the catalog")]
    Invalid(String),

    #[error("{0}")]
    Unavailable(String),
}

#[async_trait]
pub trait BreedValidator: Send + Sync {
    /// Succeeds when `breed` matches a catalog entry, ignoring ASCII case.
    async fn validate(&self, breed: &str) -> Result<(), BreedError>;
}

#[derive(Debug, Deserialize)]
struct CatalogEntry {
    name: String,
}

/// Validates breeds against a remote JSON catalog of `[{"name": ...}]` entries.
#[derive(Debug, Clone)]
pub struct CatApiBreedValidator {
    url: String,
    client: Client,
}

impl CatApiBreedValidator {
    pub fn new(url: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            url: url.into(),
            client,
        })
    }

    async fn fetch_catalog(&self) -> Result<Vec<CatalogEntry>, BreedError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| BreedError::Unavailable(format!("catalog request failed: {e}")))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(BreedError::Unavailable(format!(
                "catalog responded with {status}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| BreedError::Unavailable(format!("malformed catalog response: {e}")))
    }
}

#[async_trait]
impl BreedValidator for CatApiBreedValidator {
    async fn validate(&self, breed: &str) -> Result<(), BreedError> {
        let catalog = self.fetch_catalog().await?;
        tracing::debug!(entries = catalog.len(), "fetched breed catalog");

        if catalog.iter().any(|e| e.name.eq_ignore_ascii_case(breed)) {
            Ok(())
        } else {
            Err(BreedError::Invalid(breed.to_string()))
        }
    }
}

/// A fixed breed list. Used when no remote catalog is configured.
#[derive(Debug, Clone, Default)]
pub struct StaticBreedCatalog {
    breeds: Vec<String>,
}

impl StaticBreedCatalog {
    pub fn new<I, S>(breeds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            breeds: breeds.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl BreedValidator for StaticBreedCatalog {
    async fn validate(&self, breed: &str) -> Result<(), BreedError> {
        if self.breeds.iter().any(|b| b.eq_ignore_ascii_case(breed)) {
            Ok(())
        } else {
            Err(BreedError::Invalid(breed.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode as AxumStatus, routing::get, Json, Router};

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/breeds")
    }

    fn catalog_app() -> Router {
        Router::new().route(
            "/breeds",
            get(|| async {
                Json(serde_json::json!([
                    { "id": "abys", "name": "Abyssinian" },
                    { "id": "siam", "name": "Siamese" }
                ]))
            }),
        )
    }

    #[tokio::test]
    async fn remote_catalog_matches_case_insensitively() {
        let url = serve(catalog_app()).await;
        let validator = CatApiBreedValidator::new(url, Duration::from_secs(5)).unwrap();

        assert!(validator.validate("siamese").await.is_ok());
        assert!(matches!(
            validator.validate("Dragon").await,
            Err(BreedError::Invalid(name)) if name == "Dragon"
        ));
    }

    #[tokio::test]
    async fn remote_catalog_error_status_is_unavailable() {
        let app = Router::new().route(
            "/breeds",
            get(|| async { (AxumStatus::BAD_GATEWAY, "down") }),
        );
        let url = serve(app).await;
        let validator = CatApiBreedValidator::new(url, Duration::from_secs(5)).unwrap();

        assert!(matches!(
            validator.validate("Siamese").await,
            Err(BreedError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn static_catalog_checks_its_list() {
        let catalog = StaticBreedCatalog::new(["Bengal", "Sphynx"]);

        assert!(catalog.validate("BENGAL").await.is_ok());
        assert!(catalog.validate("Persian").await.is_err());
    }
}
