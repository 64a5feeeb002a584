//! HTTP client for the places service.
//!
//! `FavoriteStore` is the narrow surface the sync controller needs; `SiteApi`
//! covers the account and search endpoints used by the application context.
//! `HttpClient` implements both over reqwest.

use std::future::Future;

use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use tokio_util::task::TaskTracker;

use crate::api::{
    AddFavoriteRequest, AddFavoriteResponse, Credentials, ErrorResponse, FavoritesListResponse,
    LoginResponse, PlacesResponse, RegisterResponse, SearchRequest, StatesResponse,
    SyncBatchRequest,
};
use crate::config::App;
use crate::error::{ClientError, Result};
use crate::model::{AnonymousFavoriteEntry, FavoriteRecord, Place, PlaceKey};

pub trait FavoriteStore: Send + Sync + 'static {
    /// Creates a favorite and returns the id the store assigned to it.
    fn add(&self, state: &str, place_name: &str, category: &str) -> impl Future<Output = Result<String>> + Send;

    fn list(&self) -> impl Future<Output = Result<Vec<FavoriteRecord>>> + Send;

    /// Succeeds when the record is gone afterwards, including when it never existed.
    fn remove(&self, id: &str) -> impl Future<Output = Result<()>> + Send;

    /// Pushes the full anonymous set without waiting for an answer.
    fn sync_batch(&self, entries: Vec<AnonymousFavoriteEntry>);
}

pub trait SiteApi: Send + Sync + 'static {
    fn login(&self, username: &str, password: &str) -> impl Future<Output = Result<Vec<FavoriteRecord>>> + Send;

    fn register(&self, username: &str, password: &str) -> impl Future<Output = Result<()>> + Send;

    fn search(&self, state: &str, category: &str) -> impl Future<Output = Result<Vec<Place>>> + Send;

    fn states(&self) -> impl Future<Output = Result<Vec<String>>> + Send;
}

#[derive(Clone, Debug)]
pub struct HttpClient {
    http: reqwest::Client,
    base_url: String,
    background: TaskTracker,
}

impl HttpClient {
    pub fn new(cfg: &App) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .user_agent(concat!("wayfarer/", env!("CARGO_PKG_VERSION")))
            .cookie_store(true);
        if let Some(timeout) = cfg.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let http = builder.build()?;

        Ok(HttpClient {
            http,
            base_url: cfg.get_base_url().to_string(),
            background: TaskTracker::new(),
        })
    }

    /// Waits for every background push started so far. Called once at shutdown.
    pub async fn drain(&self) {
        self.background.close();
        let pending = self.background.len();
        if pending > 0 {
            tracing::info!(pending, "waiting for background favorite pushes");
        }
        self.background.wait().await;
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    response.json::<T>().await.map_err(|e| {
        if e.is_decode() {
            ClientError::Server {
                status: status.as_u16(),
                message: format!("malformed response body: {}", e),
            }
        } else {
            ClientError::Network(e)
        }
    })
}

/// Turns a non-2xx response into `ClientError::Server`, keeping the body's `error` text when present.
async fn server_error(response: Response) -> ClientError {
    let status = response.status();
    let message = match response.json::<ErrorResponse>().await {
        Ok(ErrorResponse { error: Some(error) }) => error,
        _ => status
            .canonical_reason()
            .unwrap_or("unexpected status")
            .to_string(),
    };
    ClientError::Server {
        status: status.as_u16(),
        message,
    }
}

fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ClientError::Validation(format!("{} is required", field)));
    }
    Ok(())
}

impl FavoriteStore for HttpClient {
    async fn add(&self, state: &str, place_name: &str, category: &str) -> Result<String> {
        require("state", state)?;
        require("place_name", place_name)?;
        require("category", category)?;

        let response = self
            .http
            .post(self.url("/api/favorites"))
            .json(&AddFavoriteRequest {
                state,
                place_name,
                category,
            })
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::CONFLICT {
            return Err(ClientError::Duplicate(PlaceKey::new(place_name, state)));
        }
        if !status.is_success() {
            return Err(server_error(response).await);
        }

        let body: AddFavoriteResponse = decode(response).await?;
        match body {
            AddFavoriteResponse { error: Some(error), .. } => Err(ClientError::Server {
                status: status.as_u16(),
                message: error,
            }),
            AddFavoriteResponse { id: Some(id), .. } => {
                tracing::info!(id = %id, name = place_name, state, "favorite added");
                Ok(id)
            }
            // The service answers an existing favorite with a bare message and no id.
            AddFavoriteResponse { message: Some(_), .. } => {
                Err(ClientError::Duplicate(PlaceKey::new(place_name, state)))
            }
            _ => Err(ClientError::Server {
                status: status.as_u16(),
                message: "response carried neither id nor message".to_string(),
            }),
        }
    }

    async fn list(&self) -> Result<Vec<FavoriteRecord>> {
        let response = self.http.get(self.url("/api/favorites/list")).send().await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            tracing::warn!("favorites list endpoint not found, assuming no favorites yet");
            return Ok(Vec::new());
        }
        if !status.is_success() {
            return Err(server_error(response).await);
        }

        let body: FavoritesListResponse = decode(response).await?;
        tracing::debug!(count = body.favorites.len(), "listed favorites");
        Ok(body.favorites)
    }

    async fn remove(&self, id: &str) -> Result<()> {
        require("id", id)?;

        let response = self
            .http
            .delete(self.url(&format!("/api/favorites/{}", urlencoding::encode(id))))
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            tracing::debug!(id, "favorite already removed");
            return Ok(());
        }
        if !status.is_success() {
            return Err(server_error(response).await);
        }

        tracing::info!(id, "favorite removed");
        Ok(())
    }

    fn sync_batch(&self, entries: Vec<AnonymousFavoriteEntry>) {
        let http = self.http.clone();
        let url = self.url("/api/favorites");
        let count = entries.len();

        self.background.spawn(async move {
            let request = SyncBatchRequest { favorites: entries };
            match http.post(url).json(&request).send().await {
                Ok(response) if response.status().is_success() => {
                    tracing::info!(count, "anonymous favorites synced");
                }
                Ok(response) => {
                    tracing::warn!(count, status = response.status().as_u16(), "favorites sync rejected");
                }
                Err(e) => {
                    tracing::warn!(count, error = %crate::unpack_error(&e), "favorites sync failed");
                }
            }
        });
    }
}

impl SiteApi for HttpClient {
    async fn login(&self, username: &str, password: &str) -> Result<Vec<FavoriteRecord>> {
        require("username", username)?;
        require("password", password)?;

        let response = self
            .http
            .post(self.url("/api/login"))
            .json(&Credentials { username, password })
            .send()
            .await?;

        let status = response.status();
        let body: LoginResponse = match decode(response).await {
            Ok(body) => body,
            Err(e) if status.is_success() => return Err(e),
            Err(_) => LoginResponse::default(),
        };

        if let Some(error) = body.error {
            return Err(ClientError::Auth(error));
        }
        if !status.is_success() {
            return Err(ClientError::Auth(format!("login failed ({})", status.as_u16())));
        }

        tracing::info!(username, "logged in");
        Ok(body.favorites.unwrap_or_default())
    }

    async fn register(&self, username: &str, password: &str) -> Result<()> {
        require("username", username)?;
        require("password", password)?;

        let response = self
            .http
            .post(self.url("/api/register"))
            .json(&Credentials { username, password })
            .send()
            .await?;

        let status = response.status();
        let body: RegisterResponse = decode(response).await.unwrap_or_default();
        if let Some(error) = body.error {
            return Err(ClientError::Auth(error));
        }
        if !status.is_success() {
            return Err(ClientError::Auth(format!("registration failed ({})", status.as_u16())));
        }

        tracing::info!(username, "registered");
        Ok(())
    }

    async fn search(&self, state: &str, category: &str) -> Result<Vec<Place>> {
        require("state", state)?;

        let response = self
            .http
            .post(self.url("/api/search"))
            .json(&SearchRequest {
                state: state.trim(),
                category,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(server_error(response).await);
        }
        let body: PlacesResponse = decode(response).await?;
        Ok(body.places)
    }

    async fn states(&self) -> Result<Vec<String>> {
        let response = self.http.get(self.url("/api/states")).send().await?;
        if !response.status().is_success() {
            return Err(server_error(response).await);
        }
        let body: StatesResponse = decode(response).await?;
        Ok(body.states)
    }
}
