use crate::model::{AnonymousFavoriteEntry, FavoriteRecord, Place, deserialize_id};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub struct Credentials<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Deserialize, Default)]
pub struct LoginResponse {
    #[serde(default)]
    pub favorites: Option<Vec<FavoriteRecord>>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct RegisterResponse {
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AddFavoriteRequest<'a> {
    pub state: &'a str,
    pub place_name: &'a str,
    pub category: &'a str,
}

#[derive(Debug, Deserialize, Default)]
pub struct AddFavoriteResponse {
    #[serde(default, deserialize_with = "deserialize_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SyncBatchRequest {
    pub favorites: Vec<AnonymousFavoriteEntry>,
}

#[derive(Debug, Deserialize, Default)]
pub struct FavoritesListResponse {
    #[serde(default)]
    pub favorites: Vec<FavoriteRecord>,
}

#[derive(Debug, Deserialize, Default)]
pub struct ErrorResponse {
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SearchRequest<'a> {
    pub state: &'a str,
    pub category: &'a str,
}

#[derive(Debug, Deserialize, Default)]
pub struct PlacesResponse {
    #[serde(default)]
    pub places: Vec<Place>,
}

#[derive(Debug, Deserialize, Default)]
pub struct StatesResponse {
    #[serde(default)]
    pub states: Vec<String>,
}
