//! Gateway speaking the store's HTTP surface: PostgREST-style reads,
//! bearer-authenticated favorite and membership writes.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode, header};
use serde::de::DeserializeOwned;
use tracing::debug;
use uuid::Uuid;

use campus_types::api::{AddFavoriteRequest, AuthResponse, FavoriteStatus, LoginRequest, MembershipStatus, RegisterRequest};
use campus_types::models::{Favorite, FavoriteKey};
use campus_types::postgrest;
use campus_types::query::{ListQuery, Page, Table};

use super::{Gateway, Row};
use crate::config::ClientConfig;
use crate::error::GatewayError;
use crate::session::Identity;

#[derive(Clone)]
pub struct HttpGateway {
    client: Client,
    base_url: String,
}

impl HttpGateway {
    pub fn new(config: &ClientConfig) -> Result<Self, GatewayError> {
        let client = Client::builder().build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authed(&self, builder: RequestBuilder, identity: &Identity) -> RequestBuilder {
        builder.header(header::AUTHORIZATION, format!("Bearer {}", identity.token))
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, GatewayError> {
        let body = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let resp = send(self.client.post(self.url("/auth/login")).json(&body)).await?;
        Ok(json::<AuthResponse>(resp).await?.into())
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> Result<Identity, GatewayError> {
        let body = RegisterRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let resp = send(self.client.post(self.url("/auth/register")).json(&body)).await?;
        Ok(json::<AuthResponse>(resp).await?.into())
    }

    fn favorite_path(key: FavoriteKey) -> String {
        format!("/favorites/{}/{}", key.item_type, key.item_id)
    }

    fn membership_path(club_id: Uuid) -> String {
        format!("/clubs/{club_id}/membership")
    }
}

/// Sends and maps non-success statuses onto the error taxonomy.
async fn send(builder: RequestBuilder) -> Result<Response, GatewayError> {
    let resp = builder.send().await?;
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    match status {
        StatusCode::UNAUTHORIZED => Err(GatewayError::Unauthorized),
        StatusCode::NOT_FOUND => Err(GatewayError::NotFound),
        StatusCode::CONFLICT => Err(GatewayError::Duplicate),
        _ => {
            let message = resp.text().await.unwrap_or_default();
            Err(GatewayError::Status {
                status: status.as_u16(),
                message,
            })
        }
    }
}

async fn json<T: DeserializeOwned>(resp: Response) -> Result<T, GatewayError> {
    let bytes = resp.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[async_trait]
impl Gateway for HttpGateway {
    async fn select(&self, query: &ListQuery) -> Result<Page<Row>, GatewayError> {
        query.validate()?;
        let params = query.to_params();
        let resp = send(
            self.client
                .get(self.url(&format!("/rest/{}", query.table)))
                .query(&params),
        )
        .await?;

        let total = resp
            .headers()
            .get(header::CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .and_then(postgrest::parse_content_range)
            .ok_or_else(|| GatewayError::Decode("missing or malformed Content-Range".into()))?;
        let rows: Vec<Row> = json(resp).await?;
        debug!("{}: {} rows of {}", query.table, rows.len(), total);
        Ok(Page { rows, total })
    }

    async fn select_one(&self, table: Table, id: Uuid) -> Result<Option<Row>, GatewayError> {
        match send(self.client.get(self.url(&format!("/rest/{table}/{id}")))).await {
            Ok(resp) => Ok(Some(json(resp).await?)),
            Err(GatewayError::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn insert_favorite(&self, identity: &Identity, key: FavoriteKey) -> Result<(), GatewayError> {
        let body = AddFavoriteRequest {
            item_type: key.item_type,
            item_id: key.item_id,
        };
        let req = self.client.post(self.url("/favorites")).json(&body);
        send(self.authed(req, identity)).await.map(|_| ())
    }

    async fn delete_favorite(&self, identity: &Identity, key: FavoriteKey) -> Result<(), GatewayError> {
        let req = self.client.delete(self.url(&Self::favorite_path(key)));
        send(self.authed(req, identity)).await.map(|_| ())
    }

    async fn favorite_exists(&self, identity: &Identity, key: FavoriteKey) -> Result<bool, GatewayError> {
        let req = self.client.get(self.url(&Self::favorite_path(key)));
        let status: FavoriteStatus = json(send(self.authed(req, identity)).await?).await?;
        Ok(status.favorite)
    }

    async fn list_favorites(&self, identity: &Identity) -> Result<Vec<Favorite>, GatewayError> {
        let req = self.client.get(self.url("/favorites"));
        json(send(self.authed(req, identity)).await?).await
    }

    async fn join_club(&self, identity: &Identity, club_id: Uuid) -> Result<(), GatewayError> {
        let req = self.client.post(self.url(&Self::membership_path(club_id)));
        send(self.authed(req, identity)).await.map(|_| ())
    }

    async fn leave_club(&self, identity: &Identity, club_id: Uuid) -> Result<(), GatewayError> {
        let req = self.client.delete(self.url(&Self::membership_path(club_id)));
        send(self.authed(req, identity)).await.map(|_| ())
    }

    async fn is_member(&self, identity: &Identity, club_id: Uuid) -> Result<bool, GatewayError> {
        let req = self.client.get(self.url(&Self::membership_path(club_id)));
        let status: MembershipStatus = json(send(self.authed(req, identity)).await?).await?;
        Ok(status.member)
    }
}
