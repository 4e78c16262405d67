use anyhow::{anyhow, Context, Result};
use chesscg_lib::loadout::{Loadout, ModifierCatalog, ModifierInfo};
use chesscg_lib::messages::PlayerSlot;
use chesscg_lib::board::PerColor;
use log::trace;
use reqwest::header::COOKIE;
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;

#[derive(Deserialize)]
struct WsToken {
   access_token: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct GameInfo {
   pub room_id: String,
   pub players: PerColor<PlayerSlot>,
}

/// The backend's REST endpoints, authenticated with the `access_token` cookie.
pub struct ApiClient {
   client: Client,
   base_url: String,
   token: String,
}

impl ApiClient {
   pub fn new(base_url: &str, token: &str) -> Result<ApiClient> {
      let client = Client::builder().pool_max_idle_per_host(0).build().context("building http client")?;
      Ok(ApiClient {
         client,
         base_url: base_url.trim_end_matches('/').to_string(),
         token: token.to_string(),
      })
   }

   fn url(&self, path: &str) -> String {
      format!("{}{}", self.base_url, path)
   }

   fn authed(&self, request: RequestBuilder) -> RequestBuilder {
      request.header(COOKIE, format!("access_token={}", self.token))
   }

   async fn send(&self, request: RequestBuilder, what: &str) -> Result<Response> {
      let response = self
         .authed(request)
         .send()
         .await
         .with_context(|| format!("requesting {}", what))?;
      let status = response.status();
      trace!("{} -> {}", what, status);
      if !status.is_success() {
         return Err(anyhow!("{} failed with status: {}", what, status));
      }
      Ok(response)
   }

   pub async fn ws_token(&self) -> Result<String> {
      let request = self.client.get(self.url("/auth/ws-token"));
      let token: WsToken = self
         .send(request, "websocket token")
         .await?
         .json()
         .await
         .context("decoding websocket token")?;
      Ok(token.access_token)
   }

   pub async fn game_info(&self, room_id: &str) -> Result<GameInfo> {
      let request = self.client.get(self.url(&format!("/api/game/{}/info", room_id)));
      self
         .send(request, "game info")
         .await?
         .json()
         .await
         .context("decoding game info")
   }

   pub async fn modifiers(&self) -> Result<Vec<ModifierInfo>> {
      let request = self.client.get(self.url("/api/game/modifiers"));
      let catalog: ModifierCatalog = self
         .send(request, "modifier catalog")
         .await?
         .json()
         .await
         .context("decoding modifier catalog")?;
      Ok(catalog.modifiers)
   }

   pub async fn loadout(&self) -> Result<Loadout> {
      let request = self.client.get(self.url("/api/loadout"));
      self
         .send(request, "loadout")
         .await?
         .json()
         .await
         .context("decoding loadout")
   }

   pub async fn save_loadout(&self, loadout: &Loadout) -> Result<()> {
      let request = self.client.post(self.url("/api/loadout")).json(loadout);
      self.send(request, "saving loadout").await?;
      Ok(())
   }
}
