use crate::api::ApiClient;
use crate::config::ReconnectConfig;
use crate::session::Event;
use anyhow::{Context, Result};
use chesscg_lib::messages::{decode_snapshot, ClientMessage, GameSnapshot};
use futures::{Sink, SinkExt, Stream, StreamExt};
use log::{error, info, trace, warn};
use parking_lot::Mutex;
use rand::Rng;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_websockets::{ClientBuilder, Message};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionStatus {
   Connecting,
   Connected,
   Disconnected,
   Error,
}

impl fmt::Display for ConnectionStatus {
   fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
      let s = match self {
         ConnectionStatus::Connecting => "connecting",
         ConnectionStatus::Connected => "connected",
         ConnectionStatus::Disconnected => "disconnected",
         ConnectionStatus::Error => "error",
      };
      write!(f, "{}", s)
   }
}

/// Last known connection status, readable from the session at any time.
#[derive(Clone)]
pub struct SharedStatus(Arc<Mutex<ConnectionStatus>>);

impl SharedStatus {
   pub fn new() -> SharedStatus {
      SharedStatus(Arc::new(Mutex::new(ConnectionStatus::Disconnected)))
   }

   pub fn get(&self) -> ConnectionStatus {
      *self.0.lock()
   }

   /// Stores `status`, returning whether it changed.
   fn replace(&self, status: ConnectionStatus) -> bool {
      let mut current = self.0.lock();
      let changed = *current != status;
      *current = status;
      changed
   }
}

pub struct TransportSettings {
   pub websocket_url: String,
   pub reconnect: ReconnectConfig,
}

enum FrameAction {
   Snapshot(GameSnapshot),
   Ignore,
   Close,
}

enum Ended {
   /// The session dropped its sender; nothing more to do.
   Teardown,
   /// The server said goodbye.
   Closed,
   /// Read/write failure or the stream just stopped.
   Dropped,
}

/// `base * 2^attempt` capped at `max`, stretched by up to a quarter of itself. `jitter` is in `[0, 1)`.
pub fn backoff_delay(config: &ReconnectConfig, attempt: u32, jitter: f64) -> Duration {
   let exp = config.base_delay_ms.saturating_mul(1u64.checked_shl(attempt).unwrap_or(u64::MAX));
   let capped = exp.min(config.max_delay_ms);
   let extra = (capped as f64 * 0.25 * jitter.clamp(0.0, 1.0)) as u64;
   Duration::from_millis(capped + extra)
}

/// Parses a text frame; anything unreadable is logged and dropped.
fn handle_text(text: &str) -> Option<GameSnapshot> {
   match decode_snapshot(text) {
      Ok(snapshot) => Some(snapshot),
      Err(e) => {
         warn!("Dropping malformed frame: {}", e);
         trace!("{}", text);
         None
      }
   }
}

fn handle_frame(message: &Message) -> FrameAction {
   if message.is_close() {
      return FrameAction::Close;
   }
   match message.as_text() {
      Some(text) => handle_text(text).map(FrameAction::Snapshot).unwrap_or(FrameAction::Ignore),
      None => FrameAction::Ignore,
   }
}

struct Reporter {
   status: SharedStatus,
   events: mpsc::Sender<Event>,
}

impl Reporter {
   async fn report(&self, status: ConnectionStatus) {
      if self.status.replace(status) {
         info!("Connection {}", status);
         let _ = self.events.send(Event::Status(status)).await;
      }
   }
}

async fn pump<S>(ws: &mut S, events: &mpsc::Sender<Event>, outbound: &mut mpsc::Receiver<ClientMessage>) -> Ended
where
   S: Stream<Item = Result<Message, tokio_websockets::Error>> + Sink<Message, Error = tokio_websockets::Error> + Unpin,
{
   loop {
      tokio::select! {
         frame = ws.next() => match frame {
            Some(Ok(message)) => match handle_frame(&message) {
               FrameAction::Snapshot(snapshot) => {
                  if events.send(Event::Snapshot(snapshot)).await.is_err() {
                     let _ = ws.close().await;
                     return Ended::Teardown;
                  }
               }
               FrameAction::Ignore => (),
               FrameAction::Close => return Ended::Closed,
            },
            Some(Err(e)) => {
               warn!("Websocket read failed: {}", e);
               return Ended::Dropped;
            }
            None => return Ended::Dropped,
         },
         message = outbound.recv() => match message {
            Some(message) => {
               let text = message.encode();
               trace!("-> {}", text);
               if let Err(e) = ws.send(Message::text(text)).await {
                  warn!("Websocket write failed: {}", e);
                  return Ended::Dropped;
               }
            }
            None => {
               let _ = ws.close().await;
               return Ended::Teardown;
            }
         },
      }
   }
}

/// Waits out a reconnect delay. Anything sent meanwhile is dropped. Returns false on teardown.
async fn wait(delay: Duration, outbound: &mut mpsc::Receiver<ClientMessage>) -> bool {
   let sleep = tokio::time::sleep(delay);
   tokio::pin!(sleep);
   loop {
      tokio::select! {
         _ = &mut sleep => return true,
         message = outbound.recv() => match message {
            Some(message) => warn!("Not connected, dropping {:?}", message),
            None => return false,
         },
      }
   }
}

fn socket_url(base: &str, token: &str) -> Result<http::Uri> {
   let separator = if base.contains('?') { '&' } else { '?' };
   format!("{}{}token={}", base, separator, token)
      .parse::<http::Uri>()
      .with_context(|| format!("bad websocket url {}", base))
}

/// Owns the socket for the whole session, reconnecting with backoff until attempts run out.
pub async fn run(
   api: Arc<ApiClient>,
   settings: TransportSettings,
   events: mpsc::Sender<Event>,
   mut outbound: mpsc::Receiver<ClientMessage>,
   status: SharedStatus,
) {
   let reporter = Reporter {
      status,
      events: events.clone(),
   };
   reporter.report(ConnectionStatus::Connecting).await;

   let uri = match api.ws_token().await.and_then(|token| socket_url(&settings.websocket_url, &token)) {
      Ok(uri) => uri,
      Err(e) => {
         error!("Can't open the game socket: {:#}", e);
         reporter.report(ConnectionStatus::Error).await;
         return;
      }
   };

   let mut attempt = 0;
   loop {
      reporter.report(ConnectionStatus::Connecting).await;
      match ClientBuilder::from_uri(uri.clone()).connect().await {
         Ok((mut ws, _response)) => {
            attempt = 0;
            reporter.report(ConnectionStatus::Connected).await;
            match pump(&mut ws, &events, &mut outbound).await {
               Ended::Teardown => {
                  reporter.report(ConnectionStatus::Disconnected).await;
                  return;
               }
               Ended::Closed => {
                  info!("Server closed the connection");
                  reporter.report(ConnectionStatus::Disconnected).await;
                  return;
               }
               Ended::Dropped => reporter.report(ConnectionStatus::Disconnected).await,
            }
         }
         Err(e) => {
            warn!("Connecting to {} failed: {}", settings.websocket_url, e);
            reporter.report(ConnectionStatus::Disconnected).await;
         }
      }

      if attempt >= settings.reconnect.max_attempts {
         error!("Giving up after {} reconnect attempts", attempt);
         reporter.report(ConnectionStatus::Error).await;
         return;
      }
      let jitter: f64 = rand::thread_rng().gen();
      let delay = backoff_delay(&settings.reconnect, attempt, jitter);
      attempt += 1;
      info!("Reconnecting in {:?} (attempt {})", delay, attempt);
      if !wait(delay, &mut outbound).await {
         return;
      }
   }
}
