mod api;
mod config;
mod session;
mod transport;

use anyhow::Result;
use api::ApiClient;
use chesscg_lib::board::Color;
use chesscg_lib::loadout::{Loadout, LoadoutSlot, ModifierInfo};
use chesscg_lib::render::glyph;
use config::{Config, TokenSource};
use log::info;
use std::path::PathBuf;
use std::sync::Arc;
use structopt::StructOpt;

/// Terminal client for chess-cg
#[derive(StructOpt, Debug)]
#[structopt(name = "chesscg")]
struct Opt {
   /// Base url of the game backend
   #[structopt(long = "backend-url", env = "CHESSCG_BACKEND_URL")]
   backend_url: Option<String>,
   /// Websocket endpoint for live games
   #[structopt(long = "websocket-url", env = "CHESSCG_WEBSOCKET_URL")]
   websocket_url: Option<String>,
   /// Config file to use instead of the one in the user config dir
   #[structopt(long = "config", parse(from_os_str))]
   config: Option<PathBuf>,
   #[structopt(subcommand)]
   cmd: Command,
}

#[derive(StructOpt, Debug)]
enum Command {
   /// Join a game and play from stdin
   Play {
      /// Room to load player names from before the first update arrives
      #[structopt(long = "room")]
      room: Option<String>,
      /// Board orientation; by default the server decides
      #[structopt(long = "color")]
      color: Option<Color>,
      /// Pixel size of the virtual board `drag` works on
      #[structopt(long = "board-px", default_value = "640")]
      board_px: f32,
   },
   /// List the modifier catalog
   Modifiers,
   /// Show or edit your modifier loadout
   Loadout(LoadoutCommand),
}

#[derive(StructOpt, Debug)]
enum LoadoutCommand {
   Show,
   Add {
      color: Color,
      row: u8,
      col: u8,
      modifier: String,
   },
   Remove {
      color: Color,
      row: u8,
      col: u8,
      modifier: String,
   },
}

fn print_catalog(catalog: &[ModifierInfo]) {
   for m in catalog {
      let piece = m.applicable_piece.map(|k| k.name()).unwrap_or("any");
      let uses = if m.is_unlimited() {
         "unlimited".to_string()
      } else {
         format!("{} uses", m.uses)
      };
      println!("{:<16} {:>3}  {:<7} {:<10} {}", m.kind, m.score, piece, uses, m.description);
   }
}

fn print_loadout(loadout: &Loadout, catalog: &[ModifierInfo]) {
   let scores = loadout.scores(catalog);
   for color in [Color::White, Color::Black] {
      println!("{} (score {})", color, scores.get(color));
      let entries = loadout.entries(color);
      if entries.is_empty() {
         println!("   no modifiers");
      }
      for (slot, modifiers) in entries {
         println!(
            "   {} {} {}: {}",
            slot,
            glyph(slot.piece_kind(), color),
            slot.piece_kind(),
            modifiers.join(", ")
         );
      }
   }
}

async fn edit_loadout(api: &ApiClient, command: LoadoutCommand) -> Result<()> {
   let catalog = api.modifiers().await?;
   let mut loadout = api.loadout().await?;
   match command {
      LoadoutCommand::Show => (),
      LoadoutCommand::Add {
         color,
         row,
         col,
         modifier,
      } => {
         let slot = LoadoutSlot::checked(color, row, col)?;
         loadout.assign(&catalog, color, slot, &modifier)?;
         api.save_loadout(&loadout).await?;
         info!("Added {} to {} {}", modifier, color, slot);
      }
      LoadoutCommand::Remove {
         color,
         row,
         col,
         modifier,
      } => {
         let slot = LoadoutSlot::checked(color, row, col)?;
         if loadout.remove(color, slot, &modifier) {
            api.save_loadout(&loadout).await?;
            info!("Removed {} from {} {}", modifier, color, slot);
         } else {
            println!("{} is not on {} {}", modifier, color, slot);
         }
      }
   }
   print_loadout(&loadout, &catalog);
   Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
   pretty_env_logger::init();
   let opt = Opt::from_args();

   let config_path = match opt.config {
      Some(path) => path,
      None => Config::default_path()?,
   };
   let mut config = Config::load(&config_path)?;

   let (token, source) = config.access_token()?;
   if source == TokenSource::Prompt {
      config.remember_token(&config_path, &token)?;
   }
   config.apply_overrides(opt.backend_url, opt.websocket_url);
   let api = Arc::new(ApiClient::new(&config.backend_url, &token)?);

   match opt.cmd {
      Command::Play { room, color, board_px } => {
         let opts = session::PlayOptions { room, color, board_px };
         session::run(config, api, opts).await
      }
      Command::Modifiers => {
         print_catalog(&api.modifiers().await?);
         Ok(())
      }
      Command::Loadout(command) => edit_loadout(&api, command).await,
   }
}
