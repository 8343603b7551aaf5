//! Terminal client for a tilewire game.
//!
//! Connects over plain `ws://`. This binary enables no TLS backend, so
//! it has no way to reach a `wss://` server.
//!
//! Prints every client event as a JSON line on stdout and sends each
//! line typed on stdin as a chat message. Lines starting with `/` are
//! game actions:
//!
//! ```text
//! /turn            take a turn
//! /shout           shout
//! /tiles <n>       ask for an n-tile game
//! /move <t> <x> <y>
//! /state           print a snapshot
//! /quit            leave
//! ```

use clap::Parser;
use tilewire::prelude::*;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tilewire-chat", version, about)]
struct Cli {
    /// Game server host
    #[arg(long, default_value = "localhost")]
    host: String,

    /// Public room to join
    #[arg(short, long, default_value = "default")]
    room: String,

    /// Invite link or bare token of a private conversation. Takes
    /// precedence over --room.
    #[arg(short, long)]
    invite: Option<String>,

    /// Display name
    #[arg(short, long, default_value = "Player")]
    name: String,
}

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

#[derive(Debug, PartialEq)]
enum Input {
    Chat(String),
    Turn,
    Shout,
    Tiles(u8),
    Move { tile: u8, x: i16, y: i16 },
    State,
    Quit,
}

fn parse_input(line: &str) -> Result<Input, String> {
    let Some(command) = line.strip_prefix('/') else {
        return Ok(Input::Chat(line.to_owned()));
    };
    let mut words = command.split_whitespace();
    let input = match words.next() {
        Some("turn") => Input::Turn,
        Some("shout") => Input::Shout,
        Some("tiles") => Input::Tiles(number(words.next())?),
        Some("move") => Input::Move {
            tile: number(words.next())?,
            x: number(words.next())?,
            y: number(words.next())?,
        },
        Some("state") => Input::State,
        Some("quit") => Input::Quit,
        _ => return Err(format!("unknown command: {line}")),
    };
    match words.next() {
        Some(extra) => Err(format!("unexpected argument: {extra}")),
        None => Ok(input),
    }
}

fn number<T: std::str::FromStr>(word: Option<&str>) -> Result<T, String> {
    let word = word.ok_or("missing argument")?;
    word.parse().map_err(|_| format!("not a valid number: {word}"))
}

fn parse_invite(invite: &str) -> Option<ConversationId> {
    id_token::decode_url(invite)
        .or_else(|| id_token::from_query(invite))
        .map(ConversationId)
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let builder = ClientConfig::builder()
        .host(cli.host)
        .player_name(cli.name);
    let builder = match cli.invite.as_deref() {
        Some(invite) => {
            let id = parse_invite(invite)
                .ok_or_else(|| format!("not an invite link: {invite}"))?;
            builder.conversation(id)
        }
        None => builder.room(cli.room),
    };

    let (client, mut events) = Client::start(WebSocketConnector, builder.build());
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(event) => println!("{}", serde_json::to_string(&event)?),
                None => break,
            },
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                let result = match parse_input(&line) {
                    Ok(Input::Chat(text)) => client.send_message(&text),
                    Ok(Input::Turn) => client.take_turn().await,
                    Ok(Input::Shout) => client.shout().await,
                    Ok(Input::Tiles(n)) => client.set_tile_capacity(n).await,
                    Ok(Input::Move { tile, x, y }) => client.move_tile(tile, x, y),
                    Ok(Input::State) => match client.snapshot().await {
                        Ok(snapshot) => {
                            println!("{}", serde_json::to_string(&snapshot)?);
                            Ok(())
                        }
                        Err(e) => Err(e),
                    },
                    Ok(Input::Quit) => break,
                    Err(e) => {
                        warn!("{e}");
                        continue;
                    }
                };
                if let Err(e) = result {
                    warn!(error = %e, "action failed");
                }
            }
        }
    }

    info!("leaving");
    if client.is_running() {
        client.leave().await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_input_chat() {
        assert_eq!(parse_input("saluton"), Ok(Input::Chat("saluton".into())));
    }

    #[test]
    fn test_parse_input_commands() {
        assert_eq!(parse_input("/turn"), Ok(Input::Turn));
        assert_eq!(parse_input("/tiles 50"), Ok(Input::Tiles(50)));
        assert_eq!(
            parse_input("/move 3 -12 40"),
            Ok(Input::Move {
                tile: 3,
                x: -12,
                y: 40
            })
        );
    }

    #[test]
    fn test_parse_input_rejects_bad_arguments() {
        assert!(parse_input("/tiles").is_err());
        assert!(parse_input("/tiles 300").is_err());
        assert!(parse_input("/turn now").is_err());
        assert!(parse_input("/dance").is_err());
    }

    #[test]
    fn test_cli_has_no_tls_flag() {
        assert!(Cli::try_parse_from(["tilewire-chat", "--secure"]).is_err());
        let cli = Cli::try_parse_from(["tilewire-chat", "--host", "gemelo.org"])
            .unwrap();
        assert_eq!(cli.host, "gemelo.org");
    }

    #[test]
    fn test_parse_invite_accepts_link_and_token() {
        let id = ConversationId(0xcafe_cafe_cafe_cafe);
        assert_eq!(parse_invite("https://gemelo.org/j/yv7K_sr-yvO"), Some(id));
        assert_eq!(parse_invite("yv7K_sr-yvO"), Some(id));
        assert_eq!(parse_invite("https://example.com/j/yv7K_sr-yvO"), None);
    }
}
