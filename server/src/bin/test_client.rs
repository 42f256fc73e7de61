use clap::Parser;
use futures::{SinkExt, StreamExt};
use pong_shared::{ClientMessage, Direction, ServerMessage, Slot};
use std::time::Duration;
use tokio::time::interval;
use tokio_tungstenite::{connect_async, tungstenite::Message};

/// Headless player that joins a slot and wiggles its paddle
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Server base URL
    #[arg(short, long, default_value = "ws://127.0.0.1:8080")]
    url: String,
    /// Slot to claim
    #[arg(short, long, default_value = "player1")]
    slot: String,
    /// Number of inputs to send before leaving
    #[arg(short = 'n', long, default_value_t = 20)]
    inputs: u32,
    /// Milliseconds between inputs
    #[arg(short, long, default_value_t = 100)]
    interval_ms: u64,
    /// Ask the server for a fresh match after connecting
    #[arg(short, long)]
    reset: bool,
}

fn encode(message: &ClientMessage) -> Result<Message, serde_json::Error> {
    Ok(Message::text(serde_json::to_string(message)?))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let slot: Slot = args.slot.parse()?;
    let url = format!("{}/ws/{}", args.url.trim_end_matches('/'), slot);

    println!("Connecting to {}", url);
    let (ws_stream, _) = connect_async(&url).await?;
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    if args.reset {
        println!("Requesting reset");
        ws_sender.send(encode(&ClientMessage::Reset)?).await?;
    }

    let mut input_timer = interval(Duration::from_millis(args.interval_ms.max(1)));
    let mut sent = 0;
    let mut states = 0u64;

    while sent < args.inputs {
        tokio::select! {
            frame = ws_receiver.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ServerMessage>(&text) {
                            Ok(ServerMessage::Connected { player_id, message }) => {
                                println!("[{}] {}", player_id, message);
                            }
                            Ok(ServerMessage::GameState { data }) => {
                                states += 1;
                                if states % 30 == 1 {
                                    if data.game_active {
                                        println!(
                                            "state #{}: ball=({:.1}, {:.1}) paddle y={:.1} score {}-{}",
                                            states, data.ball.x, data.ball.y,
                                            data.paddle(slot).y, data.score1, data.score2
                                        );
                                    } else {
                                        println!("state #{}: waiting for {}", states, slot.opponent());
                                    }
                                }
                            }
                            Ok(ServerMessage::PlayerDisconnected { message, .. }) => {
                                println!("{}", message);
                            }
                            Err(e) => println!("Failed to parse server message: {}", e),
                        }
                    }
                    Some(Ok(Message::Close(frame))) => {
                        match frame {
                            Some(frame) => println!(
                                "Server closed connection: {} ({})",
                                frame.reason.as_str(),
                                u16::from(frame.code)
                            ),
                            None => println!("Server closed connection"),
                        }
                        return Ok(());
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        println!("Connection error: {}", e);
                        return Ok(());
                    }
                    None => {
                        println!("Connection ended");
                        return Ok(());
                    }
                }
            }
            _ = input_timer.tick() => {
                let direction = if sent % 2 == 0 { Direction::Up } else { Direction::Down };
                ws_sender.send(encode(&ClientMessage::input(direction))?).await?;
                sent += 1;
            }
        }
    }

    println!("Sent {} inputs, received {} states; leaving", sent, states);
    ws_sender.send(Message::Close(None)).await?;

    Ok(())
}
