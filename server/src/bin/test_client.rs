//! Scripted client for poking a running server by hand: joins a room, says
//! hello, tries to start the game, and prints every event it receives.

use clap::Parser;
use server::network::{read_message, write_message};
use shared::protocol::{ClientEvent, ClientMessage, ServerEvent, ServerMessage};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;

#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Server address
    #[clap(short, long, default_value = "127.0.0.1:8080")]
    address: String,
    /// Room code to join
    #[clap(short, long, default_value = "LOBBY1")]
    room: String,
    /// Username to join with
    #[clap(short, long, default_value = "tester")]
    username: String,
    /// Also ask the server to start the game
    #[clap(long)]
    start: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let stream = TcpStream::connect(&args.address).await?;
    let (mut reader, mut writer) = stream.into_split();
    println!("Connected to {}", args.address);

    let script = {
        let mut script = vec![
            ClientEvent::RoomJoin {
                username: args.username.clone(),
            },
            ClientEvent::ChatSend {
                text: format!("{} is here", args.username),
                author: args.username.clone(),
            },
        ];
        if args.start {
            script.push(ClientEvent::GameStart);
            script.push(ClientEvent::CardDraw);
        }
        script
    };

    for event in script {
        write_message(
            &mut writer,
            &ClientMessage {
                room_id: args.room.clone(),
                event,
            },
        )
        .await?;
    }

    // Print whatever comes back until the server goes quiet
    loop {
        match timeout(
            Duration::from_secs(5),
            read_message::<_, ServerMessage>(&mut reader),
        )
        .await
        {
            Ok(Ok(Some(message))) => print_event(&message),
            Ok(Ok(None)) => {
                println!("Server closed the connection");
                break;
            }
            Ok(Err(e)) => {
                eprintln!("Read error: {}", e);
                break;
            }
            Err(_) => {
                println!("No events for 5s, leaving room");
                write_message(
                    &mut writer,
                    &ClientMessage {
                        room_id: args.room.clone(),
                        event: ClientEvent::RoomLeave,
                    },
                )
                .await?;
                break;
            }
        }
    }

    Ok(())
}

fn print_event(message: &ServerMessage) {
    match &message.event {
        ServerEvent::PlayerJoined { id, username } => {
            println!("[{}] {} joined as {}", message.room_id, id, username)
        }
        ServerEvent::PlayerLeft { id } => println!("[{}] {} left", message.room_id, id),
        ServerEvent::PlayerState(state) => println!(
            "[{}] you are {} holding {:?}",
            message.room_id,
            state.your_id,
            state.your_hand.iter().map(|c| c.value).collect::<Vec<_>>()
        ),
        ServerEvent::GameState(state) => println!(
            "[{}] {:?}, {} players, {} cards in deck",
            message.room_id,
            state.status,
            state.players.len(),
            state.deck_size
        ),
        ServerEvent::GameStarted(state) => println!(
            "[{}] game started, {} goes first",
            message.room_id,
            state.current_turn.as_deref().unwrap_or("nobody")
        ),
        ServerEvent::CardPlaceValid => println!("[{}] placement accepted", message.room_id),
        ServerEvent::CardPlaceInvalid => println!("[{}] placement rejected", message.room_id),
        ServerEvent::GameWin => println!("[{}] the deck is empty, you win", message.room_id),
        ServerEvent::GameLose { remaining_cards } => println!(
            "[{}] game over with {} cards left",
            message.room_id, remaining_cards
        ),
        ServerEvent::ChatReceive { text, author } => {
            println!("[{}] <{}> {}", message.room_id, author, text)
        }
        ServerEvent::Error { error } => println!("[{}] error: {}", message.room_id, error),
    }
}
