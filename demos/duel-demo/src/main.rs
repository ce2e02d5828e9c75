//! Plays one game of Gobang through the lobby and logs what a connected
//! client would have been pushed.
//!
//! ```text
//! RUST_LOG=debug cargo run -p duel-demo
//! ```

use std::sync::Arc;

use duelhall::prelude::*;

/// Ann lays a row along y = 7 while Bob answers one line below.
const ANN: [(i32, i32); 5] = [(5, 7), (6, 7), (7, 7), (8, 7), (9, 7)];
const BOB: [(i32, i32); 4] = [(5, 8), (6, 8), (7, 8), (8, 8)];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let users = Arc::new(UserRegistry::new());
    let lobby = LobbyBuilder::new().build(Arc::clone(&users), RoomHub::default());
    let clock = lobby.spawn_turn_clock();

    let ann = users.register("ann", "ann-password")?;
    let bob = users.register("bob", "bob-password")?;

    let room = lobby
        .create_room(ann.id, "demo table", GameType::Gobang, false)
        .await?;
    let room_id = room.room.id;
    let mut events = lobby.push().subscribe(room_id);
    tracing::info!(%room_id, host = %ann.username, "room created");

    lobby.join_room(bob.id, room_id, None).await?;
    lobby.send_chat(bob.id, room_id, "good luck").await?;
    lobby.start_game(ann.id, room_id).await?;

    let mut last = None;
    for turn in 0..ANN.len() + BOB.len() {
        let (player, (x, y)) = if turn % 2 == 0 {
            (ann.id, ANN[turn / 2])
        } else {
            (bob.id, BOB[turn / 2])
        };
        let view = lobby
            .submit_move(player, room_id, GameMove::Stone { x, y })
            .await?;
        let finished = view.room.status == RoomPhase::Finished;
        last = Some(view);
        if finished {
            break;
        }
    }

    if let Some(game) = last.and_then(|view| view.room.game) {
        let winner = game
            .winner_id
            .and_then(|id| users.find(id).ok())
            .map(|profile| profile.username);
        tracing::info!(moves = game.moves.len(), ?winner, "game over");
    }

    while let Ok(bytes) = events.try_recv() {
        let event: serde_json::Value = serde_json::from_slice(&bytes)?;
        tracing::info!(
            kind = %event["type"],
            status = %event["room"]["status"],
            "pushed"
        );
    }

    clock.abort();
    lobby.shutdown().await;
    Ok(())
}
