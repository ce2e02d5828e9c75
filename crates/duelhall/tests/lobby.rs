//! End-to-end tests through the lobby: rooms, clocks, and push events.
//!
//! Clock tests run with paused time. Sleeping past a deadline lets the
//! runtime fire the timer and finish the resulting room work before the
//! test resumes.

use std::sync::Arc;
use std::time::Duration;

use duelhall::prelude::*;
use duelhall::TimerKey;
use tokio::sync::mpsc::UnboundedReceiver;

// =========================================================================
// Helpers
// =========================================================================

type TestLobby = Lobby<Arc<UserRegistry>, RoomHub>;

struct Table {
    lobby: TestLobby,
    host: UserId,
    guest: UserId,
    room: RoomId,
}

fn lobby() -> (TestLobby, Arc<UserRegistry>) {
    let users = Arc::new(UserRegistry::new());
    let lobby = LobbyBuilder::new().build(Arc::clone(&users), RoomHub::default());
    (lobby, users)
}

/// Host and guest seated in a fresh room; no game yet.
async fn table(game_type: GameType) -> Table {
    let (lobby, users) = lobby();
    let host = users.register("host", "secret").unwrap().id;
    let guest = users.register("guest", "secret").unwrap().id;
    let room = lobby
        .create_room(host, "table", game_type, false)
        .await
        .unwrap()
        .room
        .id;
    lobby.join_room(guest, room, None).await.unwrap();
    Table {
        lobby,
        host,
        guest,
        room,
    }
}

fn secs(n: u64) -> Duration {
    Duration::from_secs(n)
}

fn soldier_push() -> GameMove {
    GameMove::Piece {
        from_row: 6,
        from_col: 4,
        to_row: 5,
        to_col: 4,
    }
}

fn drain(rx: &mut UnboundedReceiver<Vec<u8>>) -> Vec<serde_json::Value> {
    std::iter::from_fn(|| rx.try_recv().ok())
        .map(|bytes| serde_json::from_slice(&bytes).unwrap())
        .collect()
}

// =========================================================================
// Scenarios
// =========================================================================

#[tokio::test]
async fn test_start_and_first_chess_move_passes_turn() {
    let t = table(GameType::ChineseChess).await;

    let started = t.lobby.start_game(t.host, t.room).await.unwrap();
    assert_eq!(started.room.status, RoomPhase::InProgress);
    assert_eq!(started.room.current_player_id, Some(t.host));
    let names: Vec<_> = started.players.iter().map(|p| p.username.as_str()).collect();
    assert_eq!(names, ["host", "guest"]);

    let moved = t.lobby.submit_move(t.host, t.room, soldier_push()).await.unwrap();

    assert_eq!(moved.room.current_player_id, Some(t.guest));
    let json = serde_json::to_value(&moved).unwrap();
    assert_eq!(json["game"]["moves"][0]["piece"], "SOLDIER");
    assert_eq!(json["game"]["current_player_color"], "BLACK");
}

#[tokio::test(start_paused = true)]
async fn test_leave_mid_game_and_rejoin_within_grace() {
    let t = table(GameType::ChineseChess).await;
    t.lobby.start_game(t.host, t.room).await.unwrap();

    let left = t.lobby.leave_room(t.guest, t.room).await.unwrap();
    let LeaveResult::Room(view) = left else {
        panic!("room should survive a mid-game leave");
    };
    assert_eq!(view.room.status, RoomPhase::InProgress);
    assert_eq!(view.room.player_ids, vec![t.host, t.guest]);
    assert_eq!(view.room.disconnected_ids, vec![t.guest]);
    assert!(t.lobby.timer_armed(TimerKey::Disconnect(t.room, t.guest)));

    tokio::time::sleep(secs(10)).await;
    let back = t.lobby.join_room(t.guest, t.room, None).await.unwrap();

    assert!(back.room.disconnected_ids.is_empty());
    assert!(!t.lobby.timer_armed(TimerKey::Disconnect(t.room, t.guest)));

    tokio::time::sleep(secs(60)).await;
    let room = t.lobby.room(t.room).await.unwrap();
    assert!(room.room.started, "the game was left untouched");
}

#[tokio::test(start_paused = true)]
async fn test_grace_lapse_resets_room_to_waiting() {
    let t = table(GameType::ChineseChess).await;
    t.lobby.start_game(t.host, t.room).await.unwrap();
    t.lobby.leave_room(t.guest, t.room).await.unwrap();

    tokio::time::sleep(secs(29)).await;
    assert!(t.lobby.room(t.room).await.unwrap().room.started);

    tokio::time::sleep(secs(2)).await;
    let room = t.lobby.room(t.room).await.unwrap().room;

    assert_eq!(room.status, RoomPhase::Waiting);
    assert!(!room.started);
    assert!(room.game.is_none());
    assert_eq!(room.player_ids, vec![t.host]);
    assert!(!t.lobby.timer_armed(TimerKey::Disconnect(t.room, t.guest)));
}

#[tokio::test(start_paused = true)]
async fn test_turn_clock_forfeits_silent_player() {
    let t = table(GameType::Gobang).await;
    let clock = t.lobby.spawn_turn_clock();
    t.lobby.start_game(t.host, t.room).await.unwrap();

    tokio::time::sleep(Duration::from_millis(14_500)).await;
    assert_eq!(t.lobby.room(t.room).await.unwrap().room.status, RoomPhase::InProgress);

    tokio::time::sleep(secs(2)).await;
    let room = t.lobby.room(t.room).await.unwrap().room;

    assert_eq!(room.status, RoomPhase::Finished);
    assert!(room.turn_deadline_ms.is_none());
    assert_eq!(room.game.unwrap().winner_id, Some(t.guest));

    t.lobby.shutdown().await;
    clock.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_poll_turn_timeouts_counts_forfeits() {
    let t = table(GameType::Gobang).await;
    t.lobby.start_game(t.host, t.room).await.unwrap();

    assert_eq!(t.lobby.poll_turn_timeouts().await, 0);
    tokio::time::sleep(secs(15)).await;
    assert_eq!(t.lobby.poll_turn_timeouts().await, 1);
    assert_eq!(t.lobby.poll_turn_timeouts().await, 0);
}

#[tokio::test]
async fn test_gobang_five_in_row_wins_and_pushes_updates() {
    let t = table(GameType::Gobang).await;
    let mut events = t.lobby.push().subscribe(t.room);
    t.lobby.start_game(t.host, t.room).await.unwrap();

    for y in 7..11 {
        t.lobby
            .submit_move(t.host, t.room, GameMove::Stone { x: 7, y })
            .await
            .unwrap();
        t.lobby
            .submit_move(t.guest, t.room, GameMove::Stone { x: 0, y })
            .await
            .unwrap();
    }
    let done = t
        .lobby
        .submit_move(t.host, t.room, GameMove::Stone { x: 7, y: 11 })
        .await
        .unwrap();

    assert_eq!(done.room.status, RoomPhase::Finished);
    let game = done.room.game.unwrap();
    assert_eq!(game.winner_id, Some(t.host));
    assert_eq!(game.moves.len(), 9);

    let pushed = drain(&mut events);
    assert_eq!(pushed.len(), 10, "one update for the start and one per move");
    let last = pushed.last().unwrap();
    assert_eq!(last["type"], "roomUpdate");
    assert_eq!(last["room"]["status"], "FINISHED");
    assert_eq!(last["room"]["players"][0]["username"], "host");
}

#[tokio::test(start_paused = true)]
async fn test_host_restarts_finished_game() {
    let t = table(GameType::Gobang).await;
    t.lobby.start_game(t.host, t.room).await.unwrap();
    t.lobby
        .submit_move(t.host, t.room, GameMove::Stone { x: 7, y: 7 })
        .await
        .unwrap();
    tokio::time::sleep(secs(15)).await;
    t.lobby.poll_turn_timeouts().await;

    let err = t.lobby.restart_game(t.guest, t.room).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    let view = t.lobby.restart_game(t.host, t.room).await.unwrap();

    assert_eq!(view.room.status, RoomPhase::InProgress);
    let game = view.room.game.unwrap();
    assert_eq!(game.player_order, vec![t.host, t.guest]);
    assert!(game.moves.is_empty());
    assert_eq!(game.current_player_id, Some(t.host));
}

// =========================================================================
// Empty-room deletion
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_empty_room_is_deleted_after_ttl() {
    let (lobby, users) = lobby();
    let host = users.register("solo", "secret").unwrap().id;
    let room = lobby.create_room(host, "solo", GameType::Gobang, false).await.unwrap().room.id;
    let mut events = lobby.push().subscribe(room);

    let left = lobby.leave_room(host, room).await.unwrap();
    assert!(matches!(
        left,
        LeaveResult::ScheduledDeletion { ttl, .. } if ttl == secs(30)
    ));

    tokio::time::sleep(secs(29)).await;
    assert_eq!(lobby.room_count(), 1);

    tokio::time::sleep(secs(2)).await;
    assert_eq!(lobby.room_count(), 0);
    let err = lobby.room(room).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(events.recv().await.is_none(), "subscribers are released");
}

#[tokio::test(start_paused = true)]
async fn test_join_cancels_pending_deletion() {
    let (lobby, users) = lobby();
    let host = users.register("first", "secret").unwrap().id;
    let next = users.register("second", "secret").unwrap().id;
    let room = lobby.create_room(host, "r", GameType::Gobang, false).await.unwrap().room.id;
    lobby.leave_room(host, room).await.unwrap();

    tokio::time::sleep(secs(10)).await;
    let view = lobby.join_room(next, room, None).await.unwrap();
    assert_eq!(view.room.host_user_id, next);
    assert!(!lobby.timer_armed(TimerKey::EmptyRoom(room)));

    tokio::time::sleep(secs(60)).await;
    assert_eq!(lobby.room_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_both_players_gone_resets_then_deletes() {
    let t = table(GameType::Gobang).await;
    t.lobby.start_game(t.host, t.room).await.unwrap();
    t.lobby.leave_room(t.host, t.room).await.unwrap();
    t.lobby.leave_room(t.guest, t.room).await.unwrap();

    tokio::time::sleep(secs(31)).await;
    assert_eq!(t.lobby.room_count(), 1);
    assert!(t.lobby.timer_armed(TimerKey::EmptyRoom(t.room)));
    let room = t.lobby.room(t.room).await.unwrap().room;
    assert!(room.player_ids.is_empty());

    tokio::time::sleep(secs(30)).await;
    assert_eq!(t.lobby.room_count(), 0);
}

// =========================================================================
// Access control and settings
// =========================================================================

#[tokio::test]
async fn test_private_room_needs_invite_code() {
    let (lobby, users) = lobby();
    let host = users.register("host", "secret").unwrap().id;
    let guest = users.register("guest", "secret").unwrap().id;
    let created = lobby.create_room(host, "secret", GameType::Gobang, true).await.unwrap();
    let code = created.room.invite_code.clone().unwrap();

    let err = lobby.join_room(guest, created.room.id, None).await.unwrap_err();
    assert_eq!(err.status_code(), 403);

    let joined = lobby.join_room(guest, created.room.id, Some(code)).await.unwrap();
    assert_eq!(joined.players.len(), 2);
}

#[tokio::test]
async fn test_unknown_user_cannot_join() {
    let t = table(GameType::Gobang).await;
    let err = t.lobby.join_room(UserId(99), t.room, None).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_third_player_gets_room_full() {
    let t = table(GameType::Gobang).await;
    let third = t.lobby.users().register("third", "secret").unwrap().id;

    let err = t.lobby.join_room(third, t.room, None).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert!(err.to_string().contains("full"));
}

#[tokio::test]
async fn test_start_with_one_player_is_conflict() {
    let (lobby, users) = lobby();
    let host = users.register("host", "secret").unwrap().id;
    let room = lobby.create_room(host, "r", GameType::Gobang, false).await.unwrap().room.id;

    let err = lobby.start_game(host, room).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Conflict);
}

#[tokio::test]
async fn test_update_settings_renames_and_switches_game() {
    let t = table(GameType::Gobang).await;

    let view = t
        .lobby
        .update_settings(
            t.host,
            t.room,
            RoomSettings {
                name: Some("rematch".into()),
                game_type: Some(GameType::ChineseChess),
                private: None,
            },
        )
        .await
        .unwrap();

    assert_eq!(view.room.name, "rematch");
    assert_eq!(view.room.game_type_name, "Chinese Chess");
}

#[tokio::test]
async fn test_delete_room_is_host_only() {
    let t = table(GameType::Gobang).await;
    let mut events = t.lobby.push().subscribe(t.room);

    let err = t.lobby.delete_room(t.guest, t.room).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    t.lobby.delete_room(t.host, t.room).await.unwrap();

    assert_eq!(t.lobby.room_count(), 0);
    assert!(events.recv().await.is_none());
}

// =========================================================================
// Listing, chat, catalog
// =========================================================================

#[tokio::test]
async fn test_list_rooms_filters_by_game() {
    let (lobby, users) = lobby();
    let host = users.register("host", "secret").unwrap().id;
    lobby.create_room(host, "a", GameType::Gobang, false).await.unwrap();
    lobby.create_room(host, "b", GameType::ChineseChess, false).await.unwrap();

    assert_eq!(lobby.list_rooms(None).await.unwrap().len(), 2);
    let chess = lobby.list_rooms(Some(GameType::ChineseChess)).await.unwrap();
    assert_eq!(chess.len(), 1);
    assert_eq!(chess[0].room.name, "b");
}

#[tokio::test]
async fn test_chat_is_pushed_and_kept() {
    let t = table(GameType::Gobang).await;
    let mut events = t.lobby.push().subscribe(t.room);

    let first = t.lobby.send_chat(t.host, t.room, "good luck").await.unwrap();
    t.lobby.send_chat(t.guest, t.room, "you too").await.unwrap();

    let pushed = drain(&mut events);
    assert_eq!(pushed.len(), 2);
    assert_eq!(pushed[0]["type"], "chatMessage");
    assert_eq!(pushed[0]["message"]["content"], "good luck");

    let later = t.lobby.chat_history(t.guest, t.room, first.id).await.unwrap();
    assert_eq!(later.len(), 1);
    assert_eq!(later[0].content, "you too");

    let err = t.lobby.send_chat(t.host, t.room, "   ").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn test_game_catalog_lists_both_games() {
    let (lobby, _) = lobby();
    let catalog = lobby.game_catalog();
    let codes: Vec<_> = catalog.iter().map(|g| g.code).collect();
    assert_eq!(codes, [GameType::Gobang, GameType::ChineseChess]);
    assert_eq!(catalog[1].name, "Chinese Chess");
}

#[tokio::test]
async fn test_shutdown_stops_rooms() {
    let t = table(GameType::Gobang).await;

    t.lobby.shutdown().await;

    assert_eq!(t.lobby.room_count(), 0);
}
