//! Session actor driven on a paused clock.

use std::time::Duration;

use conquest_core::bot::BotDifficulty;
use conquest_core::prelude::*;
use conquest_server::lobby::{JoinKind, JoinRejection, SessionMode};
use conquest_server::network::{ActionReply, Envelope, Recipient, ServerEvent};
use conquest_server::session::{self, SessionHandle};
use conquest_server::{ServerConfig, ServerError};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

fn start() -> (SessionHandle, JoinHandle<()>) {
    session::spawn(ServerConfig {
        seed: 7,
        ..ServerConfig::default()
    })
    .unwrap()
}

fn drain(events: &mut broadcast::Receiver<Envelope>) -> Vec<Envelope> {
    let mut out = Vec::new();
    while let Ok(envelope) = events.try_recv() {
        out.push(envelope);
    }
    out
}

#[tokio::test(start_paused = true)]
async fn test_multiplayer_joins_share_one_world() {
    let (handle, _task) = start();
    let mut events = handle.subscribe();

    let alice = handle.join("Alice", JoinKind::Multiplayer).await.unwrap();
    let bob = handle.join("Bob", JoinKind::Multiplayer).await.unwrap();
    assert_ne!(alice.player, bob.player);
    assert!(alice.bots.is_empty());
    assert_eq!(handle.mode().await.unwrap(), SessionMode::Multiplayer);

    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.players.len(), 2);

    let first = events.recv().await.unwrap();
    assert_eq!(
        first.event,
        ServerEvent::PlayerJoined {
            player_id: alice.player,
            name: "Alice".to_string(),
            is_bot: false,
        }
    );
    assert!(matches!(
        events.recv().await.unwrap().event,
        ServerEvent::GameState(_)
    ));
}

#[tokio::test(start_paused = true)]
async fn test_single_player_is_private_and_resets_when_empty() {
    let (handle, _task) = start();

    let ticket = handle
        .join(
            "Solo",
            JoinKind::SinglePlayer {
                bots: 3,
                difficulty: BotDifficulty::Medium,
            },
        )
        .await
        .unwrap();
    assert_eq!(ticket.bots.len(), 3);
    assert_eq!(handle.mode().await.unwrap(), SessionMode::SinglePlayer);
    assert_eq!(handle.snapshot().await.unwrap().players.len(), 4);

    let err = handle
        .join("Intruder", JoinKind::Multiplayer)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ServerError::JoinRejected(JoinRejection::SinglePlayerInProgress)
    ));

    assert!(handle.leave(ticket.player).await.unwrap());
    assert_eq!(handle.mode().await.unwrap(), SessionMode::Idle);
    let snapshot = handle.snapshot().await.unwrap();
    assert!(snapshot.players.is_empty());
    assert!(snapshot.tiles.iter().all(|t| t.owner.is_none()));

    assert!(!handle.leave(ticket.player).await.unwrap());
}

#[tokio::test(start_paused = true)]
async fn test_multiplayer_blocks_single_player() {
    let (handle, _task) = start();
    handle.join("Alice", JoinKind::Multiplayer).await.unwrap();

    let err = handle
        .join(
            "Solo",
            JoinKind::SinglePlayer {
                bots: 1,
                difficulty: BotDifficulty::Easy,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ServerError::JoinRejected(JoinRejection::MultiplayerInProgress)
    ));
    assert!(handle
        .start_bot_match(vec![BotDifficulty::Hard])
        .await
        .is_err());
}

#[tokio::test(start_paused = true)]
async fn test_actions_reply_and_publish() {
    let (handle, _task) = start();
    let alice = handle.join("Alice", JoinKind::Multiplayer).await.unwrap().player;
    let mut events = handle.subscribe();

    let allocate = ActionMessage::new(
        alice,
        &Action::AllocatePopulation {
            workers: 3,
            troops: 7,
        },
    )
    .unwrap();
    let reply = handle.submit(alice, allocate).await.unwrap();
    assert_eq!(reply, ActionReply::ok());
    match events.recv().await.unwrap().event {
        ServerEvent::GameState(snapshot) => {
            assert_eq!(snapshot.player(alice).unwrap().troops, 7);
        }
        other => panic!("expected a snapshot, got {other:?}"),
    }

    let forged = ActionMessage::new(
        PlayerId(99),
        &Action::AllocatePopulation {
            workers: 5,
            troops: 5,
        },
    )
    .unwrap();
    let reply = handle.submit(alice, forged).await.unwrap();
    assert!(!reply.success);
    let failure = events.recv().await.unwrap();
    assert_eq!(failure.recipient, Recipient::Player(alice));
    assert!(matches!(failure.event, ServerEvent::ActionFailed { .. }));

    let frame = format!(
        r#"{{"type":"SELF_DESTRUCT","playerId":{},"data":{{}}}}"#,
        alice.0
    );
    let reply = handle.submit_json(alice, &frame).await.unwrap();
    assert!(!reply.success);
    assert!(reply.reason.unwrap().contains("SELF_DESTRUCT"));

    let reply = handle.submit_json(alice, "not json").await.unwrap();
    assert!(!reply.success);
    assert_eq!(handle.snapshot().await.unwrap().player(alice).unwrap().troops, 7);
}

#[tokio::test(start_paused = true)]
async fn test_ticks_follow_the_clock() {
    let (handle, _task) = start();
    let mut events = handle.subscribe();

    tokio::time::sleep(Duration::from_millis(3_500)).await;
    assert_eq!(handle.snapshot().await.unwrap().tick, 3);

    let ticks: Vec<u64> = drain(&mut events)
        .into_iter()
        .filter_map(|e| match e.event {
            ServerEvent::GameState(snapshot) => Some(snapshot.tick),
            _ => None,
        })
        .collect();
    assert_eq!(ticks, vec![1, 2, 3]);
}

#[tokio::test(start_paused = true)]
async fn test_bot_match_plays_on() {
    let (handle, _task) = start();
    let bots = handle
        .start_bot_match(vec![BotDifficulty::Hard, BotDifficulty::Medium])
        .await
        .unwrap();
    assert_eq!(bots.len(), 2);
    assert_eq!(handle.mode().await.unwrap(), SessionMode::BotMatch);

    let err = handle
        .join("Latecomer", JoinKind::Multiplayer)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ServerError::JoinRejected(JoinRejection::BotMatchInProgress)
    ));
    assert!(handle
        .start_bot_match(vec![BotDifficulty::Easy])
        .await
        .is_err());

    tokio::time::sleep(Duration::from_millis(20_500)).await;
    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.tick, 20);
    assert_eq!(snapshot.players.len(), 2);
    assert!(snapshot.players.iter().all(|p| p.is_bot));
}

#[tokio::test(start_paused = true)]
async fn test_reset_ends_a_bot_match() {
    let (handle, _task) = start();
    handle
        .start_bot_match(vec![BotDifficulty::Easy])
        .await
        .unwrap();
    handle.reset(None).await.unwrap();
    assert_eq!(handle.mode().await.unwrap(), SessionMode::Idle);

    let alice = handle.join("Alice", JoinKind::Multiplayer).await.unwrap();
    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.players.len(), 1);
    assert_eq!(snapshot.players[0].id, alice.player);
}

#[tokio::test(start_paused = true)]
async fn test_each_bot_action_gets_its_own_snapshot() {
    let (handle, _task) = start();
    let mut events = handle.subscribe();
    let bots = handle
        .start_bot_match(vec![BotDifficulty::Hard, BotDifficulty::Hard])
        .await
        .unwrap();
    let (first, second) = (bots[0], bots[1]);

    // Both bots first decide at two seconds of game time.
    tokio::time::sleep(Duration::from_millis(2_300)).await;
    let workers = |snapshot: &WorldSnapshot, bot| snapshot.player(bot).unwrap().workers;
    let at_two: Vec<WorldSnapshot> = drain(&mut events)
        .into_iter()
        .filter_map(|e| match e.event {
            ServerEvent::GameState(snapshot) if snapshot.tick == 2 => Some(snapshot),
            _ => None,
        })
        .collect();

    assert!(at_two.len() >= 3, "expected tick and per-action snapshots");
    assert_eq!(workers(&at_two[0], first), 5);
    assert!(at_two
        .iter()
        .any(|s| workers(s, first) == 4 && workers(s, second) == 5));
    let last = at_two.last().unwrap();
    assert_eq!((workers(last, first), workers(last, second)), (4, 4));
}

#[tokio::test(start_paused = true)]
async fn test_explicit_reset_clears_players() {
    let (handle, _task) = start();
    handle.join("Alice", JoinKind::Multiplayer).await.unwrap();
    handle.reset(Some(123)).await.unwrap();

    let snapshot = handle.snapshot().await.unwrap();
    assert!(snapshot.players.is_empty());
    assert_eq!(handle.mode().await.unwrap(), SessionMode::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_stops_the_task() {
    let (handle, task) = start();
    handle.shutdown();
    task.await.unwrap();

    assert!(handle.is_closed());
    assert!(matches!(
        handle.snapshot().await,
        Err(ServerError::SessionClosed)
    ));
}

#[tokio::test(start_paused = true)]
async fn test_dropping_every_handle_stops_the_task() {
    let (handle, task) = start();
    drop(handle);
    task.await.unwrap();
}
