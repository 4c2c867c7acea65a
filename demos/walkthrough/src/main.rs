//! Walks one room through its life on the in-memory backend and prints
//! every notice as JSON.
//!
//! Run with `RUST_LOG=debug` to see the room actors at work.

use std::sync::Arc;

use tokio::sync::mpsc;
use voxroom::prelude::*;

const ALICE: UserId = UserId(1);
const BOB: UserId = UserId(2);

/// Feeds the backend's recorded transitions to the manager until none
/// are left. Handling one event can cause more (a room moving its owner
/// in, an eviction), so this loops.
async fn pump(backend: &MemoryBackend, manager: &RoomManager<MemoryBackend>) {
    loop {
        let events = backend.take_events().await;
        if events.is_empty() {
            return;
        }
        for event in events {
            if let Err(e) = manager.handle_event(event).await {
                tracing::warn!(error = %e, "event failed");
            }
        }
    }
}

fn print_notices(notices: &mut mpsc::UnboundedReceiver<Notice>) {
    while let Ok(notice) = notices.try_recv() {
        match serde_json::to_string(&notice) {
            Ok(json) => println!("  notice  {json}"),
            Err(e) => println!("  notice  (unprintable: {e})"),
        }
    }
}

async fn command(manager: &RoomManager<MemoryBackend>, actor: UserId, command: Command) {
    println!("{actor} > {}", command.action());
    match manager.execute(actor, command).await {
        Ok(outcome) => println!(
            "  ok      name={:?} limit={} host={} effects={}",
            outcome.snapshot.name,
            outcome.snapshot.limit.as_count(),
            outcome.snapshot.host,
            outcome.effects.len()
        ),
        Err(e) => println!("  refused {}: {e}", e.kind()),
    }
}

#[tokio::main]
async fn main() -> Result<(), VoxroomError> {
    init_tracing();

    let config = ServiceConfig::from_env()?;
    let backend = Arc::new(MemoryBackend::new());
    backend.register_user(ALICE, "Alice").await;
    backend.register_user(BOB, "Bob").await;

    let (notice_tx, mut notices) = mpsc::unbounded_channel();
    let service = VoxroomServiceBuilder::new()
        .config(config)
        .notices(notice_tx)
        .build(Arc::clone(&backend))
        .await?;
    let manager = service.manager();
    let spawn = service.spawn_channel();
    println!("spawn room is {spawn}");

    println!("{ALICE} enters the spawn room");
    backend.connect(ALICE, Some(spawn)).await?;
    pump(&backend, manager).await;
    print_notices(&mut notices);

    let Some(room) = manager.location(ALICE).await else {
        println!("no room was created");
        return Ok(());
    };

    println!("{BOB} joins {room}");
    backend.connect(BOB, Some(room)).await?;
    pump(&backend, manager).await;
    print_notices(&mut notices);

    command(manager, ALICE, Command::Rename { name: "Late Night".into() }).await;
    command(manager, ALICE, Command::Resize { limit: i64::from(SizePreset::Quad.limit()) }).await;
    command(manager, BOB, Command::Rename { name: "Bob's now".into() }).await;
    command(manager, ALICE, Command::SetHost { user: BOB }).await;
    command(manager, BOB, Command::Info).await;
    print_notices(&mut notices);

    command(manager, ALICE, Command::BlacklistAdd { user: BOB }).await;
    pump(&backend, manager).await;
    print_notices(&mut notices);

    println!("{BOB} tries to come back");
    if let Err(e) = backend.connect(BOB, Some(room)).await {
        println!("  refused by platform: {e}");
    }
    command(manager, BOB, Command::Info).await;

    println!("{ALICE} leaves");
    backend.connect(ALICE, None).await?;
    pump(&backend, manager).await;
    print_notices(&mut notices);

    println!("{} rooms left", manager.room_count().await);
    Ok(())
}
