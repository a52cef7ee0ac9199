#![cfg(unix)]

mod common;

use std::fs;
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::unbounded;
use notify::event::{AccessKind, CreateKind, DataChange, ModifyKind, RemoveKind};
use notify::{Event, EventKind};

use common::{FakeManager, engine, make_dir, make_executable, wait_for};
use modwatch::{InMemoryModuleManager, WatchService, WatchServiceBuilder};
use tempfile::TempDir;

const TIMEOUT: Duration = Duration::from_secs(5);

#[test]
fn test_synthetic_create_triggers_directory_pass() {
    let temp = TempDir::new().unwrap();
    let mods = make_dir(temp.path(), "mods");

    let manager = FakeManager::new();
    let (watcher, _subscription) = engine(manager.clone());
    let watcher = Arc::new(watcher);
    watcher.set_directories([&mods]);

    let (tx, rx) = unbounded();
    let service = WatchService::spawn(Arc::clone(&watcher), rx, 0).unwrap();

    let tool = make_executable(&mods, "tool");
    tx.send(Ok(
        Event::new(EventKind::Create(CreateKind::File)).add_path(tool.clone())
    ))
    .unwrap();

    assert!(wait_for(TIMEOUT, || watcher.module(&tool).is_some()));
    assert!(manager.is_registered(&tool));

    fs::remove_file(&tool).unwrap();
    tx.send(Ok(
        Event::new(EventKind::Remove(RemoveKind::File)).add_path(tool.clone())
    ))
    .unwrap();

    assert!(wait_for(TIMEOUT, || watcher.files().is_empty()));
    assert!(!manager.is_registered(&tool));

    service.shutdown();
    assert!(watcher.directories().is_empty());
}

#[test]
fn test_pending_event_for_dropped_directory_does_not_rewatch_it() {
    let temp = TempDir::new().unwrap();
    let dropped = make_dir(temp.path(), "a");
    let kept = make_dir(temp.path(), "b");

    let manager = FakeManager::new();
    let (watcher, _subscription) = engine(manager.clone());
    let watcher = Arc::new(watcher);
    watcher.set_directories([&dropped, &kept]);

    let (tx, rx) = unbounded();
    let service = WatchService::spawn(Arc::clone(&watcher), rx, 300).unwrap();

    let tool = make_executable(&dropped, "new");
    tx.send(Ok(
        Event::new(EventKind::Create(CreateKind::File)).add_path(tool.clone())
    ))
    .unwrap();

    // Give the loop time to route the event while `dropped` is still watched
    std::thread::sleep(Duration::from_millis(100));
    watcher.set_directories([&kept]);
    assert_eq!(watcher.directories(), vec![kept.clone()]);

    // Well past the debounce window
    std::thread::sleep(Duration::from_millis(600));

    assert_eq!(watcher.directories(), vec![kept]);
    assert!(watcher.module(&tool).is_none());
    assert!(!manager.is_registered(&tool));

    service.shutdown();
}

#[test]
fn test_burst_is_coalesced() {
    let temp = TempDir::new().unwrap();
    let mods = make_dir(temp.path(), "mods");
    let tool = make_executable(&mods, "tool");

    let manager = FakeManager::new();
    let (watcher, _subscription) = engine(manager.clone());
    let watcher = Arc::new(watcher);
    watcher.set_directories([&mods]);
    let calls_before = manager.register_calls();

    let (tx, rx) = unbounded();
    let service = WatchService::spawn(Arc::clone(&watcher), rx, 200).unwrap();

    for _ in 0..20 {
        tx.send(Ok(Event::new(EventKind::Modify(ModifyKind::Data(
            DataChange::Content,
        )))
        .add_path(tool.clone())))
        .unwrap();
    }

    assert!(wait_for(TIMEOUT, || manager.register_calls() > calls_before));
    std::thread::sleep(Duration::from_millis(400));
    assert_eq!(manager.register_calls(), calls_before + 1);

    service.shutdown();
}

#[test]
fn test_access_events_are_ignored() {
    let temp = TempDir::new().unwrap();
    let mods = make_dir(temp.path(), "mods");
    let tool = make_executable(&mods, "tool");

    let manager = FakeManager::new();
    let (watcher, _subscription) = engine(manager.clone());
    let watcher = Arc::new(watcher);
    watcher.set_directories([&mods]);
    let calls_before = manager.register_calls();

    let (tx, rx) = unbounded();
    let service = WatchService::spawn(Arc::clone(&watcher), rx, 0).unwrap();

    tx.send(Ok(
        Event::new(EventKind::Access(AccessKind::Any)).add_path(tool)
    ))
    .unwrap();
    std::thread::sleep(Duration::from_millis(200));

    assert_eq!(manager.register_calls(), calls_before);
    service.shutdown();
}

#[test]
fn test_closed_event_channel_stops_loop() {
    let temp = TempDir::new().unwrap();
    let mods = make_dir(temp.path(), "mods");
    make_executable(&mods, "tool");

    let manager = FakeManager::new();
    let (watcher, _subscription) = engine(manager);
    let watcher = Arc::new(watcher);
    watcher.set_directories([&mods]);

    let (tx, rx) = unbounded();
    let service = WatchService::spawn(Arc::clone(&watcher), rx, 0).unwrap();
    drop(tx);

    // Shutdown still joins cleanly after the loop exited on its own
    service.shutdown();
    assert!(watcher.files().is_empty());
}

#[test]
fn test_builder_requires_manager() {
    assert!(WatchServiceBuilder::new().build().is_err());
}

#[test]
fn test_real_notifications_register_new_executable() {
    let temp = TempDir::new().unwrap();
    let mods = make_dir(temp.path(), "mods");

    let manager = Arc::new(InMemoryModuleManager::new());
    let service = WatchService::builder()
        .manager(manager.clone())
        .debounce_ms(50)
        .parallel_threads(2)
        .build()
        .unwrap();

    service.watcher().set_directories([&mods]);
    assert!(service.watcher().subscribed().contains(&mods));

    let tool = make_executable(&mods, "tool");

    assert!(wait_for(TIMEOUT, || service.watcher().module(&tool).is_some()));
    assert_eq!(manager.len(), 1);

    service.shutdown();
}
