//! Real SIGTERM delivery. Kept in its own test binary so no other test shares
//! the process when the signal arrives.

#![cfg(unix)]

use std::process::Command;
use std::time::Duration;

use films_service::lifecycle::{ActorGroup, Signal, SignalActor};
use films_service::net::ListenerActor;
use tokio::net::TcpStream;

mod common;

fn send_sigterm() {
    let status = Command::new("kill")
        .args(["-TERM", &std::process::id().to_string()])
        .status()
        .unwrap();
    assert!(status.success());
}

#[tokio::test]
async fn sigterm_before_the_group_starts_is_held_until_it_runs() {
    let config = common::loopback_config();
    let routers = common::routers(&config);
    let signals = SignalActor::new().unwrap();

    // Delivered while bootstrap is still binding: must not kill the process.
    send_sigterm();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let app = ListenerActor::bind("app", &config.listeners.app_address, routers.app)
        .await
        .unwrap();
    let addr = app.local_addr();

    let mut group = ActorGroup::new();
    group.add(app).add(signals);

    let outcome = tokio::time::timeout(Duration::from_secs(2), group.run())
        .await
        .expect("group stopped within two seconds");

    assert_eq!(outcome.actor, "signals");
    assert_eq!(outcome.signal(), Some(Signal::Terminate));
    assert!(!outcome.is_error());
    assert!(TcpStream::connect(addr).await.is_err());
}
