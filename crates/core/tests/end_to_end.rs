mod common;

use std::net::Ipv4Addr;
use std::time::Duration;

use common::{free_port, timing, FakeConsole, PACING};
use cuebridge_core::{
    ButtonRow, HardwareVariant, IntegrationManager, IntegrationState, LogicalButtonId,
    MixerError, TransportError, MIXER_SOURCE,
};
use rosc::OscType;
use tokio::sync::mpsc;
use tokio::time::{timeout, Instant};

const QUIET: Duration = Duration::from_millis(200);

fn listen_port(manager: &IntegrationManager) -> u16 {
    manager.status()["listen_port"].parse().unwrap()
}

type Presses = mpsc::UnboundedReceiver<(LogicalButtonId, &'static str)>;

fn manager_with_presses() -> (IntegrationManager, Presses) {
    let _ = env_logger::builder().is_test(true).try_init();
    let manager = IntegrationManager::with_timing(timing());
    let (tx, rx) = mpsc::unbounded_channel();
    manager.on_button_pressed(move |button, source| {
        let _ = tx.send((button, source));
    });
    (manager, rx)
}

#[tokio::test]
async fn test_compact_bind_sends_paced_trigger_sequence() {
    let console = FakeConsole::bind().await;
    let (mut manager, _presses) = manager_with_presses();
    manager
        .update_settings(&console.settings(HardwareVariant::Compact, 0))
        .await
        .unwrap();
    assert_eq!(manager.state(), IntegrationState::Running);

    let port = listen_port(&manager);
    let subscribe = console.recv().await;
    assert_eq!(subscribe.addr, format!("/%{}/*S~", port));

    let started = Instant::now();
    let cc = manager
        .bind_cue_to_button("cue1", LogicalButtonId::compact(2, 3), "Intro", "green", true)
        .await
        .unwrap()
        .expect("integration is running");
    assert!(cc <= 127);
    assert!(started.elapsed() >= PACING * 3);

    let messages = console.recv_n(4).await;
    let addrs: Vec<&str> = messages.iter().map(|m| m.addr.as_str()).collect();
    assert_eq!(
        addrs,
        [
            "/$ctl/user/1/2/mode",
            "/$ctl/user/1/2/cc",
            "/$ctl/user/1/2/name",
            "/$ctl/user/1/2/col",
        ]
    );
    assert_eq!(messages[0].args, vec![OscType::String("MIDICCP".into())]);
    assert_eq!(messages[1].args, vec![OscType::Int(i32::from(cc))]);
    assert_eq!(messages[2].args, vec![OscType::String("Intro".into())]);
    assert_eq!(messages[3].args, vec![OscType::Int(5)]);
    assert!(console.is_quiet_for(QUIET).await);

    manager.shutdown().await;
}

#[tokio::test]
async fn test_full_press_invokes_callback_once() {
    let console = FakeConsole::bind().await;
    let (mut manager, mut presses) = manager_with_presses();
    manager
        .update_settings(&console.settings(HardwareVariant::Full, 0))
        .await
        .unwrap();
    let port = listen_port(&manager);
    console.recv().await;

    console
        .push(port, "/$ctl/user/1/0/bu/val", vec![OscType::Int(127)])
        .await;
    let press = timeout(Duration::from_secs(2), presses.recv())
        .await
        .expect("no press delivered")
        .unwrap();
    assert_eq!(
        press,
        (LogicalButtonId::full(1, 1, ButtonRow::Upper), MIXER_SOURCE)
    );

    // Releases, partial values and unrelated telemetry never trigger
    console
        .push(port, "/$ctl/user/1/0/bu/val", vec![OscType::Int(0)])
        .await;
    console
        .push(port, "/$ctl/user/1/0/bu/val", vec![OscType::Int(64)])
        .await;
    console
        .push(port, "/ch/01/mix/fader", vec![OscType::Float(0.75)])
        .await;
    assert!(timeout(QUIET, presses.recv()).await.is_err());
    assert_eq!(manager.status()["presses"], "1");

    manager.shutdown().await;
}

#[tokio::test]
async fn test_compact_press_accepts_any_nonzero_value() {
    let console = FakeConsole::bind().await;
    let (mut manager, mut presses) = manager_with_presses();
    manager
        .update_settings(&console.settings(HardwareVariant::Compact, 0))
        .await
        .unwrap();
    let port = listen_port(&manager);
    console.recv().await;

    console
        .push(port, "/$ctl/user/3/3/val", vec![OscType::Float(1.0)])
        .await;
    let (button, source) = timeout(Duration::from_secs(2), presses.recv())
        .await
        .expect("no press delivered")
        .unwrap();
    assert_eq!(button, LogicalButtonId::compact(4, 4));
    assert_eq!(source, "mixer");

    manager.shutdown().await;
}

#[tokio::test]
async fn test_reconfiguration_reuses_listen_port_and_resets_pool() {
    let console = FakeConsole::bind().await;
    let (mut manager, _presses) = manager_with_presses();
    let port = free_port();

    manager
        .update_settings(&console.settings(HardwareVariant::Compact, port))
        .await
        .unwrap();
    assert_eq!(console.recv().await.addr, format!("/%{}/*S~", port));
    let first = manager
        .bind_cue_to_button("cue1", LogicalButtonId::compact(1, 1), "One", "red", true)
        .await
        .unwrap();
    assert_eq!(first, Some(0));
    console.recv_n(4).await;

    manager
        .update_settings(&console.settings(HardwareVariant::Full, port))
        .await
        .unwrap();
    assert_eq!(manager.state(), IntegrationState::Running);
    assert_eq!(manager.active_variant(), Some(HardwareVariant::Full));
    assert_eq!(console.recv().await.addr, format!("/%{}/*S~", port));

    let second = manager
        .bind_cue_to_button(
            "cue2",
            LogicalButtonId::full(1, 1, ButtonRow::Lower),
            "Two",
            "blue",
            false,
        )
        .await
        .unwrap();
    assert_eq!(second, Some(0));
    assert_eq!(manager.status()["cc_in_use"], "1");

    manager.shutdown().await;
}

#[tokio::test]
async fn test_unbind_returns_cc_to_pool() {
    let console = FakeConsole::bind().await;
    let (mut manager, _presses) = manager_with_presses();
    manager
        .update_settings(&console.settings(HardwareVariant::Compact, 0))
        .await
        .unwrap();

    let a = LogicalButtonId::compact(1, 1);
    let b = LogicalButtonId::compact(1, 2);
    let c = LogicalButtonId::compact(1, 3);
    assert_eq!(
        manager.bind_cue_to_button("a", a, "A", "red", true).await.unwrap(),
        Some(0)
    );
    assert_eq!(
        manager.bind_cue_to_button("b", b, "B", "red", true).await.unwrap(),
        Some(1)
    );
    manager.unbind_button(a).await.unwrap();
    assert_eq!(
        manager.bind_cue_to_button("c", c, "C", "red", true).await.unwrap(),
        Some(0)
    );

    manager.shutdown().await;
}

#[tokio::test]
async fn test_port_in_use_leaves_integration_disabled() {
    let console = FakeConsole::bind().await;
    let squatter = std::net::UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).unwrap();
    let port = squatter.local_addr().unwrap().port();

    let (mut manager, _presses) = manager_with_presses();
    let result = manager
        .update_settings(&console.settings(HardwareVariant::Full, port))
        .await;
    assert!(matches!(
        result,
        Err(MixerError::Transport(TransportError::BindFailed { .. }))
    ));
    assert_eq!(manager.state(), IntegrationState::Disabled);
    assert_eq!(
        manager
            .bind_cue_to_button("cue1", LogicalButtonId::full(1, 1, ButtonRow::Upper), "X", "red", true)
            .await
            .unwrap(),
        None
    );
    assert!(console.is_quiet_for(QUIET).await);
}

#[tokio::test]
async fn test_missing_target_is_disabled_not_error() {
    let console = FakeConsole::bind().await;
    let (mut manager, _presses) = manager_with_presses();
    let mut settings = console.settings(HardwareVariant::Compact, 0);
    settings.target_ip_address = None;

    manager.update_settings(&settings).await.unwrap();
    assert_eq!(manager.state(), IntegrationState::Disabled);
    assert!(console.is_quiet_for(QUIET).await);
}

#[tokio::test]
async fn test_shutdown_releases_listen_port() {
    let console = FakeConsole::bind().await;
    let (mut manager, _presses) = manager_with_presses();
    let port = free_port();
    manager
        .update_settings(&console.settings(HardwareVariant::Compact, port))
        .await
        .unwrap();
    manager.shutdown().await;

    assert_eq!(manager.state(), IntegrationState::Disabled);
    assert!(std::net::UdpSocket::bind((Ipv4Addr::UNSPECIFIED, port)).is_ok());
}

#[tokio::test]
async fn test_abandoned_bind_does_not_leak_cc() {
    let console = FakeConsole::bind().await;
    let (mut manager, _presses) = manager_with_presses();
    manager
        .update_settings(&console.settings(HardwareVariant::Compact, 0))
        .await
        .unwrap();
    let button = LogicalButtonId::compact(2, 2);

    let abandoned = timeout(
        Duration::from_millis(2),
        manager.bind_cue_to_button("cue1", button, "Intro", "green", true),
    )
    .await;
    assert!(abandoned.is_err());

    // The sequence completes in the background
    tokio::time::sleep(PACING * 20).await;
    assert_eq!(manager.status()["cc_in_use"], "1");

    let cc = manager
        .bind_cue_to_button("cue1", button, "Intro", "green", true)
        .await
        .unwrap();
    assert_eq!(cc, Some(0));
    assert_eq!(manager.status()["cc_in_use"], "1");

    manager.unbind_button(button).await.unwrap();
    assert_eq!(manager.status()["cc_in_use"], "0");

    manager.shutdown().await;
}
