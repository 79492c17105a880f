//! Single-core link: the console service driving a notify stack.

use bleconsole::app::events::{Link, LinkEvents};
use bleconsole::app::service::ConsoleService;
use bleconsole::app::status::publish_status;
use bleconsole::config::ConsoleConfig;
use bleconsole::error::SendError;
use bleconsole::fsm::ConnectionState;
use bleconsole::transport::notify::NotifyTransport;
use bleconsole::transport::{DisconnectReason, Target, TransportEvent};

use crate::mock_platform::{
    Handlers, MockPlatform, MockStack, NotifyService, RecordingDelay, SETTLE_MS, handlers,
    notify_service,
};

const GREETING: &str =
    "\n=== BleConsole Device Connected ===\nSingle Core BLE\nType 'help' for available commands\n\n";

fn stack(svc: &NotifyService) -> &MockStack {
    svc.transport().stack()
}

fn platform(svc: &mut NotifyService) -> &MockPlatform {
    svc.handlers_mut().unwrap().platform()
}

fn bound(mtu: u16) -> NotifyService {
    let mut svc = notify_service(mtu, RecordingDelay::default());
    svc.handle_event(TransportEvent::Bound, 0);
    svc
}

/// Bound, peer 1 linked and settled; notification log cleared.
fn connected(mtu: u16) -> NotifyService {
    let mut svc = bound(mtu);
    svc.handle_event(TransportEvent::PeerConnected(1), 0);
    svc.poll(u64::from(SETTLE_MS));
    svc.transport_mut().stack_mut().notified.clear();
    svc
}

// ── Bring-up ──────────────────────────────────────────────────

#[test]
fn starts_disconnected_until_bound() {
    let mut svc = notify_service(247, RecordingDelay::default());
    assert_eq!(svc.connection_state(), ConnectionState::Disconnected);
    assert!(!stack(&svc).advertising);
    assert_eq!(
        svc.send(Target::Broadcast, b"early"),
        Err(SendError::NotReady)
    );
}

#[test]
fn bound_advertises_and_lights_indicator() {
    let mut svc = bound(247);
    assert_eq!(svc.connection_state(), ConnectionState::Advertising);
    assert!(stack(&svc).advertising);
    assert_eq!(stack(&svc).adv_starts, 1);
    assert!(platform(&mut svc).indicator);
}

#[test]
fn duplicate_bound_is_ignored() {
    let mut svc = bound(247);
    svc.handle_event(TransportEvent::Bound, 5);
    assert_eq!(svc.connection_state(), ConnectionState::Advertising);
    assert_eq!(platform(&mut svc).indicator_log, [true]);
}

#[test]
fn disabled_console_service_refuses_sends() {
    let transport = NotifyTransport::new(MockStack::new(247), 247);
    let mut svc = ConsoleService::new(transport, RecordingDelay::default(), 0);
    let config = ConsoleConfig {
        enable_console_service: false,
        ..ConsoleConfig::default()
    };
    svc.init(config, bleconsole::app::events::NoEvents).unwrap();
    svc.handle_event(TransportEvent::Bound, 0);
    assert_eq!(
        svc.send(Target::Broadcast, b"hi"),
        Err(SendError::NotSupported)
    );
}

// ── Connect and greeting ──────────────────────────────────────

#[test]
fn greeting_waits_for_settle_delay() {
    let mut svc = bound(247);
    svc.handle_event(TransportEvent::PeerConnected(1), 100);
    assert_eq!(svc.connection_state(), ConnectionState::Connected);
    assert!(svc.connected_pending());

    svc.poll(100 + u64::from(SETTLE_MS) - 1);
    assert!(stack(&svc).notified.is_empty());

    svc.poll(100 + u64::from(SETTLE_MS));
    assert_eq!(stack(&svc).text_to(Target::Broadcast), GREETING);
    // ready turned it on, connected toggled it off.
    assert_eq!(platform(&mut svc).indicator_log, [true, false]);
}

#[test]
fn greeting_is_split_to_mtu() {
    let mut svc = bound(23);
    svc.handle_event(TransportEvent::PeerConnected(1), 0);
    svc.poll(u64::from(SETTLE_MS));

    let fragments = &stack(&svc).notified;
    assert_eq!(fragments.len(), GREETING.len().div_ceil(20));
    assert!(fragments.iter().all(|(_, d)| d.len() <= 20));
    assert_eq!(stack(&svc).text_to(Target::Broadcast), GREETING);
}

#[test]
fn drop_during_settle_skips_greeting() {
    let mut svc = bound(247);
    svc.handle_event(TransportEvent::PeerConnected(1), 0);
    svc.handle_event(
        TransportEvent::PeerDisconnected {
            peer: 1,
            reason: DisconnectReason::REMOTE_USER_TERMINATED,
        },
        10,
    );
    svc.poll(u64::from(SETTLE_MS) * 2);
    assert!(stack(&svc).notified.is_empty());
    assert_eq!(svc.connection_state(), ConnectionState::Advertising);
}

#[test]
fn drop_during_settle_fires_neither_callback() {
    let transport = NotifyTransport::new(MockStack::new(247), 247);
    let mut svc = ConsoleService::new(transport, RecordingDelay::default(), SETTLE_MS);
    svc.init(ConsoleConfig::default(), SentCounter::default())
        .unwrap();
    svc.handle_event(TransportEvent::Bound, 0);

    svc.handle_event(TransportEvent::PeerConnected(1), 0);
    svc.handle_event(
        TransportEvent::PeerDisconnected {
            peer: 1,
            reason: DisconnectReason(0x13),
        },
        200,
    );
    svc.poll(5_000);
    let counter = svc.handlers_mut().unwrap();
    assert_eq!(counter.connected, 0);
    assert!(counter.disconnected.is_empty());

    // The next full session still pairs its callbacks.
    svc.handle_event(TransportEvent::PeerConnected(2), 6_000);
    svc.poll(6_000 + u64::from(SETTLE_MS));
    svc.handle_event(
        TransportEvent::PeerDisconnected {
            peer: 2,
            reason: DisconnectReason(0x08),
        },
        9_000,
    );
    let counter = svc.handlers_mut().unwrap();
    assert_eq!(counter.connected, 1);
    assert_eq!(counter.disconnected, [DisconnectReason(0x08)]);
}

// ── Commands ──────────────────────────────────────────────────

#[test]
fn reply_goes_to_source_peer() {
    let mut svc = connected(247);
    svc.handle_event(
        TransportEvent::Received {
            source: Some(1),
            data: b"echo hi\n",
        },
        2_000,
    );
    let stack = stack(&svc);
    assert_eq!(stack.notified.len(), 1);
    assert_eq!(stack.notified[0].0, Target::Peer(1));
    assert_eq!(stack.text_to(Target::Peer(1)), "Echo: hi\n");
}

#[test]
fn command_split_across_writes() {
    let mut svc = connected(247);
    svc.handle_event(
        TransportEvent::Received {
            source: Some(1),
            data: b"ec",
        },
        0,
    );
    assert!(stack(&svc).notified.is_empty());
    svc.handle_event(
        TransportEvent::Received {
            source: Some(1),
            data: b"ho a b\r\n",
        },
        0,
    );
    assert_eq!(stack(&svc).text_to(Target::Peer(1)), "Echo: a b\n");
}

#[test]
fn status_reports_connection_count() {
    let mut svc = connected(247);
    svc.handle_event(TransportEvent::PeerConnected(2), 0);
    svc.handle_event(
        TransportEvent::Received {
            source: Some(2),
            data: b"status\n",
        },
        0,
    );
    let text = stack(&svc).text_to(Target::Peer(2));
    assert!(text.starts_with("=== System Status ===\n"));
    assert!(text.contains("BLE connections: 2\n"));
}

#[test]
fn led_command_drives_indicator() {
    let mut svc = connected(247);
    svc.handle_event(
        TransportEvent::Received {
            source: Some(1),
            data: b"led on\n",
        },
        0,
    );
    assert!(platform(&mut svc).indicator);
    svc.handle_event(
        TransportEvent::Received {
            source: Some(1),
            data: b"led off\n",
        },
        0,
    );
    assert!(!platform(&mut svc).indicator);
    assert_eq!(
        stack(&svc).text_to(Target::Peer(1)),
        "LED turned on\nLED turned off\n"
    );
}

#[test]
fn reset_replies_then_reboots() {
    let mut svc = connected(247);
    svc.handle_event(
        TransportEvent::Received {
            source: Some(1),
            data: b"reset\necho never\n",
        },
        0,
    );
    assert_eq!(stack(&svc).text_to(Target::Peer(1)), "Resetting system...\n");
    assert_eq!(platform(&mut svc).reboots, 1);
}

/// Console handlers that also note whether each `data_sent` arrived
/// before the device rebooted.
struct RebootWatch {
    inner: Handlers,
    sent_before_reboot: u32,
    sent_after_reboot: u32,
}

impl LinkEvents for RebootWatch {
    fn data_received(
        &mut self,
        source: Option<bleconsole::transport::PeerHandle>,
        data: &[u8],
        link: &mut impl Link,
    ) {
        self.inner.data_received(source, data, link);
    }

    fn data_sent(&mut self) {
        if self.inner.platform().reboots == 0 {
            self.sent_before_reboot += 1;
        } else {
            self.sent_after_reboot += 1;
        }
    }

    fn idle(&mut self) {
        self.inner.idle();
    }
}

#[test]
fn reset_ack_is_reported_sent_before_reboot() {
    let transport = NotifyTransport::new(MockStack::new(247), 247);
    let mut svc = ConsoleService::new(transport, RecordingDelay::default(), 0);
    let watch = RebootWatch {
        inner: handlers(MockPlatform::new(), "Single Core BLE"),
        sent_before_reboot: 0,
        sent_after_reboot: 0,
    };
    svc.init(ConsoleConfig::default(), watch).unwrap();
    svc.handle_event(TransportEvent::Bound, 0);
    svc.handle_event(TransportEvent::PeerConnected(1), 0);

    svc.handle_event(
        TransportEvent::Received {
            source: Some(1),
            data: b"reset\n",
        },
        0,
    );
    let watch = svc.handlers_mut().unwrap();
    assert_eq!(watch.sent_before_reboot, 1);
    assert_eq!(watch.sent_after_reboot, 0);
    assert_eq!(watch.inner.platform().reboots, 1);
}

// ── Disconnect ────────────────────────────────────────────────

#[test]
fn last_peer_lost_readvertises() {
    let mut svc = connected(247);
    svc.handle_event(
        TransportEvent::PeerDisconnected {
            peer: 1,
            reason: DisconnectReason::REMOTE_USER_TERMINATED,
        },
        5_000,
    );
    assert_eq!(svc.connection_state(), ConnectionState::Advertising);
    assert_eq!(stack(&svc).adv_starts, 2);
    assert!(platform(&mut svc).indicator);
    assert_eq!(svc.connection_count(), 0);
}

#[test]
fn link_stays_up_while_any_peer_remains() {
    let mut svc = connected(247);
    svc.handle_event(TransportEvent::PeerConnected(2), 0);
    assert_eq!(svc.connection_count(), 2);

    svc.handle_event(
        TransportEvent::PeerDisconnected {
            peer: 1,
            reason: DisconnectReason::REMOTE_USER_TERMINATED,
        },
        0,
    );
    assert_eq!(svc.connection_state(), ConnectionState::Connected);
    assert_eq!(svc.connection_count(), 1);
    assert_eq!(
        svc.send(Target::Peer(1), b"gone"),
        Err(SendError::NotConnected)
    );
    assert!(svc.send(Target::Peer(2), b"still here").is_ok());
}

#[test]
fn disconnect_requests_go_to_stack() {
    let mut svc = connected(247);
    svc.handle_event(TransportEvent::PeerConnected(7), 0);

    assert_eq!(svc.disconnect(9), Err(SendError::NotConnected));
    svc.disconnect(7).unwrap();
    assert_eq!(stack(&svc).disconnects, [7]);

    svc.disconnect_all().unwrap();
    let mut dropped = stack(&svc).disconnects.clone();
    dropped.sort_unstable();
    assert_eq!(dropped, [1, 7, 7]);
}

#[test]
fn advertising_can_be_stopped_and_restarted() {
    let mut svc = bound(247);
    svc.stop_advertising().unwrap();
    assert_eq!(svc.connection_state(), ConnectionState::Disconnected);
    assert!(!stack(&svc).advertising);

    svc.start_advertising().unwrap();
    assert_eq!(svc.connection_state(), ConnectionState::Advertising);
    assert!(stack(&svc).advertising);
}

// ── data_sent accounting ──────────────────────────────────────

#[derive(Default)]
struct SentCounter {
    sent: u32,
    replies: u32,
    connected: u32,
    disconnected: Vec<DisconnectReason>,
}

impl LinkEvents for SentCounter {
    fn connected(&mut self, _link: &mut impl Link) {
        self.connected += 1;
    }

    fn disconnected(&mut self, reason: DisconnectReason) {
        self.disconnected.push(reason);
    }

    fn data_received(
        &mut self,
        source: Option<bleconsole::transport::PeerHandle>,
        data: &[u8],
        link: &mut impl Link,
    ) {
        let target = source.map_or(Target::Broadcast, Target::Peer);
        if link.send(target, data).is_ok() {
            self.replies += 1;
        }
    }

    fn data_sent(&mut self) {
        self.sent += 1;
    }
}

#[test]
fn data_sent_fires_once_per_logical_send() {
    let transport = NotifyTransport::new(MockStack::new(23), 23);
    let mut svc = ConsoleService::new(transport, RecordingDelay::default(), 0);
    svc.init(ConsoleConfig::default(), SentCounter::default())
        .unwrap();
    svc.handle_event(TransportEvent::Bound, 0);
    svc.handle_event(TransportEvent::PeerConnected(3), 0);

    svc.send(Target::Broadcast, &[b'z'; 50]).unwrap();
    assert_eq!(svc.transport().stack().notified.len(), 3);
    assert_eq!(svc.handlers_mut().unwrap().sent, 1);

    // Sends made from inside a callback count too.
    svc.handle_event(
        TransportEvent::Received {
            source: Some(3),
            data: b"ping",
        },
        0,
    );
    let counter = svc.handlers_mut().unwrap();
    assert_eq!(counter.replies, 1);
    assert_eq!(counter.sent, 2);
}

#[test]
fn failed_send_does_not_fire_data_sent() {
    let transport = NotifyTransport::new(MockStack::new(23), 23);
    let mut svc = ConsoleService::new(transport, RecordingDelay::default(), 0);
    svc.init(ConsoleConfig::default(), SentCounter::default())
        .unwrap();
    svc.handle_event(TransportEvent::Bound, 0);

    assert_eq!(svc.send(Target::Peer(4), b"x"), Err(SendError::NotConnected));
    assert_eq!(svc.send(Target::Broadcast, b""), Err(SendError::InvalidArgument));
    assert_eq!(svc.handlers_mut().unwrap().sent, 0);
}

// ── Auto status ───────────────────────────────────────────────

#[test]
fn auto_status_only_when_connected() {
    let mut svc = bound(247);
    assert_eq!(publish_status(&mut svc), Ok(false));
    assert!(stack(&svc).notified.is_empty());

    svc.handle_event(TransportEvent::PeerConnected(1), 0);
    svc.poll(u64::from(SETTLE_MS));
    svc.transport_mut().stack_mut().notified.clear();

    assert_eq!(publish_status(&mut svc), Ok(true));
    assert_eq!(
        stack(&svc).text_to(Target::Broadcast),
        "[AUTO] Uptime: 12.345s | Battery: 58% (3700mV) | Temp: 24°C\n"
    );
}

#[test]
fn one_callback_per_edge() {
    let transport = NotifyTransport::new(MockStack::new(247), 247);
    let mut svc = ConsoleService::new(transport, RecordingDelay::default(), 0);
    svc.init(ConsoleConfig::default(), SentCounter::default())
        .unwrap();
    svc.handle_event(TransportEvent::Bound, 0);

    svc.handle_event(TransportEvent::PeerConnected(1), 0);
    // Repeat of the same link event while already connected.
    svc.handle_event(TransportEvent::PeerConnected(1), 0);
    assert_eq!(svc.connection_count(), 1);
    svc.handle_event(
        TransportEvent::PeerDisconnected {
            peer: 1,
            reason: DisconnectReason(0x08),
        },
        0,
    );
    svc.handle_event(
        TransportEvent::PeerDisconnected {
            peer: 1,
            reason: DisconnectReason(0x08),
        },
        0,
    );

    let counter = svc.handlers_mut().unwrap();
    assert_eq!(counter.connected, 1);
    assert_eq!(counter.disconnected, [DisconnectReason(0x08)]);
}
