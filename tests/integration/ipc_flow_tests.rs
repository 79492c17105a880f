//! Dual-core link: the console service talking to a companion core
//! through inter-core frames.

use bleconsole::error::SendError;
use bleconsole::fsm::ConnectionState;
use bleconsole::shell::commands::COMMANDS;
use bleconsole::transport::channels::Inbound;
use bleconsole::transport::ipc::{IPC_CHUNK, IPC_FRAGMENT_PAUSE_MS, PROBE_TEXT};
use bleconsole::transport::message::{MessageType, TransportMessage};
use bleconsole::transport::{Target, Transport, TransportEvent};

use crate::mock_platform::{IpcService, RecordingDelay, SETTLE_MS, ipc_service};

const GREETING: &str = "\n=== BleConsole Device Connected ===\nApplication Core + Network Core BLE\nType 'help' for available commands\n\n";

/// Replay a raw companion frame the way the console task does.
fn deliver(svc: &mut IpcService, raw: &[u8], now_ms: u64) -> bool {
    Inbound::frame(raw)
        .with_event(|event| svc.handle_event(event, now_ms))
        .is_some()
}

fn state_frame(state: ConnectionState) -> [u8; 130] {
    TransportMessage::state(state).unwrap().encode()
}

fn data_frame(text: &[u8]) -> [u8; 130] {
    TransportMessage::new(MessageType::DataReceived, text)
        .unwrap()
        .encode()
}

fn bound() -> (IpcService, RecordingDelay) {
    let delay = RecordingDelay::default();
    let mut svc = ipc_service(delay.clone());
    svc.handle_event(TransportEvent::Bound, 0);
    (svc, delay)
}

fn connected() -> (IpcService, RecordingDelay) {
    let (mut svc, delay) = bound();
    assert!(deliver(&mut svc, &state_frame(ConnectionState::Connected), 0));
    svc.poll(u64::from(SETTLE_MS));
    svc.transport_mut().endpoint_mut().frames.clear();
    delay.pauses_ms.borrow_mut().clear();
    (svc, delay)
}

// ── Handshake ─────────────────────────────────────────────────

#[test]
fn unbound_endpoint_is_transport_error() {
    let mut svc = ipc_service(RecordingDelay::default());
    assert!(svc.transport().endpoint().registered);
    assert_eq!(svc.connection_state(), ConnectionState::TransportError);
    assert_eq!(
        svc.send(Target::Broadcast, b"early"),
        Err(SendError::NotConnected)
    );
    assert!(svc.transport().endpoint().frames.is_empty());
}

#[test]
fn bound_sends_init_then_probe() {
    let (mut svc, _) = bound();
    assert_eq!(svc.connection_state(), ConnectionState::Advertising);

    let msgs = svc.transport().endpoint().messages();
    assert_eq!(msgs.len(), 2);
    assert_eq!(msgs[0].kind, MessageType::Init);
    assert_eq!(&msgs[0].payload[..], b"BleConsole");
    assert_eq!(msgs[1].kind, MessageType::Test);
    assert_eq!(&msgs[1].payload[..], PROBE_TEXT);
    assert!(svc.handlers_mut().unwrap().platform().indicator);
}

#[test]
fn frames_are_always_full_size() {
    let (svc, _) = bound();
    for frame in &svc.transport().endpoint().frames {
        assert_eq!(frame.len(), 130);
        let len = frame[1] as usize;
        assert!(frame[2 + len..].iter().all(|&b| b == 0));
    }
}

#[test]
fn probe_reply_changes_nothing() {
    let (mut svc, _) = bound();
    let reply = TransportMessage::new(MessageType::Test, b"IPC Test from Net Core")
        .unwrap()
        .encode();
    assert!(deliver(&mut svc, &reply, 10));
    assert_eq!(svc.connection_state(), ConnectionState::Advertising);
}

#[test]
fn failed_init_frame_leaves_transport_error() {
    let mut svc = ipc_service(RecordingDelay::default());
    svc.transport_mut().endpoint_mut().fail_frames = 1;
    svc.handle_event(TransportEvent::Bound, 0);

    // The endpoint is bound even though the companion missed Init.
    assert!(svc.transport().is_ready());
    assert_eq!(svc.connection_state(), ConnectionState::Disconnected);

    assert!(deliver(&mut svc, &state_frame(ConnectionState::Connected), 100));
    assert_eq!(svc.connection_state(), ConnectionState::Connected);
    svc.poll(100 + u64::from(SETTLE_MS));
    assert_eq!(svc.transport().endpoint().sent_text(), GREETING);
}

// ── Companion state reports ───────────────────────────────────

#[test]
fn companion_connect_greets_after_settle() {
    let (mut svc, _) = bound();
    svc.transport_mut().endpoint_mut().frames.clear();

    assert!(deliver(&mut svc, &state_frame(ConnectionState::Connected), 500));
    assert_eq!(svc.connection_state(), ConnectionState::Connected);
    assert_eq!(svc.connection_count(), 1);
    assert!(svc.transport().endpoint().frames.is_empty());

    svc.poll(500 + u64::from(SETTLE_MS));
    assert_eq!(svc.transport().endpoint().sent_text(), GREETING);
    assert_eq!(svc.transport().endpoint().data_frames().len(), 1);
}

#[test]
fn companion_readvertising_ends_session() {
    let (mut svc, _) = connected();
    assert!(deliver(&mut svc, &state_frame(ConnectionState::Advertising), 0));
    assert_eq!(svc.connection_state(), ConnectionState::Advertising);
    assert_eq!(svc.connection_count(), 0);
    assert!(svc.handlers_mut().unwrap().platform().indicator);
}

#[test]
fn companion_disconnect_without_readvertise() {
    let (mut svc, _) = connected();
    assert!(deliver(&mut svc, &state_frame(ConnectionState::Disconnected), 0));
    // Advertising belongs to the companion; nothing re-arms it here.
    assert_eq!(svc.connection_state(), ConnectionState::Disconnected);
    assert!(svc.transport().endpoint().frames.is_empty());
}

#[test]
fn malformed_frames_are_dropped() {
    let (mut svc, _) = connected();
    assert!(!deliver(&mut svc, &[0x09, 0x00], 0));
    assert!(!deliver(&mut svc, &[0x03, 0x01, 0x07], 0));
    assert!(!deliver(&mut svc, &[0x04, 0x05, b'h'], 0));
    assert_eq!(svc.connection_state(), ConnectionState::Connected);
}

// ── Console traffic ───────────────────────────────────────────

#[test]
fn command_reply_is_one_frame_when_small() {
    let (mut svc, delay) = connected();
    assert!(deliver(&mut svc, &data_frame(b"uptime\n"), 0));
    let frames = svc.transport().endpoint().data_frames();
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0], b"Uptime: 0 hours, 0 minutes, 12 seconds\n");
    assert!(delay.pauses_ms.borrow().is_empty());
}

#[test]
fn help_reply_is_chunked_with_pauses() {
    let (mut svc, delay) = connected();
    assert!(deliver(&mut svc, &data_frame(b"help\r\n"), 0));

    let mut expected = String::from("Available commands:\n");
    for entry in &COMMANDS {
        expected.push_str(&format!("  {} - {}\n", entry.name, entry.help));
    }

    let endpoint = svc.transport().endpoint();
    let frames = endpoint.data_frames();
    assert_eq!(frames.len(), expected.len().div_ceil(IPC_CHUNK));
    assert!(frames.iter().all(|f| f.len() <= IPC_CHUNK));
    assert!(frames[..frames.len() - 1].iter().all(|f| f.len() == IPC_CHUNK));
    assert_eq!(endpoint.sent_text(), expected);

    let pauses = delay.pauses_ms.borrow();
    assert_eq!(pauses.len(), frames.len() - 1);
    assert!(pauses.iter().all(|&ms| ms == IPC_FRAGMENT_PAUSE_MS));
}

#[test]
fn three_hundred_bytes_make_three_frames() {
    let (mut svc, delay) = connected();
    svc.send(Target::Broadcast, &[b'#'; 300]).unwrap();
    let sizes: Vec<usize> = svc
        .transport()
        .endpoint()
        .data_frames()
        .iter()
        .map(Vec::len)
        .collect();
    assert_eq!(sizes, [120, 120, 60]);
    assert_eq!(*delay.pauses_ms.borrow(), [10, 10]);
}

#[test]
fn line_split_across_frames() {
    let (mut svc, _) = connected();
    assert!(deliver(&mut svc, &data_frame(b"echo spl"), 0));
    assert!(svc.transport().endpoint().frames.is_empty());
    assert!(deliver(&mut svc, &data_frame(b"it\n"), 0));
    assert_eq!(svc.transport().endpoint().sent_text(), "Echo: split\n");
}

// ── Endpoint loss ─────────────────────────────────────────────

#[test]
fn unbind_and_rebind() {
    let (mut svc, _) = connected();
    svc.handle_event(TransportEvent::Unbound, 0);
    assert_eq!(svc.connection_state(), ConnectionState::TransportError);
    assert_eq!(svc.connection_count(), 0);
    assert_eq!(
        svc.send(Target::Broadcast, b"lost"),
        Err(SendError::NotConnected)
    );

    // State reports are meaningless until the endpoint is back.
    assert!(deliver(&mut svc, &state_frame(ConnectionState::Connected), 0));
    assert_eq!(svc.connection_state(), ConnectionState::TransportError);

    svc.handle_event(TransportEvent::Bound, 100);
    assert_eq!(svc.connection_state(), ConnectionState::Advertising);
    let msgs = svc.transport().endpoint().messages();
    assert_eq!(msgs[0].kind, MessageType::Init);
}
