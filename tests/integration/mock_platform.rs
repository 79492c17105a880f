//! Mock adapters for integration tests.
//!
//! Records every indicator change, notification and inter-core frame so
//! tests can assert on the full history without a radio or a board.

use std::cell::RefCell;
use std::rc::Rc;

use bleconsole::app::handlers::{ConsoleHandlers, greeting};
use bleconsole::app::ports::{BatteryStatus, IndicatorPort, SystemInfo, SystemPort};
use bleconsole::app::service::ConsoleService;
use bleconsole::config::ConsoleConfig;
use bleconsole::error::{SensorError, TransportError};
use bleconsole::transport::ipc::{IpcEndpoint, IpcTransport};
use bleconsole::transport::message::{FRAME_LEN, MessageType, TransportMessage};
use bleconsole::transport::notify::{NotifyStack, NotifyTransport};
use bleconsole::transport::{DisconnectReason, PeerHandle, Target};
use embedded_hal::delay::DelayNs;

// ── Platform ──────────────────────────────────────────────────

pub struct MockPlatform {
    pub uptime_ms: u64,
    pub battery: Result<BatteryStatus, SensorError>,
    pub temp: Result<i32, SensorError>,
    pub indicator: bool,
    /// Every indicator level written, in order.
    pub indicator_log: Vec<bool>,
    pub reboots: u32,
}

#[allow(dead_code)]
impl MockPlatform {
    pub fn new() -> Self {
        Self {
            uptime_ms: 12_345,
            battery: Ok(BatteryStatus {
                voltage_mv: 3700,
                percentage: 58,
                is_charging: false,
                is_present: true,
            }),
            temp: Ok(24),
            indicator: false,
            indicator_log: Vec::new(),
            reboots: 0,
        }
    }

    /// No battery gauge, no die sensor.
    pub fn bare() -> Self {
        Self {
            battery: Err(SensorError::NotPresent),
            temp: Err(SensorError::NotPresent),
            ..Self::new()
        }
    }
}

impl SystemPort for MockPlatform {
    fn battery_status(&mut self) -> Result<BatteryStatus, SensorError> {
        self.battery
    }

    fn temperature_celsius(&mut self) -> Result<i32, SensorError> {
        self.temp
    }

    fn uptime_ms(&self) -> u64 {
        self.uptime_ms
    }

    fn free_heap_bytes(&self) -> u32 {
        48_000
    }

    fn system_info(&mut self) -> Result<SystemInfo, SensorError> {
        Ok(SystemInfo {
            board_name: "mock-board",
            soc_name: "mock-soc",
            uptime_ms: self.uptime_ms,
            free_heap_bytes: self.free_heap_bytes(),
        })
    }

    fn reboot(&mut self) {
        self.reboots += 1;
    }
}

impl IndicatorPort for MockPlatform {
    fn set_indicator(&mut self, on: bool) {
        self.indicator = on;
        self.indicator_log.push(on);
    }

    fn toggle_indicator(&mut self) {
        self.set_indicator(!self.indicator);
    }

    fn indicator_is_on(&self) -> bool {
        self.indicator
    }
}

// ── Delay ─────────────────────────────────────────────────────

/// Records every millisecond pause; never sleeps.
#[derive(Clone, Default)]
pub struct RecordingDelay {
    pub pauses_ms: Rc<RefCell<Vec<u32>>>,
}

impl DelayNs for RecordingDelay {
    fn delay_ns(&mut self, _ns: u32) {}

    fn delay_ms(&mut self, ms: u32) {
        self.pauses_ms.borrow_mut().push(ms);
    }
}

// ── Notify stack ──────────────────────────────────────────────

pub struct MockStack {
    pub mtu: u16,
    pub advertising: bool,
    pub adv_starts: u32,
    pub notified: Vec<(Target, Vec<u8>)>,
    pub disconnects: Vec<PeerHandle>,
}

#[allow(dead_code)]
impl MockStack {
    pub fn new(mtu: u16) -> Self {
        Self {
            mtu,
            advertising: false,
            adv_starts: 0,
            notified: Vec::new(),
            disconnects: Vec::new(),
        }
    }

    /// Concatenated payloads sent to `target`.
    pub fn text_to(&self, target: Target) -> String {
        let bytes: Vec<u8> = self
            .notified
            .iter()
            .filter(|(t, _)| *t == target)
            .flat_map(|(_, d)| d.iter().copied())
            .collect();
        String::from_utf8(bytes).unwrap()
    }
}

impl NotifyStack for MockStack {
    fn enable(&mut self, _config: &ConsoleConfig, _mtu: u16) -> Result<(), TransportError> {
        Ok(())
    }

    fn register_console_service(&mut self) -> Result<(), TransportError> {
        Ok(())
    }

    fn start_advertising(&mut self, _config: &ConsoleConfig) -> Result<(), TransportError> {
        self.advertising = true;
        self.adv_starts += 1;
        Ok(())
    }

    fn stop_advertising(&mut self) -> Result<(), TransportError> {
        self.advertising = false;
        Ok(())
    }

    fn notify(&mut self, target: Target, data: &[u8]) -> Result<(), TransportError> {
        self.notified.push((target, data.to_vec()));
        Ok(())
    }

    fn disconnect(&mut self, peer: PeerHandle, _reason: DisconnectReason) -> Result<(), TransportError> {
        self.disconnects.push(peer);
        Ok(())
    }

    fn mtu(&self) -> u16 {
        self.mtu
    }
}

// ── Inter-core endpoint ───────────────────────────────────────

#[derive(Default)]
pub struct MockEndpoint {
    pub registered: bool,
    pub frames: Vec<[u8; FRAME_LEN]>,
    /// Reject this many upcoming frames with `Failure(-1)`.
    pub fail_frames: u32,
}

#[allow(dead_code)]
impl MockEndpoint {
    pub fn messages(&self) -> Vec<TransportMessage> {
        self.frames
            .iter()
            .map(|f| TransportMessage::decode(f).unwrap())
            .collect()
    }

    /// Payloads of every `SendData` frame, in order.
    pub fn data_frames(&self) -> Vec<Vec<u8>> {
        self.messages()
            .into_iter()
            .filter(|m| m.kind == MessageType::SendData)
            .map(|m| m.payload.to_vec())
            .collect()
    }

    pub fn sent_text(&self) -> String {
        String::from_utf8(self.data_frames().concat()).unwrap()
    }
}

impl IpcEndpoint for MockEndpoint {
    fn register(&mut self) -> Result<(), TransportError> {
        self.registered = true;
        Ok(())
    }

    fn send_frame(&mut self, frame: &[u8; FRAME_LEN]) -> Result<(), TransportError> {
        if self.fail_frames > 0 {
            self.fail_frames -= 1;
            return Err(TransportError::Failure(-1));
        }
        self.frames.push(*frame);
        Ok(())
    }
}

// ── Service builders ──────────────────────────────────────────

pub const SETTLE_MS: u32 = 1000;
pub const RESET_DELAY_MS: u32 = 100;

pub type Handlers = ConsoleHandlers<MockPlatform, RecordingDelay>;
pub type NotifyService = ConsoleService<NotifyTransport<MockStack>, RecordingDelay, Handlers>;
pub type IpcService = ConsoleService<IpcTransport<MockEndpoint>, RecordingDelay, Handlers>;

pub fn handlers(platform: MockPlatform, subtitle: &str) -> Handlers {
    let config = ConsoleConfig::default();
    ConsoleHandlers::new(
        platform,
        RecordingDelay::default(),
        greeting(&config.device_label, subtitle),
        RESET_DELAY_MS,
    )
}

/// Single-core service, initialised but not yet bound.
#[allow(dead_code)]
pub fn notify_service(mtu: u16, delay: RecordingDelay) -> NotifyService {
    let transport = NotifyTransport::new(MockStack::new(mtu), 247);
    let mut svc = ConsoleService::new(transport, delay, SETTLE_MS);
    svc.init(ConsoleConfig::default(), handlers(MockPlatform::new(), "Single Core BLE"))
        .unwrap();
    svc
}

/// Dual-core service, initialised but not yet bound.
#[allow(dead_code)]
pub fn ipc_service(delay: RecordingDelay) -> IpcService {
    let transport = IpcTransport::new(MockEndpoint::default());
    let mut svc = ConsoleService::new(transport, delay, SETTLE_MS);
    svc.init(
        ConsoleConfig::default(),
        handlers(MockPlatform::new(), "Application Core + Network Core BLE"),
    )
    .unwrap();
    svc
}
