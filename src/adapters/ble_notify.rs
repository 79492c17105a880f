//! Bluedroid console stack.
//!
//! Implements [`NotifyStack`] on top of the ESP-IDF Bluedroid host: one
//! GATT service with a writable RX characteristic and a notifying TX
//! characteristic (plus its CCCD).
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: raw `esp_idf_svc::sys` Bluedroid calls.
//! - **all other targets**: in-memory simulation for host-side tests.
//!
//! ## Callback bridge
//!
//! GAP/GATTS callbacks run in the Bluedroid task. They record handles in
//! static atomics and post owned [`Inbound`] items; nothing in here calls
//! back into the console.
//!
//! ```text
//!  app_register ─▶ REG ─▶ create service ─▶ add RX ─▶ add TX ─▶ add CCCD ─▶ Inbound::Bound
//! ```
//!
//! Each peer slot carries the ATT MTU that peer negotiated. The stack
//! reports the smallest one, so a fragment fits every linked peer.

use log::info;

use crate::config::ConsoleConfig;
use crate::error::TransportError;
use crate::transport::notify::{DEFAULT_ATT_MTU, NotifyStack};
use crate::transport::registry::MAX_PEERS;
use crate::transport::{DisconnectReason, PeerHandle, Target};

#[cfg(target_os = "espidf")]
use crate::transport::notify::{CHAR_CONSOLE_RX, CHAR_CONSOLE_TX, SERVICE_UUID};

/// Peer table entry: connection id, notification subscription and the
/// ATT MTU negotiated on that link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PeerSlot {
    conn_id: PeerHandle,
    subscribed: bool,
    mtu: u16,
}

type PeerTable = heapless::Vec<PeerSlot, MAX_PEERS>;

/// Smallest MTU across linked peers; the ATT default with none linked.
fn min_mtu(peers: &PeerTable) -> u16 {
    peers
        .iter()
        .map(|slot| slot.mtu)
        .min()
        .unwrap_or(DEFAULT_ATT_MTU)
}

// ───────────────────────────────────────────────────────────────
// ESP-IDF static state
// ───────────────────────────────────────────────────────────────
//
// Bluedroid callbacks are C function pointers that cannot capture Rust
// closures. These statics bridge the callback context to the adapter.

#[cfg(target_os = "espidf")]
mod bridge {
    use core::sync::atomic::{AtomicBool, AtomicU16, AtomicU32, Ordering};
    use std::sync::Mutex;

    use esp_idf_svc::sys::*;
    use log::{info, warn};

    use super::{
        CHAR_CONSOLE_RX, CHAR_CONSOLE_TX, DEFAULT_ATT_MTU, PeerSlot, PeerTable, SERVICE_UUID,
    };
    use crate::transport::DisconnectReason;
    use crate::transport::channels::{Inbound, post};

    pub static GATTS_IF: AtomicU32 = AtomicU32::new(0);
    pub static SVC_HANDLE: AtomicU32 = AtomicU32::new(0);
    pub static RX_HANDLE: AtomicU32 = AtomicU32::new(0);
    pub static TX_HANDLE: AtomicU32 = AtomicU32::new(0);
    pub static CCCD_HANDLE: AtomicU32 = AtomicU32::new(0);
    static CHAR_STEP: AtomicU32 = AtomicU32::new(0);

    /// Register the console service once the app is registered.
    pub static SERVICE_WANTED: AtomicBool = AtomicBool::new(false);
    pub static ADV_UNITS: AtomicU16 = AtomicU16::new(160);
    pub static ADV_CONNECTABLE: AtomicBool = AtomicBool::new(true);

    /// GATTS callbacks run in the Bluedroid task (not ISR), so std Mutex is safe.
    pub static PEERS: Mutex<PeerTable> = Mutex::new(PeerTable::new());

    const CCCD_NOTIFY: u16 = 0x0001;

    pub fn uuid128(uuid: u128) -> esp_bt_uuid_t {
        // SAFETY: esp_bt_uuid_t is a plain C struct; all-zero is valid.
        let mut t: esp_bt_uuid_t = unsafe { core::mem::zeroed() };
        t.len = 16;
        t.uuid.uuid128 = uuid.to_le_bytes();
        t
    }

    fn uuid16(uuid: u16) -> esp_bt_uuid_t {
        // SAFETY: as above.
        let mut t: esp_bt_uuid_t = unsafe { core::mem::zeroed() };
        t.len = 2;
        t.uuid.uuid16 = uuid;
        t
    }

    unsafe fn add_char(svc_handle: u16, uuid: u128, perm: u32, prop: u32) {
        let mut char_uuid = uuid128(uuid);
        // SAFETY: Bluedroid copies the UUID before returning.
        unsafe {
            esp_ble_gatts_add_char(
                svc_handle,
                &mut char_uuid,
                perm as esp_gatt_perm_t,
                prop as esp_gatt_char_prop_t,
                core::ptr::null_mut(),
                core::ptr::null_mut(),
            );
        }
    }

    pub unsafe fn start_advertising_now() {
        let units = ADV_UNITS.load(Ordering::Relaxed);
        let adv_type = if ADV_CONNECTABLE.load(Ordering::Relaxed) {
            esp_ble_adv_type_t_ADV_TYPE_IND
        } else {
            esp_ble_adv_type_t_ADV_TYPE_NONCONN_IND
        };
        // SAFETY: zeroed tail fields (peer address) are valid for undirected advertising.
        unsafe {
            let mut params = esp_ble_adv_params_t {
                adv_int_min: units,
                adv_int_max: units,
                adv_type,
                own_addr_type: esp_ble_addr_type_t_BLE_ADDR_TYPE_PUBLIC,
                channel_map: esp_ble_adv_channel_t_ADV_CHNL_ALL,
                adv_filter_policy: esp_ble_adv_filter_t_ADV_FILTER_ALLOW_SCAN_ANY_CON_ANY,
                ..core::mem::zeroed()
            };
            esp_ble_gap_start_advertising(&mut params);
        }
    }

    fn lock_peers() -> Option<std::sync::MutexGuard<'static, PeerTable>> {
        PEERS.lock().ok()
    }

    pub unsafe extern "C" fn gap_event_handler(
        event: esp_gap_ble_cb_event_t,
        param: *mut esp_ble_gap_cb_param_t,
    ) {
        match event {
            esp_gap_ble_cb_event_t_ESP_GAP_BLE_ADV_DATA_SET_COMPLETE_EVT => {
                // SAFETY: called from the Bluedroid task after adv data is latched.
                unsafe { start_advertising_now() };
            }
            esp_gap_ble_cb_event_t_ESP_GAP_BLE_ADV_START_COMPLETE_EVT => {
                // SAFETY: param is valid for this event.
                let status = unsafe { (*param).adv_start_cmpl.status };
                if status == esp_bt_status_t_ESP_BT_STATUS_SUCCESS {
                    info!("BLE GAP: advertising started");
                } else {
                    warn!("BLE GAP: advertising start failed (status={})", status);
                    post(Inbound::AdvertisingStopped);
                }
            }
            esp_gap_ble_cb_event_t_ESP_GAP_BLE_ADV_STOP_COMPLETE_EVT => {
                info!("BLE GAP: advertising stopped");
                post(Inbound::AdvertisingStopped);
            }
            _ => {}
        }
    }

    pub unsafe extern "C" fn gatts_event_handler(
        event: esp_gatts_cb_event_t,
        gatts_if: esp_gatt_if_t,
        param: *mut esp_ble_gatts_cb_param_t,
    ) {
        GATTS_IF.store(u32::from(gatts_if), Ordering::Relaxed);

        // SAFETY: Bluedroid passes a param pointer valid for the duration
        // of the callback, with the union member matching `event`.
        unsafe {
            match event {
                esp_gatts_cb_event_t_ESP_GATTS_REG_EVT => {
                    info!("BLE GATTS: app registered (if={})", gatts_if);
                    if !SERVICE_WANTED.load(Ordering::Relaxed) {
                        post(Inbound::Bound);
                        return;
                    }
                    let mut svc_id = esp_gatt_srvc_id_t {
                        id: esp_gatt_id_t {
                            uuid: uuid128(SERVICE_UUID),
                            inst_id: 0,
                        },
                        is_primary: true,
                    };
                    esp_ble_gatts_create_service(gatts_if, &mut svc_id, 8);
                }
                esp_gatts_cb_event_t_ESP_GATTS_CREATE_EVT => {
                    let svc_handle = (*param).create.service_handle;
                    SVC_HANDLE.store(u32::from(svc_handle), Ordering::Relaxed);
                    esp_ble_gatts_start_service(svc_handle);
                    CHAR_STEP.store(1, Ordering::Relaxed);
                    add_char(
                        svc_handle,
                        CHAR_CONSOLE_RX,
                        ESP_GATT_PERM_WRITE,
                        ESP_GATT_CHAR_PROP_BIT_WRITE | ESP_GATT_CHAR_PROP_BIT_WRITE_NR,
                    );
                }
                esp_gatts_cb_event_t_ESP_GATTS_ADD_CHAR_EVT => {
                    let handle = u32::from((*param).add_char.attr_handle);
                    let svc_handle = SVC_HANDLE.load(Ordering::Relaxed) as u16;
                    match CHAR_STEP.load(Ordering::Relaxed) {
                        1 => {
                            RX_HANDLE.store(handle, Ordering::Relaxed);
                            CHAR_STEP.store(2, Ordering::Relaxed);
                            add_char(
                                svc_handle,
                                CHAR_CONSOLE_TX,
                                ESP_GATT_PERM_READ,
                                ESP_GATT_CHAR_PROP_BIT_NOTIFY,
                            );
                        }
                        2 => {
                            TX_HANDLE.store(handle, Ordering::Relaxed);
                            CHAR_STEP.store(3, Ordering::Relaxed);
                            let mut cccd = uuid16(ESP_GATT_UUID_CHAR_CLIENT_CONFIG as u16);
                            esp_ble_gatts_add_char_descr(
                                svc_handle,
                                &mut cccd,
                                (ESP_GATT_PERM_READ | ESP_GATT_PERM_WRITE) as esp_gatt_perm_t,
                                core::ptr::null_mut(),
                                core::ptr::null_mut(),
                            );
                        }
                        _ => {}
                    }
                }
                esp_gatts_cb_event_t_ESP_GATTS_ADD_CHAR_DESCR_EVT => {
                    CCCD_HANDLE.store(
                        u32::from((*param).add_char_descr.attr_handle),
                        Ordering::Relaxed,
                    );
                    info!(
                        "BLE GATTS: console service up (rx={}, tx={})",
                        RX_HANDLE.load(Ordering::Relaxed),
                        TX_HANDLE.load(Ordering::Relaxed)
                    );
                    post(Inbound::Bound);
                }
                esp_gatts_cb_event_t_ESP_GATTS_CONNECT_EVT => {
                    let conn_id = (*param).connect.conn_id;
                    if let Some(mut peers) = lock_peers() {
                        let _ = peers.push(PeerSlot {
                            conn_id,
                            subscribed: false,
                            mtu: DEFAULT_ATT_MTU,
                        });
                    }
                    post(Inbound::PeerConnected(conn_id));
                }
                esp_gatts_cb_event_t_ESP_GATTS_DISCONNECT_EVT => {
                    let p = &(*param).disconnect;
                    if let Some(mut peers) = lock_peers() {
                        peers.retain(|slot| slot.conn_id != p.conn_id);
                    }
                    post(Inbound::PeerDisconnected {
                        peer: p.conn_id,
                        reason: DisconnectReason(p.reason as u8),
                    });
                }
                esp_gatts_cb_event_t_ESP_GATTS_MTU_EVT => {
                    let p = &(*param).mtu;
                    info!("BLE GATTS: peer {} MTU {}", p.conn_id, p.mtu);
                    if let Some(mut peers) = lock_peers() {
                        for slot in peers.iter_mut().filter(|s| s.conn_id == p.conn_id) {
                            slot.mtu = p.mtu;
                        }
                    }
                }
                esp_gatts_cb_event_t_ESP_GATTS_WRITE_EVT => {
                    let p = &(*param).write;
                    if p.need_rsp {
                        esp_ble_gatts_send_response(
                            gatts_if,
                            p.conn_id,
                            p.trans_id,
                            esp_gatt_status_t_ESP_GATT_OK,
                            core::ptr::null_mut(),
                        );
                    }
                    let data = core::slice::from_raw_parts(p.value, p.len as usize);
                    let handle = u32::from(p.handle);
                    if handle == RX_HANDLE.load(Ordering::Relaxed) {
                        post(Inbound::received(Some(p.conn_id), data));
                    } else if handle == CCCD_HANDLE.load(Ordering::Relaxed) && data.len() >= 2 {
                        let enabled = u16::from_le_bytes([data[0], data[1]]) & CCCD_NOTIFY != 0;
                        if let Some(mut peers) = lock_peers() {
                            for slot in peers.iter_mut().filter(|s| s.conn_id == p.conn_id) {
                                slot.subscribed = enabled;
                            }
                        }
                        post(Inbound::SubscriptionChanged {
                            peer: p.conn_id,
                            enabled,
                        });
                    }
                }
                _ => {}
            }
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Stack adapter
// ───────────────────────────────────────────────────────────────

pub struct BluedroidStack {
    advertising: bool,
    /// Simulation: peers as the sim sees them.
    #[cfg(not(target_os = "espidf"))]
    sim_peers: PeerTable,
    /// Simulation: per-peer notifications pushed so far.
    #[cfg(not(target_os = "espidf"))]
    sim_notify_count: usize,
}

impl Default for BluedroidStack {
    fn default() -> Self {
        Self::new()
    }
}

impl BluedroidStack {
    pub fn new() -> Self {
        Self {
            advertising: false,
            #[cfg(not(target_os = "espidf"))]
            sim_peers: PeerTable::new(),
            #[cfg(not(target_os = "espidf"))]
            sim_notify_count: 0,
        }
    }

    pub fn is_advertising(&self) -> bool {
        self.advertising
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_enable(&mut self, config: &ConsoleConfig, preferred_mtu: u16) -> Result<(), TransportError> {
        use core::sync::atomic::Ordering;
        use esp_idf_svc::sys::*;
        // SAFETY: called once from the console thread during init, before
        // any callback can fire.
        unsafe {
            // Release classic BT memory (BLE-only mode saves ~30 KB).
            esp_bt_controller_mem_release(esp_bt_mode_t_ESP_BT_MODE_CLASSIC_BT);

            let mut bt_cfg = esp_bt_controller_config_t::default();
            check(esp_bt_controller_init(&mut bt_cfg))?;
            check(esp_bt_controller_enable(esp_bt_mode_t_ESP_BT_MODE_BLE))?;
            check(esp_bluedroid_init())?;
            check(esp_bluedroid_enable())?;

            check(esp_ble_gap_register_callback(Some(bridge::gap_event_handler)))?;
            check(esp_ble_gatts_register_callback(Some(bridge::gatts_event_handler)))?;

            // Nul-terminated copy of the label for the C API.
            let mut name: heapless::Vec<u8, 32> = heapless::Vec::new();
            let _ = name.extend_from_slice(config.device_label.as_bytes());
            let _ = name.push(0);
            check(esp_ble_gap_set_device_name(name.as_ptr().cast()))?;
            check(esp_ble_gatt_set_local_mtu(preferred_mtu))?;

            // REG_EVT reads this flag, so it must be set before registering.
            bridge::SERVICE_WANTED.store(config.enable_console_service, Ordering::Relaxed);
            check(esp_ble_gatts_app_register(0))?;
        }
        info!("BLE(espidf): Bluedroid enabled as '{}'", config.device_label);
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_enable(&mut self, config: &ConsoleConfig, preferred_mtu: u16) -> Result<(), TransportError> {
        info!(
            "BLE(sim): enabled as '{}' (preferred MTU {})",
            config.device_label, preferred_mtu
        );
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_register(&mut self) -> Result<(), TransportError> {
        use core::sync::atomic::Ordering;
        if !bridge::SERVICE_WANTED.load(Ordering::Relaxed) {
            log::warn!("BLE(espidf): console service requested after app registration");
            return Err(TransportError::NotReady);
        }
        info!("BLE(espidf): console service {:032x} pending", SERVICE_UUID);
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_register(&mut self) -> Result<(), TransportError> {
        info!("BLE(sim): console service {:032x} registered", crate::transport::notify::SERVICE_UUID);
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_start_advertising(&mut self, config: &ConsoleConfig) -> Result<(), TransportError> {
        use core::sync::atomic::Ordering;
        use esp_idf_svc::sys::*;
        bridge::ADV_UNITS.store(config.advertising_interval_units(), Ordering::Relaxed);
        bridge::ADV_CONNECTABLE.store(config.connectable, Ordering::Relaxed);
        // SAFETY: adv data is copied by Bluedroid; advertising starts from
        // the ADV_DATA_SET_COMPLETE callback.
        unsafe {
            let mut adv_data = esp_ble_adv_data_t {
                set_scan_rsp: false,
                include_name: true,
                include_txpower: false,
                flag: (ESP_BLE_ADV_FLAG_GEN_DISC | ESP_BLE_ADV_FLAG_BREDR_NOT_SPT) as u8,
                ..core::mem::zeroed()
            };
            check(esp_ble_gap_config_adv_data(&mut adv_data))
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_start_advertising(&mut self, config: &ConsoleConfig) -> Result<(), TransportError> {
        info!(
            "BLE(sim): advertising '{}' ({} units, connectable={})",
            config.device_label,
            config.advertising_interval_units(),
            config.connectable
        );
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_stop_advertising(&mut self) -> Result<(), TransportError> {
        // SAFETY: plain Bluedroid request; completion arrives as a GAP event.
        check(unsafe { esp_idf_svc::sys::esp_ble_gap_stop_advertising() })
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_stop_advertising(&mut self) -> Result<(), TransportError> {
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_notify(&mut self, target: Target, data: &[u8]) -> Result<(), TransportError> {
        use core::sync::atomic::Ordering;
        use esp_idf_svc::sys::*;

        let gatts_if = bridge::GATTS_IF.load(Ordering::Relaxed) as esp_gatt_if_t;
        let tx = bridge::TX_HANDLE.load(Ordering::Relaxed) as u16;
        let peers: PeerTable = bridge::PEERS
            .lock()
            .map(|p| p.clone())
            .map_err(|_| TransportError::Failure(-1))?;

        let mut sent = 0usize;
        for slot in peers.iter().filter(|s| match target {
            Target::Peer(peer) => s.conn_id == peer,
            Target::Broadcast => s.subscribed,
        }) {
            // SAFETY: Bluedroid copies `data` into its own buffer.
            check(unsafe {
                esp_ble_gatts_send_indicate(
                    gatts_if,
                    slot.conn_id,
                    tx,
                    data.len() as u16,
                    data.as_ptr().cast_mut(),
                    false,
                )
            })?;
            sent += 1;
        }
        match (target, sent) {
            (Target::Peer(_), 0) => Err(TransportError::NotConnected),
            _ => Ok(()),
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_notify(&mut self, target: Target, data: &[u8]) -> Result<(), TransportError> {
        let reached = self
            .sim_peers
            .iter()
            .filter(|s| match target {
                Target::Peer(peer) => s.conn_id == peer,
                Target::Broadcast => s.subscribed,
            })
            .count();
        if matches!(target, Target::Peer(_)) && reached == 0 {
            return Err(TransportError::NotConnected);
        }
        self.sim_notify_count += reached;
        log::debug!("BLE(sim): notify {:?} ({} bytes, {} peers)", target, data.len(), reached);
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_disconnect(&mut self, peer: PeerHandle, reason: DisconnectReason) -> Result<(), TransportError> {
        use core::sync::atomic::Ordering;
        info!("BLE(espidf): closing peer {} (reason 0x{:02x})", peer, reason.0);
        let gatts_if = bridge::GATTS_IF.load(Ordering::Relaxed) as esp_idf_svc::sys::esp_gatt_if_t;
        // SAFETY: plain Bluedroid request; completion arrives as DISCONNECT_EVT.
        check(unsafe { esp_idf_svc::sys::esp_ble_gatts_close(gatts_if, peer) })
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_disconnect(&mut self, peer: PeerHandle, reason: DisconnectReason) -> Result<(), TransportError> {
        let before = self.sim_peers.len();
        self.sim_peers.retain(|s| s.conn_id != peer);
        if self.sim_peers.len() == before {
            return Err(TransportError::NotConnected);
        }
        info!("BLE(sim): peer {} dropped (reason 0x{:02x})", peer, reason.0);
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_mtu(&self) -> u16 {
        bridge::PEERS
            .lock()
            .map_or(DEFAULT_ATT_MTU, |peers| min_mtu(&peers))
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_mtu(&self) -> u16 {
        min_mtu(&self.sim_peers)
    }
}

#[cfg(target_os = "espidf")]
fn check(rc: esp_idf_svc::sys::esp_err_t) -> Result<(), TransportError> {
    if rc == esp_idf_svc::sys::ESP_OK {
        Ok(())
    } else {
        log::error!("BLE(espidf): call failed ({})", rc);
        Err(TransportError::Failure(rc))
    }
}

// ── Simulation hooks ──────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
impl BluedroidStack {
    /// Simulate a central linking and then exchanging `mtu`.
    pub fn sim_connect(&mut self, peer: PeerHandle, mtu: u16) -> bool {
        let linked = self
            .sim_peers
            .push(PeerSlot {
                conn_id: peer,
                subscribed: false,
                mtu: DEFAULT_ATT_MTU,
            })
            .is_ok();
        self.sim_exchange_mtu(peer, mtu);
        linked
    }

    /// Simulate an ATT MTU exchange on an existing link.
    pub fn sim_exchange_mtu(&mut self, peer: PeerHandle, mtu: u16) {
        for slot in self.sim_peers.iter_mut().filter(|s| s.conn_id == peer) {
            slot.mtu = mtu;
        }
    }

    pub fn sim_subscribe(&mut self, peer: PeerHandle, enabled: bool) {
        for slot in self.sim_peers.iter_mut().filter(|s| s.conn_id == peer) {
            slot.subscribed = enabled;
        }
    }

    pub fn sim_notify_count(&self) -> usize {
        self.sim_notify_count
    }
}

// ───────────────────────────────────────────────────────────────
// NotifyStack implementation
// ───────────────────────────────────────────────────────────────

impl NotifyStack for BluedroidStack {
    fn enable(&mut self, config: &ConsoleConfig, preferred_mtu: u16) -> Result<(), TransportError> {
        self.platform_enable(config, preferred_mtu)
    }

    fn register_console_service(&mut self) -> Result<(), TransportError> {
        self.platform_register()
    }

    fn start_advertising(&mut self, config: &ConsoleConfig) -> Result<(), TransportError> {
        self.platform_start_advertising(config)?;
        self.advertising = true;
        Ok(())
    }

    fn stop_advertising(&mut self) -> Result<(), TransportError> {
        self.platform_stop_advertising()?;
        self.advertising = false;
        Ok(())
    }

    fn notify(&mut self, target: Target, data: &[u8]) -> Result<(), TransportError> {
        self.platform_notify(target, data)
    }

    fn disconnect(&mut self, peer: PeerHandle, reason: DisconnectReason) -> Result<(), TransportError> {
        self.platform_disconnect(peer, reason)
    }

    fn mtu(&self) -> u16 {
        self.platform_mtu()
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
