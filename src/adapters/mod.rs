//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter      | Implements                 | Connects to              |
//! |--------------|----------------------------|--------------------------|
//! | `ble_notify` | NotifyStack                | Bluedroid GATT server    |
//! | `hardware`   | SystemPort, IndicatorPort  | GPIO, ADC1, die sensor   |
//! | `time`       | Clock, DelayNs             | ESP32 system timer       |

pub mod ble_notify;
pub mod hardware;
pub mod time;
pub(crate) mod utils;
