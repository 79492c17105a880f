//! Application core.
//!
//! [`service::ConsoleService`] is the connection manager; the
//! [`handlers::ConsoleHandlers`] set turns link events into console
//! behaviour. Board access goes through the **port traits** in [`ports`]
//! so the whole layer runs on the host against fakes.

pub mod events;
pub mod handlers;
pub mod ports;
pub mod runtime;
pub mod service;
pub mod status;
