//! Console runtime: cooperative task set driving the service.
//!
//! ```text
//!  ┌──────────────────────────────────────────────────────────┐
//!  │  futures_lite::future::block_on                          │
//!  │  ┌────────────────────────────────────────────────────┐  │
//!  │  │  edge_executor::LocalExecutor                      │  │
//!  │  │                                                    │  │
//!  │  │  ┌────────────┐  ┌────────────┐  ┌──────────────┐  │  │
//!  │  │  │ Receive    │  │ Poll       │  │ Auto status  │  │  │
//!  │  │  │ INBOUND ⇣  │  │ 20ms ⏱     │  │ N s ⏱        │  │  │
//!  │  │  └────────────┘  └────────────┘  └──────────────┘  │  │
//!  │  └────────────────────────────────────────────────────┘  │
//!  └──────────────────────────────────────────────────────────┘
//! ```
//!
//! All three tasks share one `Rc<RefCell<ConsoleService>>`. Borrows never
//! span an `.await`, so the cell cannot be contended.

use core::cell::RefCell;
use core::time::Duration;
use std::rc::Rc;

use embedded_hal::delay::DelayNs;
use log::{info, warn};

use crate::config::SystemConfig;
use crate::transport::Transport;
use crate::transport::channels::INBOUND;

use super::handlers::ConsoleHandlers;
use super::ports::Platform;
use super::service::ConsoleService;
use super::status::publish_status;

/// Tick of the continuation poller. Bounds the jitter of the settle delay.
pub const POLL_INTERVAL_MS: u64 = 20;

pub type SharedService<T, D, P, HD> = Rc<RefCell<ConsoleService<T, D, ConsoleHandlers<P, HD>>>>;

/// Milliseconds since boot.
pub trait Clock: Clone {
    fn now_ms(&self) -> u64;
}

async fn receive_loop<T, D, P, HD, C>(service: SharedService<T, D, P, HD>, clock: C)
where
    T: Transport,
    D: DelayNs,
    P: Platform,
    HD: DelayNs,
    C: Clock,
{
    loop {
        let item = INBOUND.receive().await;
        let now = clock.now_ms();
        let mut svc = service.borrow_mut();
        if item.with_event(|event| svc.handle_event(event, now)).is_none() {
            warn!("RX: undecodable inter-core frame dropped");
        }
    }
}

async fn poll_loop<T, D, P, HD, C>(service: SharedService<T, D, P, HD>, clock: C)
where
    T: Transport,
    D: DelayNs,
    P: Platform,
    HD: DelayNs,
    C: Clock,
{
    loop {
        service.borrow_mut().poll(clock.now_ms());
        async_io_mini::Timer::after(Duration::from_millis(POLL_INTERVAL_MS)).await;
    }
}

async fn status_loop<T, D, P, HD>(service: SharedService<T, D, P, HD>, interval: Duration)
where
    T: Transport,
    D: DelayNs,
    P: Platform,
    HD: DelayNs,
{
    loop {
        async_io_mini::Timer::after(interval).await;
        // Failures are logged inside; the next tick retries.
        let _ = publish_status(&mut service.borrow_mut());
    }
}

/// Spawn the task set and drive it forever on the calling thread.
pub fn run<T, D, P, HD, C>(service: ConsoleService<T, D, ConsoleHandlers<P, HD>>, clock: C, config: &SystemConfig)
where
    T: Transport,
    D: DelayNs,
    P: Platform,
    HD: DelayNs,
    C: Clock,
{
    let executor: edge_executor::LocalExecutor<'_, 8> = edge_executor::LocalExecutor::new();
    let service: SharedService<T, D, P, HD> = Rc::new(RefCell::new(service));

    executor
        .spawn(receive_loop(service.clone(), clock.clone()))
        .detach();
    executor.spawn(poll_loop(service.clone(), clock)).detach();
    if config.auto_status {
        let interval = Duration::from_secs(u64::from(config.status_interval_secs));
        executor.spawn(status_loop(service, interval)).detach();
    }

    info!(
        "RUNTIME: started (auto status {}, every {} s)",
        if config.auto_status { "on" } else { "off" },
        config.status_interval_secs
    );

    futures_lite::future::block_on(executor.run(core::future::pending::<()>()));
}
