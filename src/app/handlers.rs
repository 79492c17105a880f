//! Console handler set: what the device does with link events.
//!
//! | event            | indicator | link action                         |
//! |------------------|-----------|-------------------------------------|
//! | `ready`          | on        | liveness probe                      |
//! | `connected`      | toggle    | greeting banner                     |
//! | `disconnected`   | on        | -                                   |
//! | `data_received`  | -         | run commands, send replies to peer  |
//! | `idle`           | -         | reboot if `reset` was accepted      |

use core::fmt::Write;

use embedded_hal::delay::DelayNs;
use log::{debug, info, warn};

use crate::error::SendError;
use crate::shell::CommandDispatcher;
use crate::shell::commands::CommandContext;
use crate::transport::{DisconnectReason, PeerHandle, Target};

use super::events::{Link, LinkEvents};
use super::ports::Platform;
use super::status::{StatusLine, auto_status_line};

pub const GREETING_CAPACITY: usize = 160;

pub type Greeting = heapless::String<GREETING_CAPACITY>;

/// Banner sent once a peer has settled.
pub fn greeting(label: &str, subtitle: &str) -> Greeting {
    let mut out = Greeting::new();
    let _ = write!(
        out,
        "\n=== {} Device Connected ===\n{}\nType 'help' for available commands\n\n",
        label, subtitle
    );
    out
}

pub struct ConsoleHandlers<P: Platform, D: DelayNs> {
    platform: P,
    delay: D,
    dispatcher: CommandDispatcher,
    greeting: Greeting,
    /// Pause between the `reset` reply and the reboot.
    reset_delay_ms: u32,
    reboot_pending: bool,
}

impl<P: Platform, D: DelayNs> ConsoleHandlers<P, D> {
    pub fn new(platform: P, delay: D, greeting: Greeting, reset_delay_ms: u32) -> Self {
        Self {
            platform,
            delay,
            dispatcher: CommandDispatcher::new(),
            greeting,
            reset_delay_ms,
            reboot_pending: false,
        }
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn platform_mut(&mut self) -> &mut P {
        &mut self.platform
    }

    /// Compose the periodic status line from current readings.
    pub fn status_line(&mut self) -> StatusLine {
        auto_status_line(&mut self.platform)
    }
}

impl<P: Platform, D: DelayNs> LinkEvents for ConsoleHandlers<P, D> {
    fn ready(&mut self, link: &mut impl Link) {
        info!("CONSOLE: link ready");
        self.platform.set_indicator(true);
        match link.probe() {
            Ok(()) => {}
            Err(SendError::NotSupported) => debug!("CONSOLE: link has no probe"),
            Err(e) => warn!("CONSOLE: probe failed: {}", e),
        }
    }

    fn connected(&mut self, link: &mut impl Link) {
        info!("CONSOLE: peer connected");
        self.platform.toggle_indicator();
        if let Err(e) = link.send(Target::Broadcast, self.greeting.as_bytes()) {
            warn!("CONSOLE: greeting not sent: {}", e);
        }
    }

    fn disconnected(&mut self, reason: DisconnectReason) {
        info!("CONSOLE: peer disconnected (reason {})", reason.0);
        self.platform.set_indicator(true);
    }

    fn data_received(&mut self, source: Option<PeerHandle>, data: &[u8], link: &mut impl Link) {
        let target = source.map_or(Target::Broadcast, Target::Peer);
        let mut ctx = CommandContext::new(&mut self.platform, link.connection_count());
        self.dispatcher.feed(data, &mut ctx, |reply| {
            if let Err(e) = link.send(target, reply.as_bytes()) {
                warn!("CONSOLE: reply not sent: {}", e);
            }
        });
        self.reboot_pending |= ctx.reset_requested;
    }

    fn idle(&mut self) {
        if !core::mem::take(&mut self.reboot_pending) {
            return;
        }
        info!("CONSOLE: rebooting in {} ms", self.reset_delay_ms);
        self.delay.delay_ms(self.reset_delay_ms);
        self.platform.reboot();
    }
}
