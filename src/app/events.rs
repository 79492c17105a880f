//! Callback surface of the console service.
//!
//! The [`ConsoleService`](super::service::ConsoleService) forwards link
//! events to one [`LinkEvents`] implementation registered at `init`.
//! Every method has an empty default, so an implementation only writes
//! the slots it cares about. Callbacks run synchronously on the console
//! thread and must not block for long.
//!
//! Callbacks that need to answer get a [`Link`] handle: a narrow view of
//! the service that can send and query state but cannot re-enter event
//! dispatch.

use crate::error::SendError;
use crate::fsm::ConnectionState;
use crate::transport::{DisconnectReason, PeerHandle, Target};

/// What a callback may do with the link.
pub trait Link {
    /// One logical send, chunked to the transport capacity.
    fn send(&mut self, target: Target, data: &[u8]) -> Result<(), SendError>;

    fn state(&self) -> ConnectionState;

    fn connection_count(&self) -> usize;

    /// Ask the far side for a liveness reply.
    fn probe(&mut self) -> Result<(), SendError>;
}

pub trait LinkEvents {
    /// Transport bring-up finished and the link is advertising.
    fn ready(&mut self, _link: &mut impl Link) {}

    /// A peer linked and the settle delay elapsed.
    fn connected(&mut self, _link: &mut impl Link) {}

    /// Ends a session opened by `connected`; never fires without one.
    fn disconnected(&mut self, _reason: DisconnectReason) {}

    fn data_received(&mut self, _source: Option<PeerHandle>, _data: &[u8], _link: &mut impl Link) {}

    /// Exactly once per successful logical send.
    fn data_sent(&mut self) {}

    /// A peer enabled or disabled notifications.
    fn send_enabled(&mut self, _enabled: bool) {}

    /// The current event and its `data_sent` callbacks are done.
    fn idle(&mut self) {}
}

/// A handler set with every slot empty.
pub struct NoEvents;

impl LinkEvents for NoEvents {}

impl<H: LinkEvents> LinkEvents for &mut H {
    fn ready(&mut self, link: &mut impl Link) {
        (**self).ready(link);
    }

    fn connected(&mut self, link: &mut impl Link) {
        (**self).connected(link);
    }

    fn disconnected(&mut self, reason: DisconnectReason) {
        (**self).disconnected(reason);
    }

    fn data_received(&mut self, source: Option<PeerHandle>, data: &[u8], link: &mut impl Link) {
        (**self).data_received(source, data, link);
    }

    fn data_sent(&mut self) {
        (**self).data_sent();
    }

    fn send_enabled(&mut self, enabled: bool) {
        (**self).send_enabled(enabled);
    }

    fn idle(&mut self) {
        (**self).idle();
    }
}
