//! SIP and IAX2 peers.

use pbx_remote_core::Event;

use crate::action::Action;
use crate::error::SessionError;
use crate::session::Session;

impl Session {
    /// Details of one SIP peer, carried by the success record.
    ///
    /// # Errors
    /// Returns error only if an event filter fails.
    pub async fn sip_peer(&self, peer: &str) -> Result<Option<Event>, SessionError> {
        self.single(Action::new("SIPshowpeer").param("Peer", peer))
            .await
    }

    /// All SIP peers.
    ///
    /// # Errors
    /// Returns error only if an event filter fails.
    pub async fn sip_peers(&self) -> Result<Option<Vec<Event>>, SessionError> {
        self.list(Action::new("SIPpeers")).await
    }

    /// Ask the switch to qualify a SIP peer.
    ///
    /// # Errors
    /// Returns error only if an event filter fails.
    pub async fn sip_qualify_peer(&self, peer: &str) -> Result<bool, SessionError> {
        self.acknowledge(Action::new("SIPqualifypeer").param("Peer", peer))
            .await
    }

    /// Send a SIP NOTIFY on a channel.
    ///
    /// # Errors
    /// Returns error only if an event filter fails.
    pub async fn sip_notify(&self, channel: &str) -> Result<bool, SessionError> {
        self.acknowledge(Action::new("SIPnotify").param("Channel", channel))
            .await
    }

    /// SIP registrations.
    ///
    /// # Errors
    /// Returns error only if an event filter fails.
    pub async fn sip_registry(&self) -> Result<Option<Vec<Event>>, SessionError> {
        self.list(Action::new("SIPshowregistry")).await
    }

    /// IAX2 peers.
    ///
    /// # Errors
    /// Returns error only if an event filter fails.
    pub async fn iax_peers(&self) -> Result<Option<Vec<Event>>, SessionError> {
        self.list(Action::new("IAXpeers")).await
    }

    /// IAX2 peers, one event per peer.
    ///
    /// # Errors
    /// Returns error only if an event filter fails.
    pub async fn iax_peer_list(&self) -> Result<Option<Vec<Event>>, SessionError> {
        self.list(Action::new("IAXpeerlist")).await
    }

    /// IAX2 network statistics.
    ///
    /// # Errors
    /// Returns error only if an event filter fails.
    pub async fn iax_netstats(&self) -> Result<Option<Vec<Event>>, SessionError> {
        self.list(Action::new("IAXnetstats")).await
    }
}
