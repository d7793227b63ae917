//! Call queue membership and status.

use pbx_remote_core::Event;

use crate::action::Action;
use crate::error::SessionError;
use crate::session::Session;

impl Session {
    /// Add an interface to a queue.
    ///
    /// `penalty` is omitted when `None` or zero and `Paused` only sent when
    /// set.
    ///
    /// # Errors
    /// Returns error only if an event filter fails.
    pub async fn queue_add(
        &self,
        queue: &str,
        interface: &str,
        member_name: Option<&str>,
        penalty: Option<u32>,
        paused: bool,
    ) -> Result<bool, SessionError> {
        self.acknowledge(
            Action::new("QueueAdd")
                .param("Queue", queue)
                .param("Interface", interface)
                .param_opt("MemberName", member_name)
                .param_opt("Penalty", penalty.filter(|p| *p > 0))
                .flag("Paused", paused),
        )
        .await
    }

    /// Remove an interface from a queue.
    ///
    /// # Errors
    /// Returns error only if an event filter fails.
    pub async fn queue_remove(&self, queue: &str, interface: &str) -> Result<bool, SessionError> {
        self.acknowledge(
            Action::new("QueueRemove")
                .param("Queue", queue)
                .param("Interface", interface),
        )
        .await
    }

    /// Pause or unpause an interface in every queue it belongs to.
    ///
    /// # Errors
    /// Returns error only if an event filter fails.
    pub async fn queue_pause(&self, interface: &str, paused: bool) -> Result<bool, SessionError> {
        self.acknowledge(
            Action::new("QueuePause")
                .param("Interface", interface)
                .param("Paused", u8::from(paused)),
        )
        .await
    }

    /// Pause an interface.
    ///
    /// # Errors
    /// Returns error only if an event filter fails.
    pub async fn pause_queue_member(&self, interface: &str) -> Result<bool, SessionError> {
        self.queue_pause(interface, true).await
    }

    /// Unpause an interface.
    ///
    /// # Errors
    /// Returns error only if an event filter fails.
    pub async fn unpause_queue_member(&self, interface: &str) -> Result<bool, SessionError> {
        self.queue_pause(interface, false).await
    }

    /// Queue parameters, members and callers.
    ///
    /// # Errors
    /// Returns error only if an event filter fails.
    pub async fn queue_status(
        &self,
        queue: Option<&str>,
        member: Option<&str>,
    ) -> Result<Option<Vec<Event>>, SessionError> {
        self.list(
            Action::new("QueueStatus")
                .param_opt("Queue", queue)
                .param_opt("Member", member),
        )
        .await
    }

    /// Per-queue summary counters.
    ///
    /// # Errors
    /// Returns error only if an event filter fails.
    pub async fn queue_summary(&self, queue: Option<&str>) -> Result<Option<Vec<Event>>, SessionError> {
        self.list(Action::new("QueueSummary").param_opt("Queue", queue))
            .await
    }

    /// Configured agents.
    ///
    /// # Errors
    /// Returns error only if an event filter fails.
    pub async fn agents(&self) -> Result<Option<Vec<Event>>, SessionError> {
        self.list(Action::new("Agents")).await
    }

    /// Penalty rule definition.
    ///
    /// # Errors
    /// Returns error only if an event filter fails.
    pub async fn queue_rule(&self, rule: &str) -> Result<Option<Vec<Event>>, SessionError> {
        self.list(Action::new("QueueRule").param("Rule", rule)).await
    }

    /// Change the penalty of a queue member.
    ///
    /// # Errors
    /// Returns error only if an event filter fails.
    pub async fn queue_penalty(
        &self,
        interface: &str,
        queue: &str,
        penalty: u32,
    ) -> Result<bool, SessionError> {
        self.acknowledge(
            Action::new("QueuePenalty")
                .param("Interface", interface)
                .param("Queue", queue)
                .param("Penalty", penalty),
        )
        .await
    }

    /// All queues.
    ///
    /// # Errors
    /// Returns error only if an event filter fails.
    pub async fn queues(&self) -> Result<Option<Vec<Event>>, SessionError> {
        self.list(Action::new("Queues")).await
    }

    /// Write a custom entry to the queue log.
    ///
    /// # Errors
    /// Returns error only if an event filter fails.
    pub async fn queue_log(
        &self,
        queue: &str,
        unique_id: &str,
        interface: &str,
        event: &str,
        message: &str,
    ) -> Result<bool, SessionError> {
        self.acknowledge(
            Action::new("QueueLog")
                .param("Queue", queue)
                .param("UniqueID", unique_id)
                .param("Interface", interface)
                .param("Event", event)
                .param("Message", message),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::testing::{ScriptedTransport, ajax_response};
    use crate::Session;

    fn session(transport: &Arc<ScriptedTransport>) -> Session {
        Session::builder("http://pbx.test/mxml")
            .transport(transport.clone())
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_queue_add_omits_unset_options() {
        let transport = ScriptedTransport::new();
        transport.push_body(ajax_response(&[&[("response", "Success")]]));
        transport.push_body(ajax_response(&[&[("response", "Success")]]));
        let session = session(&transport);

        assert!(session.queue_add("support", "SIP/1001", None, Some(0), false).await.unwrap());
        assert!(
            session
                .queue_add("support", "SIP/1002", Some("Bob"), Some(3), true)
                .await
                .unwrap()
        );

        let requests = transport.requests();
        assert_eq!(
            requests[0].url.query(),
            Some("Action=QueueAdd&Queue=support&Interface=SIP%2F1001")
        );
        assert_eq!(
            requests[1].url.query(),
            Some("Action=QueueAdd&Queue=support&Interface=SIP%2F1002&MemberName=Bob&Penalty=3&Paused=1")
        );
    }

    #[tokio::test]
    async fn test_unpause_sends_zero() {
        let transport = ScriptedTransport::new();
        transport.push_body(ajax_response(&[&[("response", "Success")]]));
        let session = session(&transport);

        assert!(session.unpause_queue_member("SIP/1001").await.unwrap());
        assert_eq!(
            transport.requests()[0].url.query(),
            Some("Action=QueuePause&Interface=SIP%2F1001&Paused=0")
        );
    }

    #[tokio::test]
    async fn test_queue_status_failure_is_none() {
        let transport = ScriptedTransport::new();
        transport.push_body(ajax_response(&[&[("response", "Error"), ("message", "Permission denied")]]));
        let session = session(&transport);

        assert_eq!(session.queue_status(Some("support"), None).await.unwrap(), None);
        assert_eq!(session.last_error().as_deref(), Some("Permission denied"));
    }
}
