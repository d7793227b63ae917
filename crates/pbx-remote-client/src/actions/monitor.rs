//! Call recording.

use crate::action::Action;
use crate::error::SessionError;
use crate::session::Session;

impl Session {
    /// Start recording a channel.
    ///
    /// # Errors
    /// Returns error only if an event filter fails.
    pub async fn monitor(
        &self,
        channel: &str,
        file: Option<&str>,
        format: Option<&str>,
        mix: bool,
    ) -> Result<bool, SessionError> {
        self.acknowledge(
            Action::new("Monitor")
                .param("Channel", channel)
                .param_opt("File", file)
                .param_opt("Format", format)
                .flag("Mix", mix),
        )
        .await
    }

    /// # Errors
    /// Returns error only if an event filter fails.
    pub async fn stop_monitor(&self, channel: &str) -> Result<bool, SessionError> {
        self.acknowledge(Action::new("StopMonitor").param("Channel", channel))
            .await
    }

    /// Change the recording file name.
    ///
    /// # Errors
    /// Returns error only if an event filter fails.
    pub async fn change_monitor(&self, channel: &str, file: &str) -> Result<bool, SessionError> {
        self.acknowledge(
            Action::new("ChangeMonitor")
                .param("Channel", channel)
                .param("File", file),
        )
        .await
    }

    /// # Errors
    /// Returns error only if an event filter fails.
    pub async fn pause_monitor(&self, channel: &str) -> Result<bool, SessionError> {
        self.acknowledge(Action::new("PauseMonitor").param("Channel", channel))
            .await
    }

    /// # Errors
    /// Returns error only if an event filter fails.
    pub async fn unpause_monitor(&self, channel: &str) -> Result<bool, SessionError> {
        self.acknowledge(Action::new("UnpauseMonitor").param("Channel", channel))
            .await
    }
}

#[cfg(test)]
mod tests {
    use crate::testing::{ScriptedTransport, ajax_response};
    use crate::Session;

    #[tokio::test]
    async fn test_monitor_mix_flag() {
        let transport = ScriptedTransport::new();
        transport.push_body(ajax_response(&[&[("response", "Success")]]));
        let session = Session::builder("http://pbx.test/mxml")
            .transport(transport.clone())
            .build()
            .unwrap();

        assert!(session.monitor("SIP/1001-1", Some("call-42"), None, true).await.unwrap());
        assert_eq!(
            transport.requests()[0].url.query(),
            Some("Action=Monitor&Channel=SIP%2F1001-1&File=call-42&Mix=1")
        );
    }
}
