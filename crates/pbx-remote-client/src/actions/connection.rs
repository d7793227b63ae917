//! Login, logoff and keep-alive.

use pbx_remote_core::Event;

use crate::action::Action;
use crate::error::SessionError;
use crate::session::Session;

impl Session {
    /// Authenticate with the configured credentials.
    ///
    /// # Errors
    /// Returns [`SessionError::MissingCredentials`] if none are configured.
    pub async fn login(&self) -> Result<bool, SessionError> {
        let (username, secret) = self.login_parameters()?;
        self.acknowledge(
            Action::new("Login")
                .param("Username", username)
                .param("Secret", secret),
        )
        .await
    }

    /// Store new credentials and authenticate with them.
    ///
    /// # Errors
    /// Returns [`SessionError::MissingCredentials`] if the username is empty.
    pub async fn login_with(
        &self,
        username: impl Into<String>,
        secret: impl Into<String>,
    ) -> Result<bool, SessionError> {
        self.set_credentials(username, secret);
        self.login().await
    }

    /// End the manager session. Succeeds on `Goodbye`.
    ///
    /// # Errors
    /// Returns error only if an event filter fails.
    pub async fn logoff(&self) -> Result<bool, SessionError> {
        self.acknowledge(Action::new("Logoff")).await
    }

    /// Keep the session alive.
    ///
    /// # Errors
    /// Returns error only if an event filter fails.
    pub async fn ping(&self) -> Result<bool, SessionError> {
        self.acknowledge(Action::new("Ping")).await
    }

    /// Wait for pending events on the session.
    ///
    /// # Errors
    /// Returns error only if an event filter fails.
    pub async fn wait_event(&self) -> Result<Option<Vec<Event>>, SessionError> {
        self.list(Action::new("WaitEvent")).await
    }

    /// Request an MD5 login challenge.
    ///
    /// # Errors
    /// Returns error only if an event filter fails.
    pub async fn challenge(&self) -> Result<Option<Event>, SessionError> {
        self.single(Action::new("Challenge").param("AuthType", "MD5")).await
    }

    /// Set the event mask of the session, e.g. `"on"`, `"off"` or
    /// `"system,call"`.
    ///
    /// # Errors
    /// Returns error only if an event filter fails.
    pub async fn events(&self, mask: &str) -> Result<bool, SessionError> {
        self.acknowledge(Action::new("Events").param("EventMask", mask))
            .await
    }
}

#[cfg(test)]
mod tests {
    use crate::testing::{ScriptedTransport, ajax_response};
    use crate::Session;

    #[tokio::test]
    async fn test_login_sends_credentials() {
        let transport = ScriptedTransport::new();
        transport.push_body(ajax_response(&[&[("response", "Success")]]));
        let session = Session::builder("http://pbx.test/mxml")
            .transport(transport.clone())
            .build()
            .unwrap();

        assert!(session.login_with("admin", "p@ss word").await.unwrap());

        let url = &transport.requests()[0].url;
        assert_eq!(
            url.query(),
            Some("Action=Login&Username=admin&Secret=p%40ss+word")
        );
    }

    #[tokio::test]
    async fn test_challenge_returns_success_record() {
        let transport = ScriptedTransport::new();
        transport.push_body(ajax_response(&[&[
            ("response", "Success"),
            ("challenge", "840415273"),
        ]]));
        let session = Session::builder("http://pbx.test/mxml")
            .transport(transport.clone())
            .build()
            .unwrap();

        let record = session.challenge().await.unwrap().unwrap();
        assert_eq!(record.get("challenge"), Some("840415273"));
        assert_eq!(
            transport.requests()[0].url.query(),
            Some("Action=Challenge&AuthType=MD5")
        );
    }
}
