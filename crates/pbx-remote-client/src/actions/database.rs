//! Switch key/value database.

use pbx_remote_core::Event;

use crate::action::Action;
use crate::error::SessionError;
use crate::session::Session;

impl Session {
    /// Read a key. The value arrives as a `DBGetResponse` event.
    ///
    /// # Errors
    /// Returns error only if an event filter fails.
    pub async fn db_get(&self, family: &str, key: &str) -> Result<Option<Vec<Event>>, SessionError> {
        self.list(
            Action::new("DBGet")
                .param("Family", family)
                .param("Key", key),
        )
        .await
    }

    /// Write a key. `Val` is omitted when `value` is `None`.
    ///
    /// # Errors
    /// Returns error only if an event filter fails.
    pub async fn db_put(
        &self,
        family: &str,
        key: &str,
        value: Option<&str>,
    ) -> Result<bool, SessionError> {
        self.acknowledge(
            Action::new("DBPut")
                .param("Family", family)
                .param("Key", key)
                .param_opt("Val", value),
        )
        .await
    }

    /// # Errors
    /// Returns error only if an event filter fails.
    pub async fn db_del(&self, family: &str, key: &str) -> Result<bool, SessionError> {
        self.acknowledge(
            Action::new("DBDel")
                .param("Family", family)
                .param("Key", key),
        )
        .await
    }

    /// Delete a family, or a key subtree within it.
    ///
    /// # Errors
    /// Returns error only if an event filter fails.
    pub async fn db_del_tree(&self, family: &str, key: Option<&str>) -> Result<bool, SessionError> {
        self.acknowledge(
            Action::new("DBDelTree")
                .param("Family", family)
                .param_opt("Key", key),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use crate::testing::{ScriptedTransport, ajax_response};
    use crate::Session;

    #[tokio::test]
    async fn test_db_get_returns_response_event() {
        let transport = ScriptedTransport::new();
        transport.push_body(ajax_response(&[
            &[("response", "Success"), ("message", "Result will follow")],
            &[("event", "DBGetResponse"), ("family", "cidname"), ("key", "1001"), ("val", "Alice")],
        ]));
        transport.push_body(ajax_response(&[&[("response", "Success")]]));
        let session = Session::builder("http://pbx.test/mxml")
            .transport(transport.clone())
            .build()
            .unwrap();

        let events = session.db_get("cidname", "1001").await.unwrap().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].get("val"), Some("Alice"));

        assert!(session.db_put("cidname", "1002", None).await.unwrap());
        assert_eq!(
            transport.requests()[1].url.query(),
            Some("Action=DBPut&Family=cidname&Key=1002")
        );
    }
}
