//! Manager session: request building, affinity and response handling.

use std::{sync::Arc, time::Duration};

use parking_lot::RwLock;
use pbx_remote_core::{
    Arguments, DebugListener, DebugRegistry, DebugTrace, Event, EventFilter, EventListener,
    ListenerRegistry, PbxConfig,
};
use tokio::sync::Mutex;
use tracing::{debug, warn};
use url::Url;

use crate::action::{Action, build_target};
use crate::error::SessionError;
use crate::response::{MESSAGE_KEY, RESPONSE_KEY, parse_records};
use crate::transport::{ReqwestTransport, Transport, affinity_token_from};

/// Message of the synthetic event produced when the switch cannot be reached.
pub const UNREACHABLE_MESSAGE: &str = "Unable to connect to remote server";

const SUCCESS: &str = "Success";
const ERROR: &str = "Error";
const GOODBYE: &str = "Goodbye";

/// Outcome of one action.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionResponse {
    /// Whether the switch reported the action's terminal success value.
    pub success: bool,
    /// Records carrying an `event` attribute, in document order. Only
    /// populated on success, or with the synthetic error event when the
    /// switch could not be reached.
    pub events: Vec<Event>,
    /// Every record of the response, in document order.
    pub records: Vec<Event>,
}

impl ActionResponse {
    fn unreachable() -> Self {
        let event: Event = [(RESPONSE_KEY, ERROR), (MESSAGE_KEY, UNREACHABLE_MESSAGE)]
            .into_iter()
            .collect();
        Self {
            success: false,
            events: vec![event.clone()],
            records: vec![event],
        }
    }

    /// Events on success, `None` otherwise.
    #[must_use]
    pub fn into_events(self) -> Option<Vec<Event>> {
        self.success.then_some(self.events)
    }
}

#[derive(Default)]
struct Credentials {
    username: Option<String>,
    secret: Option<String>,
}

#[derive(Default)]
struct State {
    affinity_token: Option<String>,
    last_error: Option<String>,
}

/// One logical manager connection.
///
/// Requests on a session are serialised: the affinity token learned from
/// the first response is attached to every later request.
pub struct Session {
    endpoint: Url,
    credentials: RwLock<Credentials>,
    state: RwLock<State>,
    listeners: RwLock<ListenerRegistry>,
    debug_listeners: RwLock<DebugRegistry>,
    transport: Arc<dyn Transport>,
    gate: Mutex<()>,
}

impl Session {
    /// Start building a session for the given endpoint.
    #[must_use]
    pub fn builder<S: Into<String>>(endpoint: S) -> SessionBuilder {
        SessionBuilder::new(endpoint)
    }

    /// Build a session from configuration, using the `reqwest` transport.
    ///
    /// # Errors
    /// Returns error if the endpoint is invalid or the HTTP client cannot be
    /// built.
    pub fn from_config(config: &PbxConfig) -> Result<Self, SessionError> {
        let mut builder = Self::builder(config.endpoint.as_str())
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .user_agent(config.user_agent.as_str());
        if let (Some(username), Some(secret)) = (&config.username, &config.secret) {
            builder = builder.credentials(username.as_str(), secret.as_str());
        }
        builder.build()
    }

    /// The manager endpoint.
    #[must_use]
    pub const fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Replace the login credentials.
    pub fn set_credentials(&self, username: impl Into<String>, secret: impl Into<String>) {
        let mut credentials = self.credentials.write();
        credentials.username = Some(username.into());
        credentials.secret = Some(secret.into());
    }

    pub(crate) fn login_parameters(&self) -> Result<(String, String), SessionError> {
        let credentials = self.credentials.read();
        match (&credentials.username, &credentials.secret) {
            (Some(username), Some(secret)) if !username.is_empty() => {
                Ok((username.clone(), secret.clone()))
            }
            _ => Err(SessionError::MissingCredentials),
        }
    }

    /// Message of the most recent failed action.
    ///
    /// Cleared by every successful action.
    #[must_use]
    pub fn last_error(&self) -> Option<String> {
        self.state.read().last_error.clone()
    }

    /// Current affinity token.
    #[must_use]
    pub fn affinity_token(&self) -> Option<String> {
        self.state.read().affinity_token.clone()
    }

    /// Set or clear the affinity token.
    ///
    /// A cleared token is learned again from the next response that sets one.
    pub fn set_affinity_token(&self, token: Option<String>) {
        self.state.write().affinity_token = token;
    }

    /// Forget the affinity token.
    pub fn clear_affinity_token(&self) {
        self.set_affinity_token(None);
    }

    /// Register an event listener that receives every event.
    ///
    /// Returns `false` if the name is already taken.
    pub fn add_event_listener(
        &self,
        name: impl Into<String>,
        listener: Arc<dyn EventListener>,
    ) -> bool {
        self.listeners.write().register(name, listener)
    }

    /// Register an event listener behind a filter.
    ///
    /// Returns `false` if the name is already taken.
    pub fn add_filtered_event_listener(
        &self,
        name: impl Into<String>,
        listener: Arc<dyn EventListener>,
        filter: Arc<dyn EventFilter>,
    ) -> bool {
        self.listeners
            .write()
            .register_filtered(name, listener, filter)
    }

    /// Remove an event listener.
    pub fn remove_event_listener(&self, name: &str) -> bool {
        self.listeners.write().unregister(name)
    }

    /// Register a debug listener.
    ///
    /// Returns `false` if the name is already taken.
    pub fn add_debug_listener(
        &self,
        name: impl Into<String>,
        listener: Arc<dyn DebugListener>,
    ) -> bool {
        self.debug_listeners.write().register(name, listener)
    }

    /// Remove a debug listener.
    pub fn remove_debug_listener(&self, name: &str) -> bool {
        self.debug_listeners.write().unregister(name)
    }

    /// Send an action and interpret the response.
    ///
    /// Transport failures and malformed bodies are not errors: they produce
    /// a single synthetic `Error` event with `success == false`. Debug
    /// listeners see every exchange.
    ///
    /// # Errors
    /// Returns error only if an event filter fails.
    pub async fn invoke(
        &self,
        action: &str,
        parameters: &Arguments,
    ) -> Result<ActionResponse, SessionError> {
        let _gate = self.gate.lock().await;

        let target = build_target(&self.endpoint, action, parameters);
        let token = self.affinity_token();
        debug!(action, url = %target, has_cookie = token.is_some(), "Invoking action");

        let (body, parsed) = match self.transport.get(&target, token.as_deref()).await {
            Ok(response) => {
                let parsed = parse_records(&response.body).map_err(|e| e.to_string());
                if parsed.is_ok() {
                    self.learn_affinity_token(response.set_cookie.as_deref());
                }
                (response.body, parsed)
            }
            Err(e) => (String::new(), Err(e.to_string())),
        };

        let result = match parsed {
            Ok(records) => self.interpret(action, records),
            Err(reason) => {
                warn!(action, %reason, "Switch unreachable or response malformed");
                self.state.write().last_error = Some(UNREACHABLE_MESSAGE.to_string());
                Ok(ActionResponse::unreachable())
            }
        };

        let debug_listeners = self.debug_listeners.read().clone();
        debug_listeners.notify(&DebugTrace {
            url: target.to_string(),
            parameters: parameters.clone(),
            response: body,
            affinity_token: self.affinity_token(),
        });

        result
    }

    /// Send a built [`Action`].
    ///
    /// # Errors
    /// Returns error only if an event filter fails.
    pub async fn send(&self, action: &Action) -> Result<ActionResponse, SessionError> {
        self.invoke(action.name(), action.params()).await
    }

    fn learn_affinity_token(&self, set_cookie: Option<&str>) {
        let mut state = self.state.write();
        if state.affinity_token.is_some() {
            return;
        }
        if let Some(token) = set_cookie.and_then(affinity_token_from) {
            debug!("Learned session affinity token");
            state.affinity_token = Some(token);
        }
    }

    fn interpret(&self, action: &str, records: Vec<Event>) -> Result<ActionResponse, SessionError> {
        let terminal = if action.eq_ignore_ascii_case("logoff") {
            GOODBYE
        } else {
            SUCCESS
        };
        let success = records
            .iter()
            .any(|r| r.get(RESPONSE_KEY) == Some(terminal));

        if !success {
            let message = records
                .iter()
                .find(|r| r.get(RESPONSE_KEY) == Some(ERROR))
                .and_then(|r| r.get(MESSAGE_KEY))
                .map(str::to_string);
            warn!(action, message = message.as_deref().unwrap_or(""), "Action failed");
            self.state.write().last_error = message;
            return Ok(ActionResponse {
                success: false,
                events: Vec::new(),
                records,
            });
        }

        self.state.write().last_error = None;

        let events: Vec<Event> = records
            .iter()
            .filter(|r| r.contains(pbx_remote_core::event::EVENT_TYPE_KEY))
            .cloned()
            .collect();
        self.dispatch(&events)?;

        Ok(ActionResponse {
            success: true,
            events,
            records,
        })
    }

    pub(crate) fn dispatch(&self, events: &[Event]) -> Result<(), SessionError> {
        for event in events {
            // Listeners may edit the registry from `notify`.
            let listeners = self.listeners.read().clone();
            listeners.dispatch(event)?;
        }
        Ok(())
    }

    /// Send an action whose result is a plain acknowledgement.
    pub(crate) async fn acknowledge(&self, action: Action) -> Result<bool, SessionError> {
        Ok(self.send(&action).await?.success)
    }

    /// Send an action whose result is a list of events.
    pub(crate) async fn list(&self, action: Action) -> Result<Option<Vec<Event>>, SessionError> {
        Ok(self.send(&action).await?.into_events())
    }

    /// Send an action whose result is carried by the success record itself.
    pub(crate) async fn single(&self, action: Action) -> Result<Option<Event>, SessionError> {
        let response = self.send(&action).await?;
        if !response.success {
            return Ok(None);
        }
        let records: Vec<Event> = response
            .records
            .into_iter()
            .filter(|r| r.get(RESPONSE_KEY) == Some(SUCCESS))
            .collect();
        self.dispatch(&records)?;
        Ok(records.into_iter().next())
    }
}

/// Builder for [`Session`].
pub struct SessionBuilder {
    endpoint: String,
    username: Option<String>,
    secret: Option<String>,
    timeout: Duration,
    user_agent: String,
    transport: Option<Arc<dyn Transport>>,
}

impl SessionBuilder {
    /// Create a builder for the given endpoint.
    #[must_use]
    pub fn new<S: Into<String>>(endpoint: S) -> Self {
        let defaults = PbxConfig::default();
        Self {
            endpoint: endpoint.into(),
            username: None,
            secret: None,
            timeout: Duration::from_millis(defaults.request_timeout_ms),
            user_agent: defaults.user_agent,
            transport: None,
        }
    }

    /// Set login credentials.
    #[must_use]
    pub fn credentials<U: Into<String>, S: Into<String>>(mut self, username: U, secret: S) -> Self {
        self.username = Some(username.into());
        self.secret = Some(secret.into());
        self
    }

    /// Set the request timeout of the default transport.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the user agent of the default transport.
    #[must_use]
    pub fn user_agent<S: Into<String>>(mut self, user_agent: S) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Use a custom transport instead of `reqwest`.
    #[must_use]
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Build the session.
    ///
    /// # Errors
    /// Returns error if the endpoint is not an absolute HTTP(S) URL or the
    /// default transport cannot be built.
    pub fn build(self) -> Result<Session, SessionError> {
        let endpoint = Url::parse(&self.endpoint).map_err(|e| SessionError::InvalidEndpoint {
            endpoint: self.endpoint.clone(),
            reason: e.to_string(),
        })?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(SessionError::InvalidEndpoint {
                endpoint: self.endpoint,
                reason: "scheme must be http or https".to_string(),
            });
        }

        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new(self.timeout, &self.user_agent)?),
        };

        Ok(Session {
            endpoint,
            credentials: RwLock::new(Credentials {
                username: self.username,
                secret: self.secret,
            }),
            state: RwLock::new(State::default()),
            listeners: RwLock::new(ListenerRegistry::new()),
            debug_listeners: RwLock::new(DebugRegistry::new()),
            transport,
            gate: Mutex::new(()),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use pbx_remote_core::{EventTypeFilter, TraceLog};

    use super::*;
    use crate::testing::{ScriptedTransport, ajax_response};

    fn session_with(transport: &Arc<ScriptedTransport>) -> Session {
        Session::builder("http://pbx.test:8088/mxml")
            .credentials("manager", "secret")
            .transport(transport.clone())
            .build()
            .unwrap()
    }

    fn params(pairs: &[(&str, &str)]) -> Arguments {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[tokio::test]
    async fn test_login_failure_sets_last_error() {
        let transport = ScriptedTransport::new();
        transport.push_body(ajax_response(&[&[
            ("response", "Error"),
            ("message", "Authentication failed"),
        ]]));
        let session = session_with(&transport);

        let response = session
            .invoke("login", &params(&[("Username", "manager"), ("Secret", "bad")]))
            .await
            .unwrap();

        assert!(!response.success);
        assert_eq!(session.last_error().as_deref(), Some("Authentication failed"));
    }

    #[tokio::test]
    async fn test_affinity_token_learned_once_and_echoed() {
        let transport = ScriptedTransport::new();
        transport.push_body_with_cookie(
            ajax_response(&[&[("response", "Success"), ("message", "Authentication accepted")]]),
            "mansession_id=\"6b2b7ce4\"; Version=1; Max-Age=60",
        );
        transport.push_body_with_cookie(
            ajax_response(&[&[("response", "Success"), ("ping", "Pong")]]),
            "mansession_id=\"ffffffff\"; Version=1",
        );
        transport.push_body(ajax_response(&[&[("response", "Success")]]));
        let session = session_with(&transport);

        assert!(session.login().await.unwrap());
        let token = session.affinity_token().unwrap();
        assert_eq!(token, "mansession_id=\"6b2b7ce4\"");

        assert!(session.ping().await.unwrap());
        assert!(session.ping().await.unwrap());
        assert_eq!(session.affinity_token().as_deref(), Some(token.as_str()));

        let requests = transport.requests();
        assert_eq!(requests[0].cookie, None);
        assert_eq!(requests[1].cookie.as_deref(), Some(token.as_str()));
        assert_eq!(requests[2].cookie.as_deref(), Some(token.as_str()));
    }

    #[tokio::test]
    async fn test_transport_failure_yields_synthetic_event() {
        let transport = ScriptedTransport::new();
        transport.push_failure("connection refused");
        let session = session_with(&transport);

        let response = session.invoke("Ping", &Arguments::new()).await.unwrap();

        assert!(!response.success);
        assert_eq!(response.events.len(), 1);
        assert_eq!(response.events[0].get("response"), Some("Error"));
        assert_eq!(response.events[0].get("message"), Some(UNREACHABLE_MESSAGE));
        assert_eq!(session.last_error().as_deref(), Some(UNREACHABLE_MESSAGE));
        assert_eq!(session.affinity_token(), None);
    }

    #[tokio::test]
    async fn test_malformed_body_does_not_learn_token() {
        let transport = ScriptedTransport::new();
        transport.push_body_with_cookie("<html>oops</html>".to_string(), "mansession_id=x");
        let session = session_with(&transport);

        let response = session.invoke("Ping", &Arguments::new()).await.unwrap();
        assert!(!response.success);
        assert_eq!(session.affinity_token(), None);
    }

    #[tokio::test]
    async fn test_success_returns_events_in_order_and_notifies() {
        let transport = ScriptedTransport::new();
        transport.push_body(ajax_response(&[
            &[("response", "Success"), ("message", "Queue status will follow")],
            &[("event", "QueueParams"), ("queue", "support")],
            &[("event", "QueueMember"), ("name", "SIP/1001")],
            &[("event", "QueueStatusComplete")],
        ]));
        let session = session_with(&transport);
        let members = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&members);
        session.add_filtered_event_listener(
            "members",
            Arc::new(move |_: &Event| {
                seen.fetch_add(1, Ordering::SeqCst);
            }),
            Arc::new(EventTypeFilter::new(["QueueMember"])),
        );

        let events = session.queue_status(None, None).await.unwrap().unwrap();

        let types: Vec<_> = events.iter().map(Event::event_type).collect();
        assert_eq!(types, vec!["QueueParams", "QueueMember", "QueueStatusComplete"]);
        assert_eq!(members.load(Ordering::SeqCst), 1);
        assert_eq!(session.last_error(), None);
    }

    #[tokio::test]
    async fn test_success_clears_previous_error() {
        let transport = ScriptedTransport::new();
        transport.push_body(ajax_response(&[&[("response", "Error"), ("message", "Permission denied")]]));
        transport.push_body(ajax_response(&[&[("response", "Success")]]));
        let session = session_with(&transport);

        assert!(!session.reload(None).await.unwrap());
        assert_eq!(session.last_error().as_deref(), Some("Permission denied"));
        assert!(session.reload(None).await.unwrap());
        assert_eq!(session.last_error(), None);
    }

    #[tokio::test]
    async fn test_logoff_expects_goodbye() {
        let transport = ScriptedTransport::new();
        transport.push_body(ajax_response(&[&[("response", "Success")]]));
        transport.push_body(ajax_response(&[&[
            ("response", "Goodbye"),
            ("message", "Thanks for all the fish."),
        ]]));
        let session = session_with(&transport);

        assert!(!session.logoff().await.unwrap());
        assert!(session.logoff().await.unwrap());
    }

    #[tokio::test]
    async fn test_debug_listeners_see_every_exchange() {
        let transport = ScriptedTransport::new();
        transport.push_body_with_cookie(
            ajax_response(&[&[("response", "Success")]]),
            "mansession_id=abc; Path=/",
        );
        transport.push_failure("timed out");
        let session = session_with(&transport);
        let log = Arc::new(TraceLog::new());
        assert!(session.add_debug_listener("log", log.clone()));

        session
            .invoke("Hangup", &params(&[("Channel", "SIP/1001-00000001")]))
            .await
            .unwrap();
        session.invoke("Ping", &Arguments::new()).await.unwrap();

        let history = log.history();
        assert_eq!(history.len(), 2);
        assert_eq!(
            history[0].url,
            "http://pbx.test:8088/mxml?Action=Hangup&Channel=SIP%2F1001-00000001"
        );
        assert_eq!(history[0].parameters.get("Channel").map(String::as_str), Some("SIP/1001-00000001"));
        assert!(history[0].response.contains("Success"));
        assert_eq!(history[0].affinity_token.as_deref(), Some("mansession_id=abc"));
        assert_eq!(history[1].response, "");
        assert_eq!(history[1].affinity_token.as_deref(), Some("mansession_id=abc"));
    }

    #[tokio::test]
    async fn test_filter_error_is_propagated_after_debug_trace() {
        struct Failing;
        impl EventFilter for Failing {
            fn filter(&self, _event_type: &str) -> Result<bool, String> {
                Err("nope".to_string())
            }
        }

        let transport = ScriptedTransport::new();
        transport.push_body(ajax_response(&[
            &[("response", "Success")],
            &[("event", "Agents"), ("agent", "1001")],
        ]));
        let session = session_with(&transport);
        let log = Arc::new(TraceLog::new());
        session.add_debug_listener("log", log.clone());
        session.add_filtered_event_listener("bad", Arc::new(|_: &Event| {}), Arc::new(Failing));

        let result = session.agents().await;

        assert!(matches!(result, Err(SessionError::Listener(_))));
        assert_eq!(log.len(), 1);
    }

    #[tokio::test]
    async fn test_login_requires_credentials() {
        let transport = ScriptedTransport::new();
        let session = Session::builder("http://pbx.test/mxml")
            .transport(transport.clone())
            .build()
            .unwrap();

        assert!(matches!(session.login().await, Err(SessionError::MissingCredentials)));
        assert!(transport.requests().is_empty());
    }

    struct OneShot {
        session: std::sync::Weak<Session>,
        seen: AtomicUsize,
    }

    impl EventListener for OneShot {
        fn notify(&self, _event: &Event) {
            self.seen.fetch_add(1, Ordering::SeqCst);
            if let Some(session) = self.session.upgrade() {
                session.remove_event_listener("one-shot");
                session.add_debug_listener("late", Arc::new(pbx_remote_core::TracingDebugListener));
            }
        }
    }

    #[tokio::test]
    async fn test_listener_can_edit_registries_from_notify() {
        let transport = ScriptedTransport::new();
        transport.push_body(ajax_response(&[
            &[("response", "Success"), ("message", "Agents will follow")],
            &[("event", "Agents"), ("agent", "1001")],
            &[("event", "Agents"), ("agent", "1002")],
        ]));
        let session = Arc::new(session_with(&transport));
        let listener = Arc::new(OneShot {
            session: Arc::downgrade(&session),
            seen: AtomicUsize::new(0),
        });
        assert!(session.add_event_listener("one-shot", listener.clone()));

        let events = session.agents().await.unwrap().unwrap();

        assert_eq!(events.len(), 2);
        assert_eq!(listener.seen.load(Ordering::SeqCst), 1);
        assert!(!session.remove_event_listener("one-shot"));
        assert!(!session.add_debug_listener("late", Arc::new(pbx_remote_core::TracingDebugListener)));
    }

    #[test]
    fn test_builder_rejects_bad_endpoint() {
        assert!(matches!(
            Session::builder("not a url").build(),
            Err(SessionError::InvalidEndpoint { .. })
        ));
        assert!(matches!(
            Session::builder("ftp://pbx/mxml").build(),
            Err(SessionError::InvalidEndpoint { .. })
        ));
    }

    #[tokio::test]
    async fn test_set_affinity_token_is_sent_verbatim() {
        let transport = ScriptedTransport::new();
        transport.push_body(ajax_response(&[&[("response", "Success")]]));
        let session = session_with(&transport);
        session.set_affinity_token(Some("mansession_id=restored".to_string()));

        session.ping().await.unwrap();

        assert_eq!(
            transport.requests()[0].cookie.as_deref(),
            Some("mansession_id=restored")
        );
    }
}
