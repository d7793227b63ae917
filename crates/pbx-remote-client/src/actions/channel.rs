//! Channels, calls and transfers.

use pbx_remote_core::Event;

use crate::action::Action;
use crate::error::SessionError;
use crate::session::Session;

/// Default originate timeout in milliseconds.
pub const DEFAULT_ORIGINATE_TIMEOUT_MS: u64 = 30_000;

/// Parameters of an `Originate` action.
///
/// The call is sent either to a dialplan location (`context`, `exten` and
/// `priority`, all three or none) or to an application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginateRequest {
    pub channel: String,
    pub context: Option<String>,
    pub exten: Option<String>,
    pub priority: Option<String>,
    pub application: Option<String>,
    pub data: Option<String>,
    pub timeout_ms: Option<u64>,
    pub caller_id: Option<String>,
    pub variable: Option<String>,
    pub account: Option<String>,
    pub run_async: bool,
    pub codecs: Option<String>,
}

impl OriginateRequest {
    /// Originate on `channel` with the default timeout, asynchronously.
    #[must_use]
    pub fn new(channel: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            context: None,
            exten: None,
            priority: None,
            application: None,
            data: None,
            timeout_ms: Some(DEFAULT_ORIGINATE_TIMEOUT_MS),
            caller_id: None,
            variable: None,
            account: None,
            run_async: true,
            codecs: None,
        }
    }

    /// Connect to a dialplan location.
    #[must_use]
    pub fn extension(
        mut self,
        context: impl Into<String>,
        exten: impl Into<String>,
        priority: impl ToString,
    ) -> Self {
        self.context = Some(context.into());
        self.exten = Some(exten.into());
        self.priority = Some(priority.to_string());
        self
    }

    /// Connect to an application.
    #[must_use]
    pub fn application(mut self, application: impl Into<String>, data: Option<String>) -> Self {
        self.application = Some(application.into());
        self.data = data;
        self
    }

    #[must_use]
    pub fn caller_id(mut self, caller_id: impl Into<String>) -> Self {
        self.caller_id = Some(caller_id.into());
        self
    }

    #[must_use]
    pub const fn timeout_ms(mut self, timeout_ms: Option<u64>) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    #[must_use]
    pub const fn run_async(mut self, run_async: bool) -> Self {
        self.run_async = run_async;
        self
    }

    /// Check the argument combination.
    ///
    /// # Errors
    /// Returns error if the dialplan location is partial or `data` is given
    /// without an application.
    pub fn validate(&self) -> Result<(), SessionError> {
        let location = [&self.context, &self.exten, &self.priority];
        let given = location.iter().filter(|v| v.is_some()).count();
        if given != 0 && given != location.len() {
            return Err(SessionError::InvalidArgument(
                "context, exten and priority must be given together".to_string(),
            ));
        }
        if self.data.is_some() && self.application.is_none() {
            return Err(SessionError::InvalidArgument(
                "data requires an application".to_string(),
            ));
        }
        Ok(())
    }

    fn to_action(&self) -> Action {
        Action::new("Originate")
            .param("Channel", &self.channel)
            .param_opt("Exten", self.exten.as_ref())
            .param_opt("Context", self.context.as_ref())
            .param_opt("Priority", self.priority.as_ref())
            .param_opt("Application", self.application.as_ref())
            .param_opt("Data", self.data.as_ref())
            .param_opt("Timeout", self.timeout_ms.filter(|t| *t > 0))
            .param_opt("CallerID", self.caller_id.as_ref())
            .param_opt("Variable", self.variable.as_ref())
            .param_opt("Account", self.account.as_ref())
            .param("Async", self.run_async)
            .param_opt("Codecs", self.codecs.as_ref())
    }
}

impl Session {
    /// Send a DTMF digit on a channel.
    ///
    /// # Errors
    /// Returns error only if an event filter fails.
    pub async fn play_dtmf(&self, channel: &str, digit: &str) -> Result<bool, SessionError> {
        self.acknowledge(
            Action::new("PlayDTMF")
                .param("Channel", channel)
                .param("Digit", digit),
        )
        .await
    }

    /// Hang up a channel.
    ///
    /// # Errors
    /// Returns error only if an event filter fails.
    pub async fn hangup(&self, channel: &str) -> Result<bool, SessionError> {
        self.acknowledge(Action::new("Hangup").param("Channel", channel))
            .await
    }

    /// Originate a call.
    ///
    /// # Errors
    /// Returns [`SessionError::InvalidArgument`] before sending anything if
    /// the request is inconsistent.
    pub async fn originate(&self, request: &OriginateRequest) -> Result<bool, SessionError> {
        request.validate()?;
        self.acknowledge(request.to_action()).await
    }

    /// Attended transfer of `channel` to a dialplan location.
    ///
    /// # Errors
    /// Returns error only if an event filter fails.
    pub async fn attended_transfer(
        &self,
        channel: &str,
        exten: &str,
        context: &str,
        priority: &str,
    ) -> Result<bool, SessionError> {
        self.acknowledge(
            Action::new("Atxfer")
                .param("Channel", channel)
                .param("Exten", exten)
                .param("Context", context)
                .param("Priority", priority),
        )
        .await
    }

    /// Redirect a channel, and optionally its other leg, to a dialplan
    /// location.
    ///
    /// # Errors
    /// Returns error only if an event filter fails.
    pub async fn redirect(
        &self,
        channel: &str,
        exten: &str,
        context: &str,
        priority: &str,
        extra_channel: Option<&str>,
    ) -> Result<bool, SessionError> {
        self.acknowledge(
            Action::new("Redirect")
                .param("Channel", channel)
                .param("Exten", exten)
                .param("Context", context)
                .param("Priority", priority)
                .param_opt("ExtraChannel", extra_channel),
        )
        .await
    }

    /// Same as [`Session::redirect`].
    ///
    /// # Errors
    /// Returns error only if an event filter fails.
    pub async fn transfer(
        &self,
        channel: &str,
        exten: &str,
        context: &str,
        priority: &str,
        extra_channel: Option<&str>,
    ) -> Result<bool, SessionError> {
        self.redirect(channel, exten, context, priority, extra_channel)
            .await
    }

    /// Bridge two channels, optionally playing a tone to the second.
    ///
    /// # Errors
    /// Returns error only if an event filter fails.
    pub async fn bridge(
        &self,
        channel1: &str,
        channel2: &str,
        tone: bool,
    ) -> Result<bool, SessionError> {
        let action = Action::new("Bridge")
            .param("Channel1", channel1)
            .param("Channel2", channel2);
        let action = if tone { action.param("Tone", "yes") } else { action };
        self.acknowledge(action).await
    }

    /// Park `channel`, announcing the parking space to `announce_channel`.
    ///
    /// # Errors
    /// Returns error only if an event filter fails.
    pub async fn park(
        &self,
        channel: &str,
        announce_channel: &str,
        timeout_ms: Option<u64>,
    ) -> Result<bool, SessionError> {
        self.acknowledge(
            Action::new("Park")
                .param("Channel", channel)
                .param("Channel2", announce_channel)
                .param_opt("Timeout", timeout_ms),
        )
        .await
    }

    /// Parked calls.
    ///
    /// # Errors
    /// Returns error only if an event filter fails.
    pub async fn parked_calls(&self) -> Result<Option<Vec<Event>>, SessionError> {
        self.list(Action::new("ParkedCalls")).await
    }

    /// Channel status, for one channel or all of them.
    ///
    /// # Errors
    /// Returns error only if an event filter fails.
    pub async fn status(
        &self,
        channel: Option<&str>,
        variables: Option<&str>,
    ) -> Result<Option<Vec<Event>>, SessionError> {
        self.list(
            Action::new("Status")
                .param_opt("Channel", channel)
                .param_opt("Variables", variables),
        )
        .await
    }

    /// Read a channel or global variable. The value is carried by the
    /// success record.
    ///
    /// # Errors
    /// Returns error only if an event filter fails.
    pub async fn get_var(
        &self,
        variable: &str,
        channel: Option<&str>,
    ) -> Result<Option<Event>, SessionError> {
        self.single(
            Action::new("GetVar")
                .param("Variable", variable)
                .param_opt("Channel", channel),
        )
        .await
    }

    /// Set a channel or global variable.
    ///
    /// # Errors
    /// Returns error only if an event filter fails.
    pub async fn set_var(
        &self,
        variable: &str,
        value: &str,
        channel: Option<&str>,
    ) -> Result<bool, SessionError> {
        self.acknowledge(
            Action::new("Setvar")
                .param("Variable", variable)
                .param("Value", value)
                .param_opt("Channel", channel),
        )
        .await
    }

    /// Send a text message on a channel.
    ///
    /// # Errors
    /// Returns error only if an event filter fails.
    pub async fn send_text(&self, channel: &str, message: &str) -> Result<bool, SessionError> {
        self.acknowledge(
            Action::new("SendText")
                .param("Channel", channel)
                .param("Message", message),
        )
        .await
    }

    /// Hang up a channel after `timeout_secs` seconds.
    ///
    /// # Errors
    /// Returns error only if an event filter fails.
    pub async fn absolute_timeout(&self, channel: &str, timeout_secs: u64) -> Result<bool, SessionError> {
        self.acknowledge(
            Action::new("AbsoluteTimeout")
                .param("Channel", channel)
                .param("Timeout", timeout_secs),
        )
        .await
    }

    /// Run an AGI command on a channel running `AsyncAGI`.
    ///
    /// # Errors
    /// Returns error only if an event filter fails.
    pub async fn agi(
        &self,
        channel: &str,
        command: &str,
        command_id: Option<&str>,
    ) -> Result<bool, SessionError> {
        self.acknowledge(
            Action::new("AGI")
                .param("Channel", channel)
                .param("Command", command)
                .param_opt("CommandID", command_id),
        )
        .await
    }

    /// Emit a user-defined event.
    ///
    /// # Errors
    /// Returns error only if an event filter fails.
    pub async fn user_event(&self, name: &str) -> Result<bool, SessionError> {
        self.acknowledge(Action::new("UserEvent").param("UserEvent", name))
            .await
    }

    /// Device state of an extension.
    ///
    /// # Errors
    /// Returns error only if an event filter fails.
    pub async fn extension_state(
        &self,
        exten: &str,
        context: &str,
    ) -> Result<Option<Vec<Event>>, SessionError> {
        self.list(
            Action::new("ExtensionState")
                .param("Exten", exten)
                .param("Context", context),
        )
        .await
    }

    /// Active channels.
    ///
    /// # Errors
    /// Returns error only if an event filter fails.
    pub async fn active_channels(&self) -> Result<Option<Vec<Event>>, SessionError> {
        self.list(Action::new("CoreShowChannels")).await
    }
}
