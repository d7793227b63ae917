//! Registry of queueable commands.
//!
//! Every entry maps a command name to a typed handler that calls the
//! matching [`Session`] operation. Stored arguments are bound to the
//! handler's declared parameters by position.

use std::collections::HashMap;

use futures::future::BoxFuture;
use pbx_remote_client::{ModuleLoadType, OriginateRequest, Session, SessionError};
use pbx_remote_core::{Arguments, Event, QueueResponse};

/// How a stored value is read by the handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Text,
    U32,
    U64,
    Flag,
}

/// Binding rule of a declared parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamRule {
    pub required: bool,
    pub kind: ParamKind,
}

/// Declared parameter: name and binding rule.
pub type Param = (&'static str, ParamRule);

/// Check across several parameters, run before a command is stored.
pub type Check = fn(&BoundArgs<'_>) -> Result<(), SessionError>;

/// Future returned by a command handler.
///
/// Resolves to `None` when the operation reported the boolean failure value.
pub type HandlerFuture<'a> = BoxFuture<'a, Result<Option<QueueResponse>, SessionError>>;

/// Typed command handler.
pub type Handler = for<'a> fn(&'a Session, BoundArgs<'a>) -> HandlerFuture<'a>;

/// One queueable command.
#[derive(Clone, Copy)]
pub struct CommandSpec {
    /// Operation name, e.g. `queue_status`.
    pub name: &'static str,
    /// Manager action sent by the operation, e.g. `QueueStatus`.
    pub action: &'static str,
    /// Parameters in positional order.
    pub params: &'static [Param],
    pub handler: Handler,
    pub check: Option<Check>,
}

impl std::fmt::Debug for CommandSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandSpec")
            .field("name", &self.name)
            .field("action", &self.action)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

impl CommandSpec {
    /// Check that `count` arguments can be bound to the parameters.
    ///
    /// # Errors
    /// Returns a description of the mismatch.
    pub fn check_arity(&self, count: usize) -> Result<(), String> {
        if count > self.params.len() {
            return Err(format!(
                "takes at most {} arguments, got {count}",
                self.params.len()
            ));
        }
        if let Some((name, _)) = self.params[count..].iter().find(|(_, rule)| rule.required) {
            return Err(format!("missing required argument '{name}'"));
        }
        Ok(())
    }

    /// Bind `arguments` and check every value the handler will read.
    ///
    /// # Errors
    /// Returns a description of the first rejected argument.
    pub fn validate(&self, arguments: &Arguments) -> Result<(), String> {
        self.check_arity(arguments.len())?;
        let bound = BoundArgs::new(self, arguments);
        self.params
            .iter()
            .enumerate()
            .try_for_each(|(index, (_, rule))| bound.check(index, *rule))
            .and_then(|()| self.check.map_or(Ok(()), |check| check(&bound)))
            .map_err(|e| match e {
                SessionError::InvalidArgument(reason) => reason,
                other => other.to_string(),
            })
    }
}

/// Stored arguments bound positionally to a command's parameters.
///
/// Empty values count as absent.
pub struct BoundArgs<'a> {
    spec: &'a CommandSpec,
    values: Vec<&'a str>,
}

impl<'a> BoundArgs<'a> {
    #[must_use]
    pub fn new(spec: &'a CommandSpec, arguments: &'a Arguments) -> Self {
        Self {
            spec,
            values: arguments.values().map(String::as_str).collect(),
        }
    }

    fn name(&self, index: usize) -> &'static str {
        self.spec.params.get(index).map_or("?", |(name, _)| name)
    }

    fn invalid(&self, index: usize, reason: &str) -> SessionError {
        SessionError::InvalidArgument(format!(
            "{}: argument '{}' {reason}",
            self.spec.name,
            self.name(index)
        ))
    }

    fn check(&self, index: usize, rule: ParamRule) -> Result<(), SessionError> {
        let present = match rule.kind {
            ParamKind::Text => self.opt(index).is_some(),
            ParamKind::U32 => self.opt_u32(index)?.is_some(),
            ParamKind::U64 => self.opt_u64(index)?.is_some(),
            ParamKind::Flag => self.opt_flag(index)?.is_some(),
        };
        if rule.required && !present {
            return Err(self.invalid(index, "is required"));
        }
        Ok(())
    }

    /// Optional value at `index`.
    #[must_use]
    pub fn opt(&self, index: usize) -> Option<&'a str> {
        self.values.get(index).copied().filter(|v| !v.is_empty())
    }

    /// Optional value at `index`, owned.
    #[must_use]
    pub fn owned(&self, index: usize) -> Option<String> {
        self.opt(index).map(str::to_string)
    }

    /// Required value at `index`.
    ///
    /// # Errors
    /// Returns error if the value is absent.
    pub fn required(&self, index: usize) -> Result<&'a str, SessionError> {
        self.opt(index).ok_or_else(|| self.invalid(index, "is required"))
    }

    /// # Errors
    /// Returns error if the value is present but not an unsigned integer.
    pub fn opt_u64(&self, index: usize) -> Result<Option<u64>, SessionError> {
        self.opt(index)
            .map(|v| v.parse().map_err(|_| self.invalid(index, "must be a number")))
            .transpose()
    }

    /// # Errors
    /// Returns error if the value is absent or not an unsigned integer.
    pub fn u64(&self, index: usize) -> Result<u64, SessionError> {
        self.opt_u64(index)?
            .ok_or_else(|| self.invalid(index, "is required"))
    }

    /// # Errors
    /// Returns error if the value is present but not an unsigned integer.
    pub fn opt_u32(&self, index: usize) -> Result<Option<u32>, SessionError> {
        self.opt(index)
            .map(|v| v.parse().map_err(|_| self.invalid(index, "must be a number")))
            .transpose()
    }

    /// # Errors
    /// Returns error if the value is absent or not an unsigned integer.
    pub fn u32(&self, index: usize) -> Result<u32, SessionError> {
        self.opt_u32(index)?
            .ok_or_else(|| self.invalid(index, "is required"))
    }

    /// Optional boolean: `1/true/yes/on` or `0/false/no/off`.
    ///
    /// # Errors
    /// Returns error if the value is present but not a boolean.
    pub fn opt_flag(&self, index: usize) -> Result<Option<bool>, SessionError> {
        self.opt(index)
            .map(|v| match v.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Ok(true),
                "0" | "false" | "no" | "off" => Ok(false),
                _ => Err(self.invalid(index, "must be a boolean")),
            })
            .transpose()
    }

    /// Boolean defaulting to `false`.
    ///
    /// # Errors
    /// Returns error if the value is present but not a boolean.
    pub fn flag(&self, index: usize) -> Result<bool, SessionError> {
        Ok(self.opt_flag(index)?.unwrap_or(false))
    }
}

/// Conversion of an operation's return value into a stored response.
pub trait IntoQueueResponse {
    /// `None` for the boolean failure value.
    fn into_queue_response(self) -> Option<QueueResponse>;
}

impl IntoQueueResponse for bool {
    fn into_queue_response(self) -> Option<QueueResponse> {
        self.then_some(QueueResponse::Acknowledged)
    }
}

impl IntoQueueResponse for Option<Vec<Event>> {
    fn into_queue_response(self) -> Option<QueueResponse> {
        Some(self.map_or(QueueResponse::NotFound, QueueResponse::Events))
    }
}

impl IntoQueueResponse for Option<Event> {
    fn into_queue_response(self) -> Option<QueueResponse> {
        Some(self.map_or(QueueResponse::NotFound, QueueResponse::Event))
    }
}

macro_rules! handler {
    (|$session:ident, $args:ident| $body:expr) => {{
        fn handle<'a>($session: &'a Session, $args: BoundArgs<'a>) -> HandlerFuture<'a> {
            Box::pin(async move {
                let result = $body;
                Ok::<_, SessionError>(IntoQueueResponse::into_queue_response(result))
            })
        }
        handle as Handler
    }};
}

macro_rules! command {
    ($name:literal, $action:literal, [$($param:expr),* $(,)?], $handler:expr) => {
        CommandSpec {
            name: $name,
            action: $action,
            params: &[$($param),*],
            handler: $handler,
            check: None,
        }
    };
    ($name:literal, $action:literal, [$($param:expr),* $(,)?], $handler:expr, $check:expr) => {
        CommandSpec {
            name: $name,
            action: $action,
            params: &[$($param),*],
            handler: $handler,
            check: Some($check as Check),
        }
    };
}

fn parse_load_type(value: Option<&str>) -> Result<ModuleLoadType, SessionError> {
    match value.map(str::to_ascii_lowercase).as_deref() {
        None | Some("reload") => Ok(ModuleLoadType::Reload),
        Some("load") => Ok(ModuleLoadType::Load),
        Some("unload") => Ok(ModuleLoadType::Unload),
        Some(other) => Err(SessionError::InvalidArgument(format!(
            "module_load: unknown load type '{other}'"
        ))),
    }
}

fn originate_request(args: &BoundArgs<'_>) -> Result<OriginateRequest, SessionError> {
    let mut request = OriginateRequest::new(args.required(0)?);
    request.context = args.owned(1);
    request.exten = args.owned(2);
    request.priority = args.owned(3);
    request.application = args.owned(4);
    request.data = args.owned(5);
    if let Some(timeout) = args.opt_u64(6)? {
        request.timeout_ms = Some(timeout);
    }
    request.caller_id = args.owned(7);
    request.variable = args.owned(8);
    request.account = args.owned(9);
    request.run_async = args.opt_flag(10)?.unwrap_or(true);
    request.codecs = args.owned(11);
    Ok(request)
}

fn check_originate(args: &BoundArgs<'_>) -> Result<(), SessionError> {
    originate_request(args)?.validate()
}

fn check_module_load(args: &BoundArgs<'_>) -> Result<(), SessionError> {
    let load_type = parse_load_type(args.opt(1))?;
    if load_type != ModuleLoadType::Reload && args.opt(0).is_none() {
        return Err(SessionError::InvalidArgument(format!(
            "module_load: {} requires a module",
            load_type.as_str()
        )));
    }
    Ok(())
}

const fn rule(required: bool, kind: ParamKind) -> ParamRule {
    ParamRule { required, kind }
}

const REQ: ParamRule = rule(true, ParamKind::Text);
const OPT: ParamRule = rule(false, ParamKind::Text);
const REQ_U32: ParamRule = rule(true, ParamKind::U32);
const OPT_U32: ParamRule = rule(false, ParamKind::U32);
const REQ_U64: ParamRule = rule(true, ParamKind::U64);
const OPT_U64: ParamRule = rule(false, ParamKind::U64);
const REQ_FLAG: ParamRule = rule(true, ParamKind::Flag);
const OPT_FLAG: ParamRule = rule(false, ParamKind::Flag);

#[allow(clippy::too_many_lines)]
fn standard_commands() -> Vec<CommandSpec> {
    vec![
        // Connection
        command!("login", "Login", [("username", OPT), ("secret", OPT)], handler!(|s, a| {
            match (a.opt(0), a.opt(1)) {
                (Some(username), Some(secret)) => s.login_with(username, secret).await?,
                _ => s.login().await?,
            }
        })),
        command!("logoff", "Logoff", [], handler!(|s, _a| s.logoff().await?)),
        command!("ping", "Ping", [], handler!(|s, _a| s.ping().await?)),
        command!("wait_event", "WaitEvent", [], handler!(|s, _a| s.wait_event().await?)),
        command!("challenge", "Challenge", [], handler!(|s, _a| s.challenge().await?)),
        command!("events", "Events", [("mask", REQ)], handler!(|s, a| s.events(a.required(0)?).await?)),
        // Queues
        command!(
            "queue_add",
            "QueueAdd",
            [("queue", REQ), ("interface", REQ), ("member_name", OPT), ("penalty", OPT_U32), ("paused", OPT_FLAG)],
            handler!(|s, a| {
                s.queue_add(a.required(0)?, a.required(1)?, a.opt(2), a.opt_u32(3)?, a.flag(4)?)
                    .await?
            })
        ),
        command!("queue_remove", "QueueRemove", [("queue", REQ), ("interface", REQ)], handler!(|s, a| {
            s.queue_remove(a.required(0)?, a.required(1)?).await?
        })),
        command!("queue_pause", "QueuePause", [("interface", REQ), ("paused", REQ_FLAG)], handler!(|s, a| {
            s.queue_pause(a.required(0)?, a.flag(1)?).await?
        })),
        command!("pause_queue_member", "QueuePause", [("interface", REQ)], handler!(|s, a| {
            s.pause_queue_member(a.required(0)?).await?
        })),
        command!("unpause_queue_member", "QueuePause", [("interface", REQ)], handler!(|s, a| {
            s.unpause_queue_member(a.required(0)?).await?
        })),
        command!("queue_status", "QueueStatus", [("queue", OPT), ("member", OPT)], handler!(|s, a| {
            s.queue_status(a.opt(0), a.opt(1)).await?
        })),
        command!("queue_summary", "QueueSummary", [("queue", OPT)], handler!(|s, a| {
            s.queue_summary(a.opt(0)).await?
        })),
        command!("agents", "Agents", [], handler!(|s, _a| s.agents().await?)),
        command!("queue_rule", "QueueRule", [("rule", REQ)], handler!(|s, a| {
            s.queue_rule(a.required(0)?).await?
        })),
        command!(
            "queue_penalty",
            "QueuePenalty",
            [("interface", REQ), ("queue", REQ), ("penalty", REQ_U32)],
            handler!(|s, a| s.queue_penalty(a.required(0)?, a.required(1)?, a.u32(2)?).await?)
        ),
        command!("queues", "Queues", [], handler!(|s, _a| s.queues().await?)),
        command!(
            "queue_log",
            "QueueLog",
            [("queue", REQ), ("unique_id", REQ), ("interface", REQ), ("event", REQ), ("message", REQ)],
            handler!(|s, a| {
                s.queue_log(a.required(0)?, a.required(1)?, a.required(2)?, a.required(3)?, a.required(4)?)
                    .await?
            })
        ),
        // SIP and IAX2
        command!("sip_peer", "SIPshowpeer", [("peer", REQ)], handler!(|s, a| {
            s.sip_peer(a.required(0)?).await?
        })),
        command!("sip_peers", "SIPpeers", [], handler!(|s, _a| s.sip_peers().await?)),
        command!("sip_qualify_peer", "SIPqualifypeer", [("peer", REQ)], handler!(|s, a| {
            s.sip_qualify_peer(a.required(0)?).await?
        })),
        command!("sip_notify", "SIPnotify", [("channel", REQ)], handler!(|s, a| {
            s.sip_notify(a.required(0)?).await?
        })),
        command!("sip_registry", "SIPshowregistry", [], handler!(|s, _a| s.sip_registry().await?)),
        command!("iax_peers", "IAXpeers", [], handler!(|s, _a| s.iax_peers().await?)),
        command!("iax_peer_list", "IAXpeerlist", [], handler!(|s, _a| s.iax_peer_list().await?)),
        command!("iax_netstats", "IAXnetstats", [], handler!(|s, _a| s.iax_netstats().await?)),
        // Channels and calls
        command!("play_dtmf", "PlayDTMF", [("channel", REQ), ("digit", REQ)], handler!(|s, a| {
            s.play_dtmf(a.required(0)?, a.required(1)?).await?
        })),
        command!("hangup", "Hangup", [("channel", REQ)], handler!(|s, a| {
            s.hangup(a.required(0)?).await?
        })),
        command!(
            "originate",
            "Originate",
            [
                ("channel", REQ),
                ("context", OPT),
                ("exten", OPT),
                ("priority", OPT),
                ("application", OPT),
                ("data", OPT),
                ("timeout", OPT_U64),
                ("caller_id", OPT),
                ("variable", OPT),
                ("account", OPT),
                ("async", OPT_FLAG),
                ("codecs", OPT),
            ],
            handler!(|s, a| s.originate(&originate_request(&a)?).await?),
            check_originate
        ),
        command!(
            "attended_transfer",
            "Atxfer",
            [("channel", REQ), ("exten", REQ), ("context", REQ), ("priority", REQ)],
            handler!(|s, a| {
                s.attended_transfer(a.required(0)?, a.required(1)?, a.required(2)?, a.required(3)?)
                    .await?
            })
        ),
        command!(
            "redirect",
            "Redirect",
            [("channel", REQ), ("exten", REQ), ("context", REQ), ("priority", REQ), ("extra_channel", OPT)],
            handler!(|s, a| {
                s.redirect(a.required(0)?, a.required(1)?, a.required(2)?, a.required(3)?, a.opt(4))
                    .await?
            })
        ),
        command!(
            "transfer",
            "Redirect",
            [("channel", REQ), ("exten", REQ), ("context", REQ), ("priority", REQ), ("extra_channel", OPT)],
            handler!(|s, a| {
                s.transfer(a.required(0)?, a.required(1)?, a.required(2)?, a.required(3)?, a.opt(4))
                    .await?
            })
        ),
        command!("bridge", "Bridge", [("channel1", REQ), ("channel2", REQ), ("tone", OPT_FLAG)], handler!(|s, a| {
            s.bridge(a.required(0)?, a.required(1)?, a.flag(2)?).await?
        })),
        command!(
            "park",
            "Park",
            [("channel", REQ), ("announce_channel", REQ), ("timeout", OPT_U64)],
            handler!(|s, a| s.park(a.required(0)?, a.required(1)?, a.opt_u64(2)?).await?)
        ),
        command!("parked_calls", "ParkedCalls", [], handler!(|s, _a| s.parked_calls().await?)),
        command!("status", "Status", [("channel", OPT), ("variables", OPT)], handler!(|s, a| {
            s.status(a.opt(0), a.opt(1)).await?
        })),
        command!("get_var", "GetVar", [("variable", REQ), ("channel", OPT)], handler!(|s, a| {
            s.get_var(a.required(0)?, a.opt(1)).await?
        })),
        command!(
            "set_var",
            "Setvar",
            [("variable", REQ), ("value", REQ), ("channel", OPT)],
            handler!(|s, a| s.set_var(a.required(0)?, a.required(1)?, a.opt(2)).await?)
        ),
        command!("send_text", "SendText", [("channel", REQ), ("message", REQ)], handler!(|s, a| {
            s.send_text(a.required(0)?, a.required(1)?).await?
        })),
        command!(
            "absolute_timeout",
            "AbsoluteTimeout",
            [("channel", REQ), ("timeout", REQ_U64)],
            handler!(|s, a| s.absolute_timeout(a.required(0)?, a.u64(1)?).await?)
        ),
        command!("agi", "AGI", [("channel", REQ), ("command", REQ), ("command_id", OPT)], handler!(|s, a| {
            s.agi(a.required(0)?, a.required(1)?, a.opt(2)).await?
        })),
        command!("user_event", "UserEvent", [("name", REQ)], handler!(|s, a| {
            s.user_event(a.required(0)?).await?
        })),
        command!("extension_state", "ExtensionState", [("exten", REQ), ("context", REQ)], handler!(|s, a| {
            s.extension_state(a.required(0)?, a.required(1)?).await?
        })),
        command!("active_channels", "CoreShowChannels", [], handler!(|s, _a| s.active_channels().await?)),
        // Monitor
        command!(
            "monitor",
            "Monitor",
            [("channel", REQ), ("file", OPT), ("format", OPT), ("mix", OPT_FLAG)],
            handler!(|s, a| s.monitor(a.required(0)?, a.opt(1), a.opt(2), a.flag(3)?).await?)
        ),
        command!("stop_monitor", "StopMonitor", [("channel", REQ)], handler!(|s, a| {
            s.stop_monitor(a.required(0)?).await?
        })),
        command!("change_monitor", "ChangeMonitor", [("channel", REQ), ("file", REQ)], handler!(|s, a| {
            s.change_monitor(a.required(0)?, a.required(1)?).await?
        })),
        command!("pause_monitor", "PauseMonitor", [("channel", REQ)], handler!(|s, a| {
            s.pause_monitor(a.required(0)?).await?
        })),
        command!("unpause_monitor", "UnpauseMonitor", [("channel", REQ)], handler!(|s, a| {
            s.unpause_monitor(a.required(0)?).await?
        })),
        // Database
        command!("db_get", "DBGet", [("family", REQ), ("key", REQ)], handler!(|s, a| {
            s.db_get(a.required(0)?, a.required(1)?).await?
        })),
        command!("db_put", "DBPut", [("family", REQ), ("key", REQ), ("value", OPT)], handler!(|s, a| {
            s.db_put(a.required(0)?, a.required(1)?, a.opt(2)).await?
        })),
        command!("db_del", "DBDel", [("family", REQ), ("key", REQ)], handler!(|s, a| {
            s.db_del(a.required(0)?, a.required(1)?).await?
        })),
        command!("db_del_tree", "DBDelTree", [("family", REQ), ("key", OPT)], handler!(|s, a| {
            s.db_del_tree(a.required(0)?, a.opt(1)).await?
        })),
        // Configuration and system
        command!("get_config", "GetConfig", [("filename", REQ), ("category", OPT)], handler!(|s, a| {
            s.get_config(a.required(0)?, a.opt(1)).await?
        })),
        command!("get_config_json", "GetConfigJSON", [("filename", REQ)], handler!(|s, a| {
            s.get_config_json(a.required(0)?).await?
        })),
        command!("create_config", "CreateConfig", [("filename", REQ)], handler!(|s, a| {
            s.create_config(a.required(0)?).await?
        })),
        command!("list_categories", "ListCategories", [("filename", REQ)], handler!(|s, a| {
            s.list_categories(a.required(0)?).await?
        })),
        command!("dialplan", "ShowDialPlan", [("context", OPT), ("extension", OPT)], handler!(|s, a| {
            s.dialplan(a.opt(0), a.opt(1)).await?
        })),
        command!("module_check", "ModuleCheck", [("module", REQ)], handler!(|s, a| {
            s.module_check(a.required(0)?).await?
        })),
        command!(
            "module_load",
            "ModuleLoad",
            [("module", OPT), ("load_type", OPT)],
            handler!(|s, a| s.module_load(a.opt(0), parse_load_type(a.opt(1))?).await?),
            check_module_load
        ),
        command!("reload", "Reload", [("module", OPT)], handler!(|s, a| s.reload(a.opt(0)).await?)),
        command!("core_status", "CoreStatus", [], handler!(|s, _a| s.core_status().await?)),
        command!("core_settings", "CoreSettings", [], handler!(|s, _a| s.core_settings().await?)),
        command!("list_commands", "ListCommands", [], handler!(|s, _a| s.list_commands().await?)),
        command!("command", "Command", [("command", REQ)], handler!(|s, a| {
            s.command(a.required(0)?).await?
        })),
        command!("mailbox_count", "MailboxCount", [("mailbox", REQ)], handler!(|s, a| {
            s.mailbox_count(a.required(0)?).await?
        })),
        command!("mailbox_status", "MailboxStatus", [("mailbox", REQ)], handler!(|s, a| {
            s.mailbox_status(a.required(0)?).await?
        })),
        command!("voicemail_users", "VoicemailUsersList", [], handler!(|s, _a| s.voicemail_users().await?)),
        command!(
            "jabber_send",
            "JabberSend",
            [("jabber", REQ), ("screen_name", REQ), ("message", REQ)],
            handler!(|s, a| s.jabber_send(a.required(0)?, a.required(1)?, a.required(2)?).await?)
        ),
    ]
}

/// Case-insensitive lookup of commands by operation or action name.
///
/// When several operations send the same action, the action name resolves
/// to the first one registered.
#[derive(Debug)]
pub struct CommandRegistry {
    commands: Vec<CommandSpec>,
    index: HashMap<String, usize>,
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl CommandRegistry {
    /// Registry without any command.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            commands: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Registry holding every standard session operation.
    #[must_use]
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        for spec in standard_commands() {
            registry.register(spec);
        }
        registry
    }

    /// Add a command. An existing command with the same operation name is
    /// replaced.
    pub fn register(&mut self, spec: CommandSpec) {
        let name = spec.name.to_ascii_lowercase();
        let position = match self.index.get(&name) {
            Some(&position) if self.commands[position].name.eq_ignore_ascii_case(spec.name) => {
                self.commands[position] = spec;
                position
            }
            _ => {
                self.commands.push(spec);
                self.commands.len() - 1
            }
        };
        self.index.insert(name, position);
        self.index
            .entry(spec.action.to_ascii_lowercase())
            .or_insert(position);
    }

    /// Resolve a command name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&CommandSpec> {
        self.index
            .get(&name.to_ascii_lowercase())
            .map(|&position| &self.commands[position])
    }

    /// Registered commands in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &CommandSpec> {
        self.commands.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}
