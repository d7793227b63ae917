//! Configuration files, modules and system information.

use pbx_remote_core::Event;

use crate::action::Action;
use crate::error::SessionError;
use crate::session::Session;

/// How `ModuleLoad` treats the module.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ModuleLoadType {
    Load,
    Unload,
    #[default]
    Reload,
}

impl ModuleLoadType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Load => "load",
            Self::Unload => "unload",
            Self::Reload => "reload",
        }
    }
}

/// Kind of edit applied by one [`ConfigChange`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigEdit {
    NewCat,
    RenameCat,
    DelCat,
    EmptyCat,
    Update,
    Delete,
    Append,
}

impl ConfigEdit {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NewCat => "NewCat",
            Self::RenameCat => "RenameCat",
            Self::DelCat => "DelCat",
            Self::EmptyCat => "EmptyCat",
            Self::Update => "Update",
            Self::Delete => "Delete",
            Self::Append => "Append",
        }
    }
}

/// One numbered edit of an `UpdateConfig` action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigChange {
    pub edit: ConfigEdit,
    pub category: String,
    pub variable: Option<String>,
    pub value: Option<String>,
    pub match_value: Option<String>,
}

impl ConfigChange {
    #[must_use]
    pub fn new(edit: ConfigEdit, category: impl Into<String>) -> Self {
        Self {
            edit,
            category: category.into(),
            variable: None,
            value: None,
            match_value: None,
        }
    }

    /// Set the variable and value the edit applies to.
    #[must_use]
    pub fn set(mut self, variable: impl Into<String>, value: impl Into<String>) -> Self {
        self.variable = Some(variable.into());
        self.value = Some(value.into());
        self
    }

    /// Restrict the edit to lines whose current value matches.
    #[must_use]
    pub fn matching(mut self, value: impl Into<String>) -> Self {
        self.match_value = Some(value.into());
        self
    }
}

impl Session {
    /// Read a configuration file, optionally one category of it.
    ///
    /// # Errors
    /// Returns error only if an event filter fails.
    pub async fn get_config(
        &self,
        filename: &str,
        category: Option<&str>,
    ) -> Result<Option<Vec<Event>>, SessionError> {
        self.list(
            Action::new("GetConfig")
                .param("Filename", filename)
                .param_opt("Category", category),
        )
        .await
    }

    /// # Errors
    /// Returns error only if an event filter fails.
    pub async fn get_config_json(&self, filename: &str) -> Result<Option<Vec<Event>>, SessionError> {
        self.list(Action::new("GetConfigJSON").param("Filename", filename))
            .await
    }

    /// Create an empty configuration file.
    ///
    /// # Errors
    /// Returns error only if an event filter fails.
    pub async fn create_config(&self, filename: &str) -> Result<bool, SessionError> {
        self.acknowledge(Action::new("CreateConfig").param("Filename", filename))
            .await
    }

    /// Apply numbered edits from `source` and write the result to
    /// `destination`, optionally reloading a module afterwards.
    ///
    /// # Errors
    /// Returns [`SessionError::InvalidArgument`] if `changes` is empty.
    pub async fn update_config(
        &self,
        source: &str,
        destination: &str,
        reload: Option<&str>,
        changes: &[ConfigChange],
    ) -> Result<bool, SessionError> {
        if changes.is_empty() {
            return Err(SessionError::InvalidArgument(
                "update_config needs at least one change".to_string(),
            ));
        }

        let mut action = Action::new("UpdateConfig")
            .param("SrcFilename", source)
            .param("DstFilename", destination)
            .param_opt("Reload", reload);
        for (index, change) in changes.iter().enumerate() {
            let n = format!("{index:06}");
            action = action
                .param(format!("Action-{n}"), change.edit.as_str())
                .param(format!("Cat-{n}"), &change.category)
                .param_opt(format!("Var-{n}"), change.variable.as_ref())
                .param_opt(format!("Value-{n}"), change.value.as_ref())
                .param_opt(format!("Match-{n}"), change.match_value.as_ref());
        }
        self.acknowledge(action).await
    }

    /// # Errors
    /// Returns error only if an event filter fails.
    pub async fn list_categories(&self, filename: &str) -> Result<Option<Vec<Event>>, SessionError> {
        self.list(Action::new("ListCategories").param("Filename", filename))
            .await
    }

    /// Dialplan, optionally restricted to a context and extension.
    ///
    /// # Errors
    /// Returns error only if an event filter fails.
    pub async fn dialplan(
        &self,
        context: Option<&str>,
        extension: Option<&str>,
    ) -> Result<Option<Vec<Event>>, SessionError> {
        self.list(
            Action::new("ShowDialPlan")
                .param_opt("Context", context)
                .param_opt("Extension", extension),
        )
        .await
    }

    /// Whether a module is loaded.
    ///
    /// # Errors
    /// Returns error only if an event filter fails.
    pub async fn module_check(&self, module: &str) -> Result<bool, SessionError> {
        self.acknowledge(Action::new("ModuleCheck").param("Module", module))
            .await
    }

    /// Load, unload or reload a module. Reload without a module reloads
    /// everything.
    ///
    /// # Errors
    /// Returns [`SessionError::InvalidArgument`] if a load or unload names no
    /// module.
    pub async fn module_load(
        &self,
        module: Option<&str>,
        load_type: ModuleLoadType,
    ) -> Result<bool, SessionError> {
        if load_type != ModuleLoadType::Reload && module.is_none() {
            return Err(SessionError::InvalidArgument(format!(
                "{} requires a module",
                load_type.as_str()
            )));
        }
        self.acknowledge(
            Action::new("ModuleLoad")
                .param("LoadType", load_type.as_str())
                .param_opt("Module", module),
        )
        .await
    }

    /// Reload one module, or all of them.
    ///
    /// # Errors
    /// Returns error only if an event filter fails.
    pub async fn reload(&self, module: Option<&str>) -> Result<bool, SessionError> {
        self.acknowledge(Action::new("Reload").param_opt("Module", module))
            .await
    }

    /// # Errors
    /// Returns error only if an event filter fails.
    pub async fn core_status(&self) -> Result<Option<Vec<Event>>, SessionError> {
        self.list(Action::new("CoreStatus")).await
    }

    /// # Errors
    /// Returns error only if an event filter fails.
    pub async fn core_settings(&self) -> Result<Option<Vec<Event>>, SessionError> {
        self.list(Action::new("CoreSettings")).await
    }

    /// # Errors
    /// Returns error only if an event filter fails.
    pub async fn list_commands(&self) -> Result<Option<Vec<Event>>, SessionError> {
        self.list(Action::new("ListCommands")).await
    }

    /// Run a CLI command.
    ///
    /// # Errors
    /// Returns error only if an event filter fails.
    pub async fn command(&self, cli: &str) -> Result<Option<Vec<Event>>, SessionError> {
        self.list(Action::new("Command").param("Command", cli)).await
    }

    /// # Errors
    /// Returns error only if an event filter fails.
    pub async fn mailbox_count(&self, mailbox: &str) -> Result<Option<Vec<Event>>, SessionError> {
        self.list(Action::new("MailboxCount").param("Mailbox", mailbox))
            .await
    }

    /// # Errors
    /// Returns error only if an event filter fails.
    pub async fn mailbox_status(&self, mailbox: &str) -> Result<Option<Vec<Event>>, SessionError> {
        self.list(Action::new("MailboxStatus").param("Mailbox", mailbox))
            .await
    }

    /// # Errors
    /// Returns error only if an event filter fails.
    pub async fn voicemail_users(&self) -> Result<Option<Vec<Event>>, SessionError> {
        self.list(Action::new("VoicemailUsersList")).await
    }

    /// Send a message through a Jabber client.
    ///
    /// # Errors
    /// Returns error only if an event filter fails.
    pub async fn jabber_send(
        &self,
        jabber: &str,
        screen_name: &str,
        message: &str,
    ) -> Result<bool, SessionError> {
        self.acknowledge(
            Action::new("JabberSend")
                .param("Jabber", jabber)
                .param("ScreenName", screen_name)
                .param("Message", message),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::testing::{ScriptedTransport, ajax_response};

    fn session(transport: &Arc<ScriptedTransport>) -> Session {
        Session::builder("http://pbx.test/mxml")
            .transport(transport.clone())
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_update_config_numbers_changes() {
        let transport = ScriptedTransport::new();
        transport.push_body(ajax_response(&[&[("response", "Success")]]));
        let session = session(&transport);
        let changes = [
            ConfigChange::new(ConfigEdit::NewCat, "1001"),
            ConfigChange::new(ConfigEdit::Append, "1001").set("secret", "s3cret"),
        ];

        assert!(
            session
                .update_config("sip.conf", "sip.conf", Some("chan_sip"), &changes)
                .await
                .unwrap()
        );
        assert_eq!(
            transport.requests()[0].url.query(),
            Some(
                "Action=UpdateConfig&SrcFilename=sip.conf&DstFilename=sip.conf&Reload=chan_sip\
                 &Action-000000=NewCat&Cat-000000=1001\
                 &Action-000001=Append&Cat-000001=1001&Var-000001=secret&Value-000001=s3cret"
            )
        );
    }

    #[tokio::test]
    async fn test_update_config_without_changes_is_rejected() {
        let transport = ScriptedTransport::new();
        let session = session(&transport);

        assert!(matches!(
            session.update_config("a.conf", "a.conf", None, &[]).await,
            Err(SessionError::InvalidArgument(_))
        ));
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_module_load_requires_module_unless_reload() {
        let transport = ScriptedTransport::new();
        transport.push_body(ajax_response(&[&[("response", "Success")]]));
        let session = session(&transport);

        assert!(matches!(
            session.module_load(None, ModuleLoadType::Unload).await,
            Err(SessionError::InvalidArgument(_))
        ));
        assert!(session.module_load(None, ModuleLoadType::Reload).await.unwrap());
        assert_eq!(
            transport.requests()[0].url.query(),
            Some("Action=ModuleLoad&LoadType=reload")
        );
    }
}
