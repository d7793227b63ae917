//! Action request building.

use pbx_remote_core::Arguments;
use url::Url;

/// Query parameter naming the action.
pub const ACTION_KEY: &str = "Action";

/// A named manager action with its parameters.
#[derive(Debug, Clone)]
pub struct Action {
    name: String,
    params: Arguments,
}

impl Action {
    /// Create an action without parameters.
    #[must_use]
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            params: Arguments::new(),
        }
    }

    /// Add a parameter.
    #[must_use]
    pub fn param<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: ToString,
    {
        self.params.insert(key.into(), value.to_string());
        self
    }

    /// Add a parameter only when a value is supplied.
    #[must_use]
    pub fn param_opt<K, V>(self, key: K, value: Option<V>) -> Self
    where
        K: Into<String>,
        V: ToString,
    {
        match value {
            Some(value) => self.param(key, value),
            None => self,
        }
    }

    /// Add `key=1` when `enabled`, nothing otherwise.
    #[must_use]
    pub fn flag<K: Into<String>>(self, key: K, enabled: bool) -> Self {
        if enabled { self.param(key, 1) } else { self }
    }

    /// Action name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parameters in insertion order.
    #[must_use]
    pub const fn params(&self) -> &Arguments {
        &self.params
    }
}

/// Build the request target: the endpoint with `Action` followed by the
/// parameters in insertion order, form-url-encoded.
#[must_use]
pub fn build_target(endpoint: &Url, action: &str, params: &Arguments) -> Url {
    let mut url = endpoint.clone();
    {
        let mut pairs = url.query_pairs_mut();
        pairs.append_pair(ACTION_KEY, action);
        for (key, value) in params {
            pairs.append_pair(key, value);
        }
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_optional_params_are_omitted() {
        let action = Action::new("QueueStatus")
            .param_opt("Queue", Some("support"))
            .param_opt::<_, &str>("Member", None)
            .flag("Paused", false);
        let keys: Vec<_> = action.params().keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["Queue"]);
    }

    #[test]
    fn test_target_preserves_order_and_encodes() {
        let endpoint = Url::parse("http://127.0.0.1:8088/mxml").unwrap();
        let action = Action::new("Command")
            .param("Command", "sip show peers")
            .param("ActionID", "a&b");
        let url = build_target(&endpoint, action.name(), action.params());
        assert_eq!(
            url.as_str(),
            "http://127.0.0.1:8088/mxml?Action=Command&Command=sip+show+peers&ActionID=a%26b"
        );
    }

    #[test]
    fn test_target_keeps_existing_query() {
        let endpoint = Url::parse("http://pbx/mxml?tenant=1").unwrap();
        let url = build_target(&endpoint, "Ping", &Arguments::new());
        assert_eq!(url.query(), Some("tenant=1&Action=Ping"));
    }

    #[test]
    fn test_target_does_not_consume_params() {
        let endpoint = Url::parse("http://pbx/mxml").unwrap();
        let mut params = Arguments::new();
        params.insert("Channel".to_string(), "SIP/1001-0001".to_string());
        let _ = build_target(&endpoint, "Hangup", &params);
        assert_eq!(params.len(), 1);
    }
}
