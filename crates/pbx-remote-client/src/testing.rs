//! Scripted transport for tests.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use quick_xml::escape::escape;
use url::Url;

use crate::error::TransportError;
use crate::transport::{Transport, TransportResponse};

/// A request seen by [`ScriptedTransport`].
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub url: Url,
    pub cookie: Option<String>,
}

/// Transport that replays queued replies and records every request.
///
/// Running out of replies is a transport failure.
#[derive(Default)]
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<Result<TransportResponse, String>>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedTransport {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queue a `200 OK` reply with the given body.
    pub fn push_body(&self, body: impl Into<String>) {
        self.push(Ok(TransportResponse {
            status: 200,
            set_cookie: None,
            body: body.into(),
        }));
    }

    /// Queue a `200 OK` reply carrying a `Set-Cookie` header.
    pub fn push_body_with_cookie(&self, body: impl Into<String>, set_cookie: &str) {
        self.push(Ok(TransportResponse {
            status: 200,
            set_cookie: Some(set_cookie.to_string()),
            body: body.into(),
        }));
    }

    /// Queue a transport failure.
    pub fn push_failure(&self, reason: &str) {
        self.push(Err(reason.to_string()));
    }

    fn push(&self, reply: Result<TransportResponse, String>) {
        self.replies.lock().push_back(reply);
    }

    /// Requests seen so far, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn get(
        &self,
        url: &Url,
        cookie: Option<&str>,
    ) -> Result<TransportResponse, TransportError> {
        self.requests.lock().push(RecordedRequest {
            url: url.clone(),
            cookie: cookie.map(str::to_string),
        });
        match self.replies.lock().pop_front() {
            Some(Ok(response)) => Ok(response),
            Some(Err(reason)) => Err(TransportError::Request(reason)),
            None => Err(TransportError::Request("no scripted reply left".to_string())),
        }
    }
}

/// Build an `ajax-response` body with one `generic` record per entry.
#[must_use]
pub fn ajax_response(records: &[&[(&str, &str)]]) -> String {
    let mut body = String::from("<ajax-response>\n");
    for record in records {
        body.push_str("<response type='object' id='unknown'><generic");
        for (key, value) in *record {
            body.push_str(&format!(" {key}='{}'", escape(*value)));
        }
        body.push_str(" /></response>\n");
    }
    body.push_str("</ajax-response>\n");
    body
}
