// common/src/envelope.rs
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Outcome flag carried in every envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    Success,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub text: String,
    #[serde(rename = "type")]
    pub kind: MessageType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meta {
    pub status: Status,
    pub messages: Vec<Message>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paging {
    pub page: u32,
    pub page_size: u32,
    pub total: u64,
}

/// Normalized response shape shared by success and failure responses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T = Value> {
    pub meta: Meta,
    pub data: T,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paging: Option<Paging>,
}

impl<T> Envelope<T> {
    pub fn success(data: T) -> Self {
        Self {
            meta: Meta {
                status: Status::Success,
                messages: Vec::new(),
            },
            data,
            paging: None,
        }
    }

    pub fn with_message(mut self, text: impl Into<String>, kind: MessageType) -> Self {
        self.meta.messages.push(Message {
            text: text.into(),
            kind,
        });
        self
    }

    pub fn with_paging(mut self, paging: Paging) -> Self {
        self.paging = Some(paging);
        self
    }

    pub fn is_success(&self) -> bool {
        self.meta.status == Status::Success
    }
}

impl Envelope<Value> {
    /// Error envelope with a single error message and `data: null`
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            meta: Meta {
                status: Status::Error,
                messages: Vec::new(),
            },
            data: Value::Null,
            paging: None,
        }
        .with_message(text, MessageType::Error)
    }

    /// Degraded-success stand-in for a list endpoint whose backend is unreachable
    pub fn empty_list(notice: impl Into<String>) -> Self {
        Self::success(Value::Array(Vec::new())).with_message(notice, MessageType::Info)
    }
}
