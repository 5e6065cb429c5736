//! Line-oriented JSON wire format.
//!
//! One request object per input line, one response object per output line.
//! Requests carry no identifier; responses are correlated by order alone.

use crate::error::DriverError;
use serde::de::Error as _;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Prefix of the per-site chat actions (`chat_chatgpt`, `chat_deepseek`)
/// still sent by older hosts.
const LEGACY_CHAT_PREFIX: &str = "chat_";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Init,
    Navigate,
    Chat,
    Close,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Init => "init",
            Action::Navigate => "navigate",
            Action::Chat => "chat",
            Action::Close => "close",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Payload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Request {
    pub action: Action,
    #[serde(rename = "siteId", skip_serializing_if = "Option::is_none")]
    pub site_id: Option<String>,
    #[serde(skip_serializing_if = "is_empty_payload")]
    pub payload: Payload,
}

fn is_empty_payload(payload: &Payload) -> bool {
    payload.url.is_none() && payload.prompt.is_none()
}

#[derive(Deserialize)]
struct RawRequest {
    action: String,
    #[serde(default, rename = "siteId")]
    site_id: Option<String>,
    #[serde(default)]
    payload: Option<Payload>,
}

impl Request {
    pub fn init() -> Self {
        Self::bare(Action::Init)
    }

    pub fn close() -> Self {
        Self::bare(Action::Close)
    }

    pub fn navigate(url: impl Into<String>) -> Self {
        Self {
            action: Action::Navigate,
            site_id: None,
            payload: Payload {
                url: Some(url.into()),
                prompt: None,
            },
        }
    }

    pub fn chat(site_id: impl Into<String>, prompt: Option<String>) -> Self {
        Self {
            action: Action::Chat,
            site_id: Some(site_id.into()),
            payload: Payload { url: None, prompt },
        }
    }

    fn bare(action: Action) -> Self {
        Self {
            action,
            site_id: None,
            payload: Payload::default(),
        }
    }

    /// Parses one input line.
    ///
    /// Input that is not JSON at all is a `Parse` error; a JSON value with the
    /// wrong shape is an `InvalidRequest`; an unrecognised action string is an
    /// `UnknownAction`.
    pub fn parse(line: &str) -> Result<Self, DriverError> {
        let raw: RawRequest = serde_json::from_str(line).map_err(|e| {
            if e.is_data() {
                DriverError::InvalidRequest(e.to_string())
            } else {
                DriverError::Parse(e.to_string())
            }
        })?;

        let payload = raw.payload.unwrap_or_default();
        let (action, site_id) = match raw.action.as_str() {
            "init" => (Action::Init, raw.site_id),
            "navigate" => (Action::Navigate, raw.site_id),
            "chat" => (Action::Chat, raw.site_id),
            "close" => (Action::Close, raw.site_id),
            other => match other.strip_prefix(LEGACY_CHAT_PREFIX) {
                Some(site) if !site.is_empty() => (Action::Chat, Some(site.to_string())),
                _ => return Err(DriverError::UnknownAction(other.to_string())),
            },
        };

        Ok(Self {
            action,
            site_id,
            payload,
        })
    }

    /// Site id of a chat request, trimmed, or an error naming what is missing.
    pub fn require_site_id(&self) -> Result<&str, DriverError> {
        match self.site_id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => Ok(id),
            _ => Err(DriverError::InvalidRequest(format!(
                "'{}' requires a siteId",
                self.action.as_str()
            ))),
        }
    }

    pub fn require_url(&self) -> Result<&str, DriverError> {
        match self.payload.url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => Ok(url),
            _ => Err(DriverError::InvalidRequest(format!(
                "'{}' requires payload.url",
                self.action.as_str()
            ))),
        }
    }

    /// The prompt, if any. An empty prompt counts as none.
    pub fn prompt(&self) -> Option<&str> {
        self.payload.prompt.as_deref().filter(|p| !p.is_empty())
    }
}

/// One output line.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Ready,
    Navigated {
        url: String,
    },
    ChatOpened {
        site_id: String,
    },
    ResponseReceived {
        content: String,
    },
    Error {
        code: String,
        message: String,
        detail: String,
    },
}

const OPENED_SUFFIX: &str = "_opened";

impl Response {
    pub fn status(&self) -> String {
        match self {
            Response::Ready => "ready".to_string(),
            Response::Navigated { .. } => "navigated".to_string(),
            Response::ChatOpened { site_id } => format!("{}{}", site_id, OPENED_SUFFIX),
            Response::ResponseReceived { .. } => "response_received".to_string(),
            Response::Error { .. } => "error".to_string(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Response::Error { .. })
    }

    /// The error code, for error responses.
    pub fn error_code(&self) -> Option<&str> {
        match self {
            Response::Error { code, .. } => Some(code),
            _ => None,
        }
    }

    pub fn to_json_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl From<DriverError> for Response {
    fn from(err: DriverError) -> Self {
        Response::Error {
            code: err.code().to_string(),
            message: err.message().to_string(),
            detail: err.detail(),
        }
    }
}

impl Serialize for Response {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("status", &self.status())?;
        match self {
            Response::Ready | Response::ChatOpened { .. } => {}
            Response::Navigated { url } => map.serialize_entry("url", url)?,
            Response::ResponseReceived { content } => map.serialize_entry("content", content)?,
            Response::Error {
                code,
                message,
                detail,
            } => {
                map.serialize_entry("error", code)?;
                map.serialize_entry("message", message)?;
                map.serialize_entry("details", detail)?;
            }
        }
        map.end()
    }
}

#[derive(Deserialize)]
struct RawResponse {
    status: String,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    details: Option<String>,
}

impl<'de> Deserialize<'de> for Response {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawResponse::deserialize(deserializer)?;
        match raw.status.as_str() {
            "ready" => Ok(Response::Ready),
            "navigated" => Ok(Response::Navigated {
                url: raw.url.ok_or_else(|| D::Error::missing_field("url"))?,
            }),
            "response_received" => Ok(Response::ResponseReceived {
                content: raw.content.ok_or_else(|| D::Error::missing_field("content"))?,
            }),
            "error" => {
                let code = raw.error.ok_or_else(|| D::Error::missing_field("error"))?;
                Ok(Response::Error {
                    message: raw.message.unwrap_or_else(|| code.clone()),
                    code,
                    detail: raw.details.unwrap_or_default(),
                })
            }
            other => match other.strip_suffix(OPENED_SUFFIX) {
                Some(site_id) if !site_id.is_empty() => Ok(Response::ChatOpened {
                    site_id: site_id.to_string(),
                }),
                _ => Err(D::Error::custom(format!("unknown status: {}", other))),
            },
        }
    }
}
