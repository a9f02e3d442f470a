use serde::{Deserialize, Serialize};

use super::status::Status;
use crate::session::SessionId;
use crate::spaces::{ActionSpace, Event, ObservationSpace};

/// Input program reference. An inline `program` skips the artifact store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BenchmarkRef {
    pub uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub program: Option<Vec<u8>>,
}

impl BenchmarkRef {
    #[must_use]
    pub fn uri(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            program: None,
        }
    }

    #[must_use]
    pub fn inline(uri: impl Into<String>, program: impl Into<Vec<u8>>) -> Self {
        Self {
            uri: uri.into(),
            program: Some(program.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetVersionReply {
    pub service_version: String,
    pub compiler_version: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GetSpacesRequest {
    pub backend: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetSpacesReply {
    pub action_spaces: Vec<ActionSpace>,
    pub observation_spaces: Vec<ObservationSpace>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StartSessionRequest {
    pub action_space: usize,
    pub benchmark: BenchmarkRef,
    /// Observations to compute right after the program is loaded.
    #[serde(default)]
    pub observation_spaces: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartSessionReply {
    pub session_id: SessionId,
    pub observations: Vec<Event>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ForkSessionRequest {
    pub session_id: SessionId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForkSessionReply {
    pub session_id: SessionId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StepRequest {
    pub session_id: SessionId,
    pub action: Event,
    #[serde(default)]
    pub observation_spaces: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepReply {
    pub end_of_episode: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_action_space: Option<ActionSpace>,
    pub action_had_no_effect: bool,
    pub observations: Vec<Event>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ObserveRequest {
    pub session_id: SessionId,
    pub observation_space: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObserveReply {
    pub observation: Event,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EndSessionRequest {
    pub session_id: SessionId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndSessionReply {
    pub remaining_sessions: usize,
}

/// One service call, as carried on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", content = "params", rename_all = "snake_case")]
pub enum Request {
    GetVersion,
    GetSpaces(GetSpacesRequest),
    StartSession(StartSessionRequest),
    ForkSession(ForkSessionRequest),
    Step(StepRequest),
    Observe(ObserveRequest),
    EndSession(EndSessionRequest),
}

impl Request {
    #[must_use]
    pub fn method(&self) -> &'static str {
        match self {
            Self::GetVersion => "get_version",
            Self::GetSpaces(_) => "get_spaces",
            Self::StartSession(_) => "start_session",
            Self::ForkSession(_) => "fork_session",
            Self::Step(_) => "step",
            Self::Observe(_) => "observe",
            Self::EndSession(_) => "end_session",
        }
    }

    /// Decodes a JSON request. Malformed input is an invalid-argument status.
    pub fn from_json(input: &str) -> Result<Self, Status> {
        serde_json::from_str(input)
            .map_err(|error| Status::invalid_argument(format!("malformed request: {error}")))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", content = "result", rename_all = "snake_case")]
pub enum Reply {
    GetVersion(GetVersionReply),
    GetSpaces(GetSpacesReply),
    StartSession(StartSessionReply),
    ForkSession(ForkSessionReply),
    Step(StepReply),
    Observe(ObserveReply),
    EndSession(EndSessionReply),
}

pub type Response = Result<Reply, Status>;

/// Wire encoding of a [`Response`]: `{"ok": reply}` or `{"error": status}`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseEnvelope<'a> {
    Ok(&'a Reply),
    Error(&'a Status),
}

impl<'a> From<&'a Response> for ResponseEnvelope<'a> {
    fn from(response: &'a Response) -> Self {
        match response {
            Ok(reply) => Self::Ok(reply),
            Err(status) => Self::Error(status),
        }
    }
}
