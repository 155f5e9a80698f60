use serde_json::json;

use crate::JobId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelAction {
    Subscribe,
    Unsubscribe,
}

impl ChannelAction {
    pub fn as_str(self) -> &'static str {
        match self {
            ChannelAction::Subscribe => "subscribe",
            ChannelAction::Unsubscribe => "unsubscribe",
        }
    }
}

/// Outbound `{action, job_id}` frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlFrame {
    pub action: ChannelAction,
    pub job_id: JobId,
}

impl ControlFrame {
    pub fn subscribe(job_id: impl Into<JobId>) -> Self {
        Self {
            action: ChannelAction::Subscribe,
            job_id: job_id.into(),
        }
    }

    pub fn unsubscribe(job_id: impl Into<JobId>) -> Self {
        Self {
            action: ChannelAction::Unsubscribe,
            job_id: job_id.into(),
        }
    }

    pub fn to_json(&self) -> String {
        json!({ "action": self.action.as_str(), "job_id": self.job_id }).to_string()
    }
}
