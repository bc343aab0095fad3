//! Job payload pushed onto the work queue.
//!
//! Wire format is the Resque job object:
//!
//! ```text
//! {"class": "ProcessMessageQueue", "args": ["nylas_notification", <namespace>, <message>]}
//! ```

use crate::error::NotifyResult;
use serde::{Deserialize, Serialize};

/// Worker class that processes message notifications.
pub const JOB_CLASS: &str = "ProcessMessageQueue";

/// Kind tag carried as the first job argument.
pub const NOTIFICATION_KIND: &str = "nylas_notification";

/// A job description. Carries public identifiers only, so consumers never
/// need direct store access to find the resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub class: String,
    pub args: [String; 3],
}

impl Job {
    /// Build the "message created" job. Independent of the destination queue.
    pub fn message_created(namespace_public_id: &str, message_public_id: &str) -> Self {
        Self {
            class: JOB_CLASS.to_string(),
            args: [
                NOTIFICATION_KIND.to_string(),
                namespace_public_id.to_string(),
                message_public_id.to_string(),
            ],
        }
    }

    pub fn namespace_public_id(&self) -> &str {
        &self.args[1]
    }

    pub fn entity_public_id(&self) -> &str {
        &self.args[2]
    }

    /// Serialize to the JSON string stored in the queue list.
    pub fn to_json(&self) -> NotifyResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_created_payload() {
        let job = Job::message_created("ns_123", "msg_456");
        let value: serde_json::Value = serde_json::from_str(&job.to_json().unwrap()).unwrap();

        assert_eq!(
            value,
            json!({
                "class": "ProcessMessageQueue",
                "args": ["nylas_notification", "ns_123", "msg_456"]
            })
        );
    }

    #[test]
    fn test_accessors() {
        let job = Job::message_created("ns", "msg");
        assert_eq!(job.namespace_public_id(), "ns");
        assert_eq!(job.entity_public_id(), "msg");
    }

    #[test]
    fn test_rejects_wrong_arity() {
        let result: Result<Job, _> =
            serde_json::from_str(r#"{"class":"ProcessMessageQueue","args":["a","b"]}"#);
        assert!(result.is_err());
    }
}
