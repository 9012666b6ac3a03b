//! Canned chat replies built from the latest report.

use std::fmt::Write as _;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::intents::{Intent, IntentMatcher};
use crate::bridge::{CommandInvocation, CommandRunner, ReportPayload};

/// Reply sent to clients whenever the report cannot be produced.
pub const APOLOGY: &str = "I'm sorry, I couldn't retrieve the latest recruitment data right now. Please try again later.";

/// Response body for the client chat endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    pub success: bool,
    pub response: String,
}

impl ChatReply {
    fn answered(response: String) -> Self {
        Self {
            success: true,
            response,
        }
    }

    fn apology() -> Self {
        Self {
            success: false,
            response: APOLOGY.to_string(),
        }
    }
}

/// Answers client questions from a freshly generated report.
///
/// Failure details are logged, never returned: the client only ever sees
/// [`APOLOGY`].
#[derive(Clone)]
pub struct ChatResponder {
    runner: Arc<dyn CommandRunner>,
    matcher: IntentMatcher,
}

impl ChatResponder {
    #[must_use]
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            runner,
            matcher: IntentMatcher::with_default_rules(),
        }
    }

    /// Run `generate_report` and answer `message` from its payload.
    pub async fn respond(&self, message: &str) -> ChatReply {
        let result = match self.runner.invoke(CommandInvocation::generate_report()).await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(error = %e, kind = e.kind(), "Chat report generation failed");
                return ChatReply::apology();
            }
        };

        if result.success() != Some(true) {
            tracing::warn!(error = ?result.error_message(), "Worker reported an unsuccessful report");
            return ChatReply::apology();
        }

        match result.parse::<ReportPayload>() {
            Ok(payload) => {
                let intent = self.matcher.classify(message);
                tracing::debug!(?intent, "Answering chat message");
                ChatReply::answered(render(intent, &payload))
            }
            Err(e) => {
                tracing::error!(error = %e, "Report payload has unexpected shape");
                ChatReply::apology()
            }
        }
    }
}

/// Fill the template for `intent`.
#[must_use]
pub fn render(intent: Intent, payload: &ReportPayload) -> String {
    let data = &payload.project_data;
    let pct = data.completion_percentage * 100.0;

    match intent {
        Intent::Status => {
            let mut reply = format!(
                "Current status: {} out of {} completes ({pct:.1}%).",
                data.overall_completes, data.total_quota
            );
            if !payload.analysis.is_empty() {
                let _ = write!(reply, " {}", payload.analysis);
            }
            reply
        }
        Intent::Remaining => format!(
            "{} completes remaining to reach the target of {} ({pct:.1}% done).",
            data.remaining(),
            data.total_quota
        ),
        Intent::Segments if !data.segments.is_empty() => {
            let mut reply = String::from("Segment breakdown:");
            for (segment, categories) in &data.segments {
                let _ = write!(reply, "\n- {segment}: {}", describe_categories(categories));
            }
            reply
        }
        Intent::Segments => render(Intent::Status, payload),
        Intent::Analysis if !payload.analysis.is_empty() => {
            format!("Here's the latest analysis: {}", payload.analysis)
        }
        Intent::Analysis | Intent::General => format!(
            "The project is at {pct:.1}% completion with {} of {} completes. \
             Ask me about status, remaining quota, segments or the latest analysis.",
            data.overall_completes, data.total_quota
        ),
    }
}

fn describe_categories(categories: &serde_json::Value) -> String {
    match categories.as_object() {
        Some(map) => map
            .iter()
            .map(|(name, value)| match value {
                serde_json::Value::String(s) => format!("{name} {s}"),
                other => format!("{name} {other}"),
            })
            .collect::<Vec<_>>()
            .join(", "),
        None => categories.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::{BridgeError, InvocationResult, StructuredResult};
    use async_trait::async_trait;
    use serde_json::json;

    struct FixedRunner(InvocationResult);

    #[async_trait]
    impl CommandRunner for FixedRunner {
        async fn invoke(&self, _invocation: CommandInvocation) -> InvocationResult {
            self.0.clone()
        }
    }

    fn responder(result: InvocationResult) -> ChatResponder {
        ChatResponder::new(Arc::new(FixedRunner(result)))
    }

    fn report() -> StructuredResult {
        StructuredResult::new(json!({
            "success": true,
            "project_data": {
                "overall_completes": 45,
                "total_quota": 100,
                "completion_percentage": 0.45,
                "segments": {"Oncologists": {"US": 20, "EU": 5}}
            },
            "analysis": "On track."
        }))
    }

    #[tokio::test]
    async fn test_status_reply() {
        let reply = responder(Ok(report())).respond("What's the status?").await;
        assert!(reply.success);
        assert!(reply.response.contains("45 out of 100"), "{}", reply.response);
        assert!(reply.response.contains("45.0%"), "{}", reply.response);
        assert_eq!(
            reply.response,
            "Current status: 45 out of 100 completes (45.0%). On track."
        );
    }

    #[tokio::test]
    async fn test_remaining_reply() {
        let reply = responder(Ok(report())).respond("what's remaining").await;
        assert!(reply.response.starts_with("55 completes remaining"));
    }

    #[tokio::test]
    async fn test_segment_reply() {
        let reply = responder(Ok(report())).respond("segment breakdown").await;
        assert!(reply.response.contains("- Oncologists: EU 5, US 20"), "{}", reply.response);
    }

    #[tokio::test]
    async fn test_analysis_reply() {
        let reply = responder(Ok(report())).respond("are we behind?").await;
        assert_eq!(reply.response, "Here's the latest analysis: On track.");
    }

    #[tokio::test]
    async fn test_bridge_error_is_hidden() {
        let reply = responder(Err(BridgeError::NonZeroExit {
            command: "generate_report".to_string(),
            exit_code: Some(1),
            stderr: "KeyError: 'secret'".to_string(),
        }))
        .respond("status")
        .await;

        assert!(!reply.success);
        assert_eq!(reply.response, APOLOGY);
    }

    #[tokio::test]
    async fn test_worker_failure_payload_is_hidden() {
        let result = StructuredResult::new(json!({"success": false, "error": "API key missing"}));
        let reply = responder(Ok(result)).respond("status").await;
        assert_eq!(reply, ChatReply::apology());
    }

    #[tokio::test]
    async fn test_malformed_payload_is_hidden() {
        let result = StructuredResult::new(json!({"success": true}));
        let reply = responder(Ok(result)).respond("status").await;
        assert_eq!(reply.response, APOLOGY);
    }

    #[test]
    fn test_general_reply_without_analysis() {
        let payload: ReportPayload = report().parse().unwrap();
        let payload = ReportPayload {
            analysis: String::new(),
            ..payload
        };
        let text = render(Intent::Analysis, &payload);
        assert!(text.starts_with("The project is at 45.0% completion"));
    }
}
