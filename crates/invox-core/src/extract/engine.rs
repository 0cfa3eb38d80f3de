//! Structured-extraction engine with a bounded retry budget.

use std::path::PathBuf;

use tracing::{debug, warn};

use invox_llm::CompletionService;

use crate::models::config::ExtractionConfig;
use crate::models::record::{ExtractionFailure, ExtractionOutcome, FailureReason};

use super::{prompt, repair};

/// Engine recovering a structured record from OCR text through a
/// completion service.
///
/// Each attempt issues one request and hands the reply to the repair
/// parser. The first successful repair wins immediately; a
/// parsed-but-incomplete record is still a success at this layer.
pub struct StructuredExtractionEngine<C: CompletionService> {
    service: C,
    max_retries: u32,
    max_prompt_chars: usize,
    debug_dump: Option<PathBuf>,
}

impl<C: CompletionService> StructuredExtractionEngine<C> {
    /// Create an engine with default limits.
    pub fn new(service: C) -> Self {
        Self {
            service,
            max_retries: 3,
            max_prompt_chars: prompt::MAX_PROMPT_CHARS,
            debug_dump: None,
        }
    }

    /// Create an engine from the extraction configuration.
    pub fn from_config(service: C, config: &ExtractionConfig) -> Self {
        Self {
            service,
            max_retries: config.max_retries,
            max_prompt_chars: config.max_prompt_chars,
            debug_dump: Some(config.debug_dump.clone()),
        }
    }

    /// Set the attempt budget.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the prompt character bound.
    pub fn with_prompt_limit(mut self, max_prompt_chars: usize) -> Self {
        self.max_prompt_chars = max_prompt_chars;
        self
    }

    /// Persist the raw reply here after an unrecoverable parse failure.
    pub fn with_debug_dump(mut self, path: PathBuf) -> Self {
        self.debug_dump = Some(path);
        self
    }

    /// Extract a structured record from raw OCR text.
    pub async fn extract(&self, raw_text: &str) -> ExtractionOutcome {
        let user_prompt = prompt::build_prompt(raw_text, self.max_prompt_chars);
        let budget = self.max_retries.max(1);
        let mut last_failure: Option<ExtractionFailure> = None;

        for attempt in 1..=budget {
            let reply = match self
                .service
                .complete(prompt::SYSTEM_INSTRUCTION, &user_prompt)
                .await
            {
                Ok(reply) => reply,
                Err(e) => {
                    warn!(
                        "completion service failed on attempt {}/{}: {}",
                        attempt, budget, e
                    );
                    last_failure = Some(ExtractionFailure {
                        reason: FailureReason::Service,
                        message: e.to_string(),
                        attempts: attempt,
                        raw_response: None,
                    });
                    continue;
                }
            };

            match repair::repair(&reply) {
                Ok(record) => {
                    debug!("repair succeeded on attempt {}/{}", attempt, budget);
                    return ExtractionOutcome::Record(record);
                }
                Err(e) => {
                    warn!(
                        "could not repair reply on attempt {}/{}: {}",
                        attempt, budget, e
                    );
                    last_failure = Some(ExtractionFailure {
                        reason: FailureReason::Malformed,
                        message: e.to_string(),
                        attempts: attempt,
                        raw_response: Some(reply),
                    });
                }
            }
        }

        let failure = match last_failure {
            Some(failure) => failure,
            None => ExtractionFailure {
                reason: FailureReason::Service,
                message: "retry budget exhausted".to_string(),
                attempts: 0,
                raw_response: None,
            },
        };

        self.dump_raw_reply(&failure);

        ExtractionOutcome::Failed(failure)
    }

    /// Best-effort diagnostic write of the last raw reply; never raises.
    fn dump_raw_reply(&self, failure: &ExtractionFailure) {
        let (Some(path), Some(raw)) = (&self.debug_dump, failure.raw_response.as_deref())
        else {
            return;
        };

        match std::fs::write(path, raw) {
            Ok(()) => debug!("saved raw reply to {}", path.display()),
            Err(e) => warn!("failed to persist raw reply to {}: {}", path.display(), e),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    use super::*;
    use invox_llm::ServiceError;

    /// Completion stand-in that plays back scripted replies.
    struct ScriptedService {
        replies: Mutex<VecDeque<Result<String, String>>>,
        calls: AtomicU32,
    }

    impl ScriptedService {
        fn new(replies: Vec<Result<&str, &str>>) -> Self {
            Self {
                replies: Mutex::new(
                    replies
                        .into_iter()
                        .map(|r| r.map(str::to_string).map_err(str::to_string))
                        .collect(),
                ),
                calls: AtomicU32::new(0),
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl CompletionService for ScriptedService {
        async fn complete(&self, _system: &str, _user: &str) -> invox_llm::Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = self.replies.lock().unwrap().pop_front();
            match next {
                Some(Ok(reply)) => Ok(reply),
                Some(Err(message)) => Err(ServiceError::Api {
                    status: 500,
                    body: message,
                }),
                None => Err(ServiceError::EmptyReply),
            }
        }
    }

    const GOOD_REPLY: &str = r#"{"invoice_number":"1001","vendor":{"name":"Acme"},"customer":{"name":"Bob"},"amounts":{"total":123.45},"line_items":[{"description":"Widget","quantity":1,"unit_price":123.45,"total_price":123.45}]}"#;

    #[tokio::test]
    async fn test_first_success_makes_exactly_one_call() {
        let service = ScriptedService::new(vec![Ok(GOOD_REPLY)]);
        let engine = StructuredExtractionEngine::new(service).with_max_retries(3);

        let outcome = engine.extract("INVOICE #1001").await;
        let ExtractionOutcome::Record(record) = outcome else {
            panic!("expected a record");
        };
        assert_eq!(record.invoice_number.as_deref(), Some("1001"));
        assert_eq!(engine.service.calls(), 1);
    }

    #[tokio::test]
    async fn test_malformed_replies_are_retried() {
        let service = ScriptedService::new(vec![
            Ok("I could not find any JSON worth returning."),
            Ok(GOOD_REPLY),
        ]);
        let engine = StructuredExtractionEngine::new(service).with_max_retries(3);

        let outcome = engine.extract("INVOICE #1001").await;
        assert!(matches!(outcome, ExtractionOutcome::Record(_)));
        assert_eq!(engine.service.calls(), 2);
    }

    #[tokio::test]
    async fn test_budget_exhaustion_returns_last_malformed_failure() {
        let service = ScriptedService::new(vec![
            Ok("nothing here"),
            Ok("still nothing"),
            Ok("last garbage"),
        ]);
        let engine = StructuredExtractionEngine::new(service).with_max_retries(3);

        let outcome = engine.extract("text").await;
        let ExtractionOutcome::Failed(failure) = outcome else {
            panic!("expected a failure");
        };
        assert_eq!(failure.reason, FailureReason::Malformed);
        assert_eq!(failure.attempts, 3);
        assert_eq!(failure.raw_response.as_deref(), Some("last garbage"));
        assert_eq!(engine.service.calls(), 3);
    }

    #[tokio::test]
    async fn test_service_errors_are_retried_then_surfaced() {
        let service = ScriptedService::new(vec![
            Err("rate limited"),
            Err("rate limited"),
            Err("rate limited"),
        ]);
        let engine = StructuredExtractionEngine::new(service).with_max_retries(3);

        let outcome = engine.extract("text").await;
        let ExtractionOutcome::Failed(failure) = outcome else {
            panic!("expected a failure");
        };
        assert_eq!(failure.reason, FailureReason::Service);
        assert!(failure.message.contains("rate limited"));
        assert_eq!(failure.attempts, 3);
        assert!(failure.raw_response.is_none());
    }

    #[tokio::test]
    async fn test_incomplete_record_is_still_a_success() {
        // Missing customer and line items: the engine must not burn more
        // attempts on it; completeness is the validator's concern.
        let service = ScriptedService::new(vec![
            Ok(r#"{"invoice_number":"1001","vendor":{"name":"Acme"}}"#),
            Ok(GOOD_REPLY),
        ]);
        let engine = StructuredExtractionEngine::new(service).with_max_retries(3);

        let outcome = engine.extract("text").await;
        let ExtractionOutcome::Record(record) = outcome else {
            panic!("expected a record");
        };
        assert!(!record.is_complete());
        assert_eq!(engine.service.calls(), 1);
    }

    #[tokio::test]
    async fn test_raw_reply_is_dumped_on_final_failure() {
        let dir = tempfile::tempdir().unwrap();
        let dump = dir.path().join("debug_failed_response.txt");

        let service = ScriptedService::new(vec![Ok("unsalvageable reply")]);
        let engine = StructuredExtractionEngine::new(service)
            .with_max_retries(1)
            .with_debug_dump(dump.clone());

        let outcome = engine.extract("text").await;
        assert!(matches!(outcome, ExtractionOutcome::Failed(_)));
        assert_eq!(std::fs::read_to_string(&dump).unwrap(), "unsalvageable reply");
    }

    #[tokio::test]
    async fn test_commentary_wrapped_reply_end_to_end() {
        let reply = format!("Sure! ```json\n{}\n```", GOOD_REPLY);
        let service = ScriptedService::new(vec![Ok(reply.as_str())]);
        let engine = StructuredExtractionEngine::new(service);

        let outcome = engine.extract("INVOICE #1001 ... TOTAL 123.45").await;
        let ExtractionOutcome::Record(record) = outcome else {
            panic!("expected a record");
        };
        assert_eq!(record.amounts.total.as_ref().unwrap().as_f64(), Some(123.45));
        assert_eq!(record.line_items.len(), 1);
        assert!(record.is_complete());
    }
}
