//! The generate → validate → confirm → publish pipeline.
//!
//! One linear pass: read a prompt, generate a candidate, show it to the
//! operator, and post it once they approve. Every failure becomes a
//! [`RunOutcome`] with its own exit code; nothing is retried here (the one
//! retry loop lives in the publisher).

use crate::generator::MessageGenerator;
use crate::publisher::{PublishError, StatusPublisher};
use anyhow::Result;
use std::io::{self, BufRead, Write};
use tracing::{error, info, warn};

/// Terminal state of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Published,
    Cancelled,
    EmptyPrompt,
    GenerationFailed,
    AuthFailed,
    LengthExceeded,
    RateLimited,
    PublishFailed,
}

impl RunOutcome {
    /// Exit code contract: 0 for a published post and for an operator
    /// cancellation; each failure class gets its own non-zero code.
    pub fn exit_code(self) -> u8 {
        match self {
            RunOutcome::Published | RunOutcome::Cancelled => 0,
            RunOutcome::EmptyPrompt => 2,
            RunOutcome::GenerationFailed => 3,
            RunOutcome::AuthFailed => 4,
            RunOutcome::LengthExceeded => 5,
            RunOutcome::RateLimited => 6,
            RunOutcome::PublishFailed => 7,
        }
    }
}

pub struct Pipeline {
    generator: Box<dyn MessageGenerator>,
    publisher: Box<dyn StatusPublisher>,
}

impl Pipeline {
    pub fn new(generator: Box<dyn MessageGenerator>, publisher: Box<dyn StatusPublisher>) -> Self {
        Self {
            generator,
            publisher,
        }
    }

    /// Runs the whole flow against stdin/stdout.
    pub async fn run(&self) -> Result<RunOutcome> {
        let stdin = io::stdin();
        let mut input = stdin.lock();
        let mut output = io::stdout();
        self.run_with_io(&mut input, &mut output).await
    }

    /// Runs prompt → generate → confirm → authenticate → publish over the
    /// given streams.
    ///
    /// Errors escape only for stream I/O failures; every pipeline failure is
    /// reported to the operator and becomes a [`RunOutcome`].
    pub async fn run_with_io<R: BufRead, W: Write>(
        &self,
        input: &mut R,
        output: &mut W,
    ) -> Result<RunOutcome> {
        write!(output, "Enter a prompt for your post: ")?;
        output.flush()?;

        let mut line = String::new();
        input.read_line(&mut line)?;
        let prompt = line.trim();

        if prompt.is_empty() {
            warn!("Empty prompt, nothing to generate");
            writeln!(output, "Prompt cannot be empty.")?;
            return Ok(RunOutcome::EmptyPrompt);
        }

        info!("Generating a candidate for: {prompt}");
        writeln!(output, "\nGenerating message...")?;
        let message = match self.generator.generate(prompt).await {
            Ok(message) => message,
            Err(e) => {
                error!("Generation failed: {e}");
                writeln!(output, "Failed to generate a message: {e}")?;
                return Ok(RunOutcome::GenerationFailed);
            }
        };

        writeln!(
            output,
            "\nGenerated message ({} characters):",
            message.char_count()
        )?;
        writeln!(output, "{message}\n")?;

        if !self.confirm(input, output)? {
            info!("Operator declined, nothing posted");
            writeln!(output, "Posting cancelled.")?;
            return Ok(RunOutcome::Cancelled);
        }

        let session = match self.publisher.authenticate().await {
            Ok(session) => session,
            Err(e) => {
                error!("Authentication failed: {e}");
                writeln!(output, "Authentication failed: {e}")?;
                return Ok(RunOutcome::AuthFailed);
            }
        };
        writeln!(output, "Authenticated as @{}.", session.username)?;

        match self.publisher.publish(&session, &message).await {
            Ok(()) => {
                info!("Run finished: published");
                writeln!(output, "✅ Message posted.")?;
                Ok(RunOutcome::Published)
            }
            Err(e @ PublishError::LengthExceeded(_)) => {
                warn!("Publish refused: {e}");
                writeln!(output, "Not posted: {e}")?;
                Ok(RunOutcome::LengthExceeded)
            }
            Err(e @ PublishError::RateLimited(_)) => {
                error!("Publish failed: {e}");
                writeln!(output, "Not posted: {e}")?;
                Ok(RunOutcome::RateLimited)
            }
            Err(e) => {
                error!("Publish failed: {e}");
                writeln!(output, "Not posted: {e}")?;
                Ok(RunOutcome::PublishFailed)
            }
        }
    }

    /// Asks for a y/n confirmation. Invalid input re-prompts; end of input
    /// counts as a decline.
    fn confirm<R: BufRead, W: Write>(&self, input: &mut R, output: &mut W) -> Result<bool> {
        loop {
            write!(output, "Post this message? (y/n): ")?;
            output.flush()?;

            let mut line = String::new();
            if input.read_line(&mut line)? == 0 {
                return Ok(false);
            }
            match line.trim().to_lowercase().as_str() {
                "y" | "yes" => return Ok(true),
                "n" | "no" => return Ok(false),
                _ => writeln!(output, "Please answer y or n.")?,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::{GeneratedMessage, GenerationError};
    use crate::publisher::{AuthError, AuthenticatedSession, fits_status_limit};
    use async_trait::async_trait;
    use std::io::Cursor;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubGenerator {
        calls: AtomicUsize,
        // None means the generation call fails.
        text: Option<String>,
    }

    impl StubGenerator {
        fn returning(text: &str) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                text: Some(text.to_string()),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                text: None,
            })
        }
    }

    #[async_trait]
    impl MessageGenerator for Arc<StubGenerator> {
        async fn generate(&self, _prompt: &str) -> Result<GeneratedMessage, GenerationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.text {
                Some(text) => Ok(GeneratedMessage::new(text.clone())),
                None => Err(GenerationError::Service("boom".to_string())),
            }
        }
    }

    enum PublishBehavior {
        Accept,
        RateLimit,
        Fail,
    }

    struct StubPublisher {
        auth_calls: AtomicUsize,
        publish_calls: AtomicUsize,
        reject_auth: bool,
        behavior: PublishBehavior,
    }

    impl StubPublisher {
        fn accepting() -> Arc<Self> {
            Arc::new(Self {
                auth_calls: AtomicUsize::new(0),
                publish_calls: AtomicUsize::new(0),
                reject_auth: false,
                behavior: PublishBehavior::Accept,
            })
        }

        fn rejecting_auth() -> Arc<Self> {
            Arc::new(Self {
                auth_calls: AtomicUsize::new(0),
                publish_calls: AtomicUsize::new(0),
                reject_auth: true,
                behavior: PublishBehavior::Accept,
            })
        }

        fn with_behavior(behavior: PublishBehavior) -> Arc<Self> {
            Arc::new(Self {
                auth_calls: AtomicUsize::new(0),
                publish_calls: AtomicUsize::new(0),
                reject_auth: false,
                behavior,
            })
        }
    }

    #[async_trait]
    impl StatusPublisher for Arc<StubPublisher> {
        async fn authenticate(&self) -> Result<AuthenticatedSession, AuthError> {
            self.auth_calls.fetch_add(1, Ordering::SeqCst);
            if self.reject_auth {
                return Err(AuthError::Rejected("HTTP 401".to_string()));
            }
            Ok(AuthenticatedSession {
                user_id: "12".to_string(),
                username: "operator".to_string(),
            })
        }

        async fn publish(
            &self,
            _session: &AuthenticatedSession,
            message: &GeneratedMessage,
        ) -> Result<(), PublishError> {
            if !fits_status_limit(message) {
                return Err(PublishError::LengthExceeded(message.char_count()));
            }
            self.publish_calls.fetch_add(1, Ordering::SeqCst);
            match self.behavior {
                PublishBehavior::Accept => Ok(()),
                PublishBehavior::RateLimit => Err(PublishError::RateLimited(3)),
                PublishBehavior::Fail => Err(PublishError::Service("HTTP 500".to_string())),
            }
        }
    }

    async fn run(
        generator: Arc<StubGenerator>,
        publisher: Arc<StubPublisher>,
        input: &str,
    ) -> (RunOutcome, String) {
        let pipeline = Pipeline::new(Box::new(generator), Box::new(publisher));
        let mut input = Cursor::new(input.as_bytes().to_vec());
        let mut output = Vec::new();
        let outcome = pipeline.run_with_io(&mut input, &mut output).await.unwrap();
        (outcome, String::from_utf8(output).unwrap())
    }

    #[tokio::test]
    async fn test_empty_prompt_stops_before_any_collaborator() {
        let generator = StubGenerator::returning("hello");
        let publisher = StubPublisher::accepting();

        let (outcome, output) = run(generator.clone(), publisher.clone(), "\n").await;

        assert_eq!(outcome, RunOutcome::EmptyPrompt);
        assert!(output.contains("Prompt cannot be empty"));
        assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
        assert_eq!(publisher.auth_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_whitespace_prompt_counts_as_empty() {
        let generator = StubGenerator::returning("hello");
        let publisher = StubPublisher::accepting();

        let (outcome, _) = run(generator.clone(), publisher, "   \n").await;

        assert_eq!(outcome, RunOutcome::EmptyPrompt);
        assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_confirmed_message_is_published_once() {
        let generator = StubGenerator::returning("Small steps add up.");
        let publisher = StubPublisher::accepting();

        let (outcome, output) = run(generator, publisher.clone(), "a thought\ny\n").await;

        assert_eq!(outcome, RunOutcome::Published);
        assert_eq!(outcome.exit_code(), 0);
        assert!(output.contains("Small steps add up."));
        assert!(output.contains("Message posted"));
        assert_eq!(publisher.auth_calls.load(Ordering::SeqCst), 1);
        assert_eq!(publisher.publish_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_decline_cancels_without_touching_the_publisher() {
        let generator = StubGenerator::returning("Small steps add up.");
        let publisher = StubPublisher::accepting();

        let (outcome, output) = run(generator, publisher.clone(), "a thought\nn\n").await;

        assert_eq!(outcome, RunOutcome::Cancelled);
        assert_eq!(outcome.exit_code(), 0);
        assert!(output.contains("Posting cancelled"));
        assert_eq!(publisher.auth_calls.load(Ordering::SeqCst), 0);
        assert_eq!(publisher.publish_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_end_of_input_at_confirmation_is_a_decline() {
        let generator = StubGenerator::returning("Small steps add up.");
        let publisher = StubPublisher::accepting();

        let (outcome, _) = run(generator, publisher.clone(), "a thought\n").await;

        assert_eq!(outcome, RunOutcome::Cancelled);
        assert_eq!(publisher.publish_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_invalid_confirmation_input_reprompts() {
        let generator = StubGenerator::returning("Small steps add up.");
        let publisher = StubPublisher::accepting();

        let (outcome, output) = run(generator, publisher, "a thought\nmaybe\nYES\n").await;

        assert_eq!(outcome, RunOutcome::Published);
        assert!(output.contains("Please answer y or n"));
    }

    #[tokio::test]
    async fn test_generation_failure_ends_the_run() {
        let generator = StubGenerator::failing();
        let publisher = StubPublisher::accepting();

        let (outcome, output) = run(generator, publisher.clone(), "a thought\n").await;

        assert_eq!(outcome, RunOutcome::GenerationFailed);
        assert_eq!(outcome.exit_code(), 3);
        assert!(output.contains("Failed to generate"));
        // Nothing to confirm, nothing published.
        assert!(!output.contains("Post this message?"));
        assert_eq!(publisher.auth_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_auth_failure_ends_the_run() {
        let generator = StubGenerator::returning("Small steps add up.");
        let publisher = StubPublisher::rejecting_auth();

        let (outcome, output) = run(generator, publisher.clone(), "a thought\ny\n").await;

        assert_eq!(outcome, RunOutcome::AuthFailed);
        assert_eq!(outcome.exit_code(), 4);
        assert!(output.contains("Authentication failed"));
        assert_eq!(publisher.publish_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_over_limit_generation_maps_to_length_outcome() {
        let generator = StubGenerator::returning(&"x".repeat(300));
        let publisher = StubPublisher::accepting();

        let (outcome, output) = run(generator, publisher.clone(), "a thought\ny\n").await;

        assert_eq!(outcome, RunOutcome::LengthExceeded);
        assert_eq!(outcome.exit_code(), 5);
        assert!(output.contains("280-character limit"));
        assert_eq!(publisher.publish_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_rate_limit_exhaustion_maps_to_its_own_outcome() {
        let generator = StubGenerator::returning("Small steps add up.");
        let publisher = StubPublisher::with_behavior(PublishBehavior::RateLimit);

        let (outcome, output) = run(generator, publisher, "a thought\ny\n").await;

        assert_eq!(outcome, RunOutcome::RateLimited);
        assert_eq!(outcome.exit_code(), 6);
        assert!(output.contains("rate limited"));
    }

    #[tokio::test]
    async fn test_service_failure_maps_to_publish_failed() {
        let generator = StubGenerator::returning("Small steps add up.");
        let publisher = StubPublisher::with_behavior(PublishBehavior::Fail);

        let (outcome, _) = run(generator, publisher, "a thought\ny\n").await;

        assert_eq!(outcome, RunOutcome::PublishFailed);
        assert_eq!(outcome.exit_code(), 7);
    }

    #[test]
    fn test_failure_exit_codes_are_distinct() {
        let outcomes = [
            RunOutcome::EmptyPrompt,
            RunOutcome::GenerationFailed,
            RunOutcome::AuthFailed,
            RunOutcome::LengthExceeded,
            RunOutcome::RateLimited,
            RunOutcome::PublishFailed,
        ];
        let mut codes: Vec<u8> = outcomes.iter().map(|o| o.exit_code()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), outcomes.len());
        assert!(!codes.contains(&0));
    }
}
