//! The trend → prompt → image → caption → post chain.

use std::path::PathBuf;

use tracing::{error, info};

use crate::config::InstagramCredentials;
use crate::content::{expand_prompt, generate_caption, generate_image, image_path_for};
use crate::error::{PipelineError, Stage, StageFailure};
use crate::gemini::ContentGenerator;
use crate::instagram::{PublishedMedia, Publisher, upload_to_instagram};
use crate::trends::TopicSource;

/// Everything produced by a successful run.
#[derive(Clone, Debug)]
pub struct PipelineReport {
    /// Topic the run was about
    pub topic: String,
    /// Expanded image prompt
    pub image_prompt: String,
    /// Where the image was written
    pub image_path: PathBuf,
    /// Caption that was posted
    pub caption: String,
    /// The resulting post
    pub media: PublishedMedia,
}

/// One pass through the chain, with its collaborators injected.
pub struct Pipeline<G, P> {
    generator: G,
    publisher: P,
    credentials: InstagramCredentials,
    topics: TopicSource,
    output_dir: PathBuf,
}

fn halt<E: Into<StageFailure>>(stage: Stage) -> impl FnOnce(E) -> PipelineError {
    move |err| {
        // the stage itself already logged the cause
        error!("Pipeline halted at {stage}");
        PipelineError::Stage {
            stage,
            source: err.into(),
        }
    }
}

impl<G: ContentGenerator, P: Publisher> Pipeline<G, P> {
    /// Builds a pipeline around the given clients.
    pub fn new(
        generator: G,
        publisher: P,
        credentials: InstagramCredentials,
        topics: TopicSource,
        output_dir: PathBuf,
    ) -> Self {
        Self {
            generator,
            publisher,
            credentials,
            topics,
            output_dir,
        }
    }

    /// Runs every stage in order, stopping at the first failure. Nothing is rolled back.
    pub async fn run(&self) -> Result<PipelineReport, PipelineError> {
        std::fs::create_dir_all(&self.output_dir).map_err(|source| {
            let err = PipelineError::OutputDir {
                path: self.output_dir.clone(),
                source,
            };
            error!("{err}");
            err
        })?;

        let topic = self
            .topics
            .select(&mut rand::rng())
            .map_err(halt(Stage::SelectTrend))?;

        let image_prompt = expand_prompt(&self.generator, &topic)
            .await
            .map_err(halt(Stage::ExpandPrompt))?;

        let target = image_path_for(&self.output_dir, &topic);
        let image_path = generate_image(&self.generator, &image_prompt, &target)
            .await
            .map_err(halt(Stage::GenerateImage))?;

        let caption = generate_caption(&self.generator, &topic)
            .await
            .map_err(halt(Stage::GenerateCaption))?;

        let media = upload_to_instagram(&self.publisher, &self.credentials, &image_path, &caption)
            .await
            .map_err(halt(Stage::Publish))?;

        info!("Trend-to-Gram process completed successfully!");
        Ok(PipelineReport {
            topic,
            image_prompt,
            image_path,
            caption,
            media,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::tests::{candidate, image_part, png_base64, text_part};
    use crate::error::{GenerationError, PublishError, TrendError};
    use crate::gemini::GenerateContentResponse;
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::{Mutex, OnceLock};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Which upstream call should fail, if any.
    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    enum FailAt {
        Nothing,
        Prompt,
        Image,
        NoImage,
        Caption,
        Login,
    }

    struct MockGenerator {
        fail_at: FailAt,
        error_body: String,
        prompt_calls: AtomicUsize,
        image_calls: AtomicUsize,
        caption_calls: AtomicUsize,
    }

    impl MockGenerator {
        fn new(fail_at: FailAt) -> Self {
            Self {
                fail_at,
                error_body: "quota exceeded".to_string(),
                prompt_calls: AtomicUsize::new(0),
                image_calls: AtomicUsize::new(0),
                caption_calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> (usize, usize, usize) {
            (
                self.prompt_calls.load(Ordering::SeqCst),
                self.image_calls.load(Ordering::SeqCst),
                self.caption_calls.load(Ordering::SeqCst),
            )
        }

        fn quota_error(&self) -> GenerationError {
            GenerationError::Api {
                status: reqwest::StatusCode::TOO_MANY_REQUESTS,
                body: self.error_body.clone(),
            }
        }
    }

    #[async_trait]
    impl ContentGenerator for MockGenerator {
        async fn generate_text(&self, prompt: &str) -> Result<String, GenerationError> {
            if prompt.contains("hashtags") {
                self.caption_calls.fetch_add(1, Ordering::SeqCst);
                if self.fail_at == FailAt::Caption {
                    return Err(self.quota_error());
                }
                Ok("Crowned in starlight ✨ #lion".to_string())
            } else {
                self.prompt_calls.fetch_add(1, Ordering::SeqCst);
                if self.fail_at == FailAt::Prompt {
                    return Err(self.quota_error());
                }
                Ok("A cinematic lion wearing a crown of stars".to_string())
            }
        }

        async fn generate_image(
            &self,
            _prompt: &str,
        ) -> Result<GenerateContentResponse, GenerationError> {
            self.image_calls.fetch_add(1, Ordering::SeqCst);
            match self.fail_at {
                FailAt::Image => Err(self.quota_error()),
                FailAt::NoImage => Ok(GenerateContentResponse {
                    candidates: vec![candidate(vec![text_part("no picture for you")])],
                    prompt_feedback: None,
                }),
                _ => Ok(GenerateContentResponse {
                    candidates: vec![candidate(vec![
                        text_part("here you go"),
                        image_part(&png_base64()),
                    ])],
                    prompt_feedback: None,
                }),
            }
        }
    }

    struct MockPublisher {
        fail: bool,
        calls: AtomicUsize,
        last_post: Mutex<Option<(PathBuf, String)>>,
    }

    impl MockPublisher {
        fn new(fail: bool) -> Self {
            Self {
                fail,
                calls: AtomicUsize::new(0),
                last_post: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl Publisher for MockPublisher {
        async fn publish(
            &self,
            _credentials: &InstagramCredentials,
            image_path: &Path,
            caption: &str,
        ) -> Result<PublishedMedia, PublishError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Ok(mut last) = self.last_post.lock() {
                *last = Some((image_path.to_path_buf(), caption.to_string()));
            }
            if self.fail {
                return Err(PublishError::LoginRequired("login_required".to_string()));
            }
            Ok(PublishedMedia {
                id: "1".to_string(),
                code: Some("abc".to_string()),
            })
        }
    }

    /// Keeps every log record emitted while the tests run.
    struct CapturingLogger {
        records: Mutex<Vec<String>>,
    }

    impl log::Log for CapturingLogger {
        fn enabled(&self, _metadata: &log::Metadata<'_>) -> bool {
            true
        }

        fn log(&self, record: &log::Record<'_>) {
            if let Ok(mut records) = self.records.lock() {
                records.push(record.args().to_string());
            }
        }

        fn flush(&self) {}
    }

    fn captured_logs() -> &'static CapturingLogger {
        static LOGGER: OnceLock<&'static CapturingLogger> = OnceLock::new();
        LOGGER.get_or_init(|| {
            let logger: &'static CapturingLogger = Box::leak(Box::new(CapturingLogger {
                records: Mutex::new(Vec::new()),
            }));
            log::set_logger(logger).expect("no other logger in unit tests");
            log::set_max_level(log::LevelFilter::Trace);
            logger
        })
    }

    fn credentials() -> InstagramCredentials {
        InstagramCredentials {
            username: "user".to_string(),
            password: "pass".to_string(),
        }
    }

    fn pipeline(
        fail_at: FailAt,
        topics: TopicSource,
        output_dir: &Path,
    ) -> Pipeline<MockGenerator, MockPublisher> {
        Pipeline::new(
            MockGenerator::new(fail_at),
            MockPublisher::new(fail_at == FailAt::Login),
            credentials(),
            topics,
            output_dir.to_path_buf(),
        )
    }

    fn lion() -> TopicSource {
        TopicSource::Fixed("A majestic lion with a crown made of starlight".to_string())
    }

    #[tokio::test]
    async fn happy_path_reaches_done() {
        let dir = tempfile::tempdir().expect("temp dir");
        let output_dir = dir.path().join("generated_images");
        let pipeline = pipeline(FailAt::Nothing, lion(), &output_dir);

        let report = pipeline.run().await.expect("pipeline run");

        assert_eq!(report.topic, "A majestic lion with a crown made of starlight");
        assert_eq!(
            report.image_path,
            output_dir.join("A_majestic_lion_with_a_crown_made_of_starlight.jpg")
        );
        assert!(report.image_path.exists());
        assert_eq!(report.media.code.as_deref(), Some("abc"));
        assert_eq!(pipeline.generator.calls(), (1, 1, 1));
        assert_eq!(pipeline.publisher.calls.load(Ordering::SeqCst), 1);

        let last = pipeline
            .publisher
            .last_post
            .lock()
            .expect("lock")
            .clone()
            .expect("published");
        assert_eq!(last.0, report.image_path);
        assert_eq!(last.1, report.caption);
    }

    #[tokio::test]
    async fn topic_comes_from_trends_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let trends = dir.path().join("trends.csv");
        std::fs::write(&trends, "trend\nNeon koi pond\n").expect("write trends");
        let pipeline = pipeline(
            FailAt::Nothing,
            TopicSource::File(trends),
            &dir.path().join("out"),
        );

        let report = pipeline.run().await.expect("pipeline run");
        assert_eq!(report.topic, "Neon koi pond");
        assert!(report.image_path.ends_with("Neon_koi_pond.jpg"));
    }

    #[tokio::test]
    async fn empty_trends_halt_before_any_call() {
        let dir = tempfile::tempdir().expect("temp dir");
        let trends = dir.path().join("trends.csv");
        std::fs::write(&trends, "trend\n").expect("write trends");
        let output_dir = dir.path().join("out");
        let pipeline = pipeline(FailAt::Nothing, TopicSource::File(trends), &output_dir);

        let err = pipeline.run().await.expect_err("halt");
        assert_eq!(err.stage(), Some(Stage::SelectTrend));
        assert!(matches!(
            err,
            PipelineError::Stage {
                source: StageFailure::Trend(TrendError::Empty(_)),
                ..
            }
        ));
        assert_eq!(pipeline.generator.calls(), (0, 0, 0));
        assert_eq!(pipeline.publisher.calls.load(Ordering::SeqCst), 0);
        // output dir is created before the chain starts
        assert!(output_dir.is_dir());
    }

    #[tokio::test]
    async fn halts_at_the_failing_stage_only() {
        let cases = [
            (FailAt::Prompt, Stage::ExpandPrompt, (1, 0, 0), 0),
            (FailAt::Image, Stage::GenerateImage, (1, 1, 0), 0),
            (FailAt::NoImage, Stage::GenerateImage, (1, 1, 0), 0),
            (FailAt::Caption, Stage::GenerateCaption, (1, 1, 1), 0),
            (FailAt::Login, Stage::Publish, (1, 1, 1), 1),
        ];

        for (fail_at, stage, generator_calls, publisher_calls) in cases {
            let dir = tempfile::tempdir().expect("temp dir");
            let pipeline = pipeline(fail_at, lion(), dir.path());

            let err = pipeline.run().await.expect_err("halt");
            assert_eq!(err.stage(), Some(stage), "{fail_at:?}");
            assert_eq!(pipeline.generator.calls(), generator_calls, "{fail_at:?}");
            assert_eq!(
                pipeline.publisher.calls.load(Ordering::SeqCst),
                publisher_calls,
                "{fail_at:?}"
            );
        }
    }

    #[tokio::test]
    async fn missing_image_data_is_distinct() {
        let dir = tempfile::tempdir().expect("temp dir");
        let pipeline = pipeline(FailAt::NoImage, lion(), dir.path());

        let err = pipeline.run().await.expect_err("halt");
        assert!(matches!(
            err,
            PipelineError::Stage {
                stage: Stage::GenerateImage,
                source: StageFailure::Generation(GenerationError::NoImageData),
            }
        ));
    }

    #[tokio::test]
    async fn image_survives_a_caption_failure() {
        let dir = tempfile::tempdir().expect("temp dir");
        let pipeline = pipeline(FailAt::Caption, lion(), dir.path());

        pipeline.run().await.expect_err("halt");
        assert!(
            dir.path()
                .join("A_majestic_lion_with_a_crown_made_of_starlight.jpg")
                .exists()
        );
    }

    #[tokio::test]
    async fn unusable_output_dir_halts_first() {
        let dir = tempfile::tempdir().expect("temp dir");
        let blocker = dir.path().join("not_a_dir");
        std::fs::write(&blocker, b"file").expect("write blocker");
        let pipeline = pipeline(FailAt::Nothing, lion(), &blocker.join("images"));

        let err = pipeline.run().await.expect_err("halt");
        assert!(matches!(err, PipelineError::OutputDir { .. }));
        assert_eq!(err.stage(), None);
        assert_eq!(pipeline.generator.calls(), (0, 0, 0));
    }

    #[tokio::test]
    async fn failure_cause_is_logged_once() {
        let logs = captured_logs();
        let marker = "caption-quota-7f3a9c";
        let dir = tempfile::tempdir().expect("temp dir");
        let mut pipeline = pipeline(FailAt::Caption, lion(), dir.path());
        pipeline.generator.error_body = marker.to_string();

        let err = pipeline.run().await.expect_err("halt");
        assert_eq!(err.stage(), Some(Stage::GenerateCaption));

        let records = logs.records.lock().expect("lock").clone();
        let mentions = records.iter().filter(|r| r.contains(marker)).count();
        assert_eq!(mentions, 1, "{records:#?}");
        assert!(
            records
                .iter()
                .any(|r| r == "Pipeline halted at generate caption"),
            "{records:#?}"
        );
    }
}
