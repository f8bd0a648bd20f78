//! One end-to-end worker run.
//!
//! topic → story → narration → assembly → publish → history.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::Local;
use tracing::{warn, Instrument};

use reel_clients::{render_prompt, Publisher, SpeechSynthesizer, StoryGenerator, Topic, TopicCatalog};
use reel_media::{AssemblyOutcome, AssemblyRequest, MediaTool, StartPolicy, Transcriber, VideoAssembler};
use reel_models::{RunId, Story};

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::history::append_history;
use crate::logging::{RunLogger, RunPhase};

/// What a completed run produced.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: RunId,
    pub topic: String,
    pub story: Story,
    pub outcome: AssemblyOutcome,
    /// Remote id when the video was published
    pub video_id: Option<String>,
    pub elapsed: Duration,
}

/// Drives a full run over the story, speech and publishing clients.
pub struct StoryRunner<M, S> {
    generator: Box<dyn StoryGenerator>,
    synthesizer: Box<dyn SpeechSynthesizer>,
    publisher: Option<Box<dyn Publisher>>,
    assembler: VideoAssembler<M, S>,
    catalog: TopicCatalog,
    prompt_template: String,
    config: WorkerConfig,
}

impl<M, S> StoryRunner<M, S>
where
    M: MediaTool,
    S: Transcriber,
{
    pub fn new(
        generator: Box<dyn StoryGenerator>,
        synthesizer: Box<dyn SpeechSynthesizer>,
        assembler: VideoAssembler<M, S>,
        catalog: TopicCatalog,
        prompt_template: impl Into<String>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            generator,
            synthesizer,
            publisher: None,
            assembler,
            catalog,
            prompt_template: prompt_template.into(),
            config,
        }
    }

    pub fn with_publisher(mut self, publisher: Box<dyn Publisher>) -> Self {
        self.publisher = Some(publisher);
        self
    }

    pub fn assembler(&self) -> &VideoAssembler<M, S> {
        &self.assembler
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Run once, about `topic` if given or a random catalog topic otherwise.
    pub async fn run(&self, topic: Option<&str>) -> WorkerResult<RunReport> {
        let run_id = RunId::new();
        let logger = RunLogger::new(&run_id);
        let started = Instant::now();

        let result = self
            .execute(&run_id, &logger, topic, started)
            .instrument(logger.span())
            .await;

        let status = if result.is_ok() { "success" } else { "failure" };
        metrics::counter!("storyreel_runs_total", "status" => status).increment(1);
        metrics::histogram!("storyreel_run_duration_seconds").record(started.elapsed().as_secs_f64());

        if let Err(e) = &result {
            logger.failed(e);
        }
        result
    }

    fn pick_topic(&self, name: Option<&str>) -> WorkerResult<&Topic> {
        match name {
            Some(name) => self
                .catalog
                .get(name)
                .ok_or_else(|| WorkerError::config_error(format!("unknown topic: {}", name))),
            None => self
                .catalog
                .choose()
                .ok_or_else(|| WorkerError::config_error("topic catalog is empty")),
        }
    }

    async fn execute(
        &self,
        run_id: &RunId,
        logger: &RunLogger,
        topic: Option<&str>,
        started: Instant,
    ) -> WorkerResult<RunReport> {
        logger.enter_phase(RunPhase::Topic);
        let topic = self.pick_topic(topic)?;
        logger.set_topic(&topic.name);

        logger.enter_phase(RunPhase::Story);
        let prompt = render_prompt(&self.prompt_template, &topic.name);
        let story = self.generator.generate_story(&prompt).await?;
        logger.progress(&format!("story '{}' ({} chars)", story.title, story.body.len()));

        let background = self.config.choose_background()?.to_path_buf();
        let narration = self.narration_path(run_id);

        let assembled = self.narrate_and_assemble(logger, &story, &narration, background).await;
        if let Err(e) = tokio::fs::remove_file(&narration).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                logger.warning(&format!("failed to remove {}: {}", narration.display(), e));
            }
        }
        let outcome = assembled?;
        logger.progress(&format!(
            "assembled {} ({:.1}s)",
            outcome.output.display(),
            outcome.duration
        ));

        let video_id = match (&self.publisher, self.config.upload) {
            (Some(publisher), true) => {
                logger.enter_phase(RunPhase::Publish);
                let metadata = topic.metadata(&story.title, self.config.privacy);
                let id = publisher.publish(&outcome.output, &metadata).await?;
                logger.progress(&format!("published as {}", id));
                Some(id)
            }
            (None, true) => {
                logger.warning("no publisher configured, skipping upload");
                None
            }
            (_, false) => None,
        };

        logger.enter_phase(RunPhase::History);
        let elapsed = started.elapsed();
        if let Err(e) = append_history(&self.config.history_file, Local::now(), elapsed).await {
            warn!(
                path = %self.config.history_file.display(),
                "Failed to append run history: {}", e
            );
        }
        logger.completed();

        Ok(RunReport {
            run_id: run_id.clone(),
            topic: topic.name.clone(),
            story,
            outcome,
            video_id,
            elapsed,
        })
    }

    async fn narrate_and_assemble(
        &self,
        logger: &RunLogger,
        story: &Story,
        narration: &Path,
        background: PathBuf,
    ) -> WorkerResult<AssemblyOutcome> {
        logger.enter_phase(RunPhase::Narration);
        self.synthesizer
            .synthesize(&story.body, &self.config.voice, narration)
            .await?;

        logger.enter_phase(RunPhase::Assembly);

        let request = AssemblyRequest {
            background,
            narration: narration.to_path_buf(),
            title: Some(story.title.clone()),
            output: self.config.output.clone(),
            start: if self.config.random_start {
                StartPolicy::Random
            } else {
                StartPolicy::Beginning
            },
        };
        Ok(self.assembler.assemble(&request).await?)
    }

    fn narration_path(&self, run_id: &RunId) -> PathBuf {
        self.config
            .assembly
            .work_root
            .join(format!("narration-{}.wav", run_id))
    }
}
