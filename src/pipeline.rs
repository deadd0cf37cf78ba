//! The analysis pipeline: summary, table of contents, keywords, delivery.
//!
//! Stages run strictly in order. Progress is reported through a callback so
//! front ends can print it or forward it over a channel.

use crate::agent::{self, AgentError};
use crate::config::Config;
use crate::llm::{ChatClient, LlmError};
use crate::mailer;
use crate::report::{self, Report, Sections};
use std::path::PathBuf;
use std::time::Instant;
use thiserror::Error;

/// Number of progress steps in a run
pub const TOTAL_STEPS: u8 = 4;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("article text is empty")]
    EmptyArticle,
    #[error("failed to create chat client: {0}")]
    Client(#[from] LlmError),
    #[error("summary generation failed: {0}")]
    Summary(#[source] AgentError),
}

/// One discrete step of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Summary,
    TableOfContents,
    Keywords,
    Delivery,
}

impl Stage {
    /// 1-based position of the stage
    pub fn step(self) -> u8 {
        match self {
            Stage::Summary => 1,
            Stage::TableOfContents => 2,
            Stage::Keywords => 3,
            Stage::Delivery => 4,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Stage::Summary => "Generating summary...",
            Stage::TableOfContents => "Generating table of contents...",
            Stage::Keywords => "Extracting keywords...",
            Stage::Delivery => "Sending email and preparing report...",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    pub stage: Stage,
    pub step: u8,
    pub total: u8,
    pub message: String,
}

impl ProgressEvent {
    fn starting(stage: Stage) -> Self {
        Self {
            stage,
            step: stage.step(),
            total: TOTAL_STEPS,
            message: format!("Step {}/{}: {}", stage.step(), TOTAL_STEPS, stage.label()),
        }
    }

    /// Fraction of the run completed once this step starts, in [0, 1]
    pub fn ratio(&self) -> f64 {
        f64::from(self.step) / f64::from(self.total)
    }
}

/// What happened to the email
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    /// Email is not configured, or was disabled for this run
    Skipped,
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct Outcome {
    pub report: Report,
    pub delivery: Delivery,
    pub saved_to: Option<PathBuf>,
    /// Why writing the report file failed, if it did
    pub save_error: Option<String>,
}

/// Runs the analysis for one article at a time
#[derive(Debug, Clone)]
pub struct Pipeline {
    client: ChatClient,
    config: Config,
    email_enabled: bool,
}

impl Pipeline {
    pub fn new(config: Config) -> Result<Self, PipelineError> {
        let client = ChatClient::new(&config.llm)?;
        Ok(Self {
            client,
            config,
            email_enabled: true,
        })
    }

    /// Skip email delivery even when it is configured
    pub fn without_email(mut self) -> Self {
        self.email_enabled = false;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run every stage for `article`, reporting each step through `on_progress`
    pub async fn run(
        &self,
        article: &str,
        mut on_progress: impl FnMut(ProgressEvent),
    ) -> Result<Outcome, PipelineError> {
        if article.trim().is_empty() {
            return Err(PipelineError::EmptyArticle);
        }

        let started = Instant::now();
        let generated_at = chrono::Local::now().naive_local();
        let settings = &self.config.pipeline;
        let mut sections = Sections::default();

        on_progress(ProgressEvent::starting(Stage::Summary));
        sections.summary = match agent::gen_summary(&self.client, article).await {
            Ok(summary) => Some(summary),
            Err(e) if settings.summary_required => return Err(PipelineError::Summary(e)),
            Err(e) => {
                tracing::warn!(error = %e, "summary unavailable");
                None
            }
        };

        on_progress(ProgressEvent::starting(Stage::TableOfContents));
        sections.toc = agent::generate_toc(&self.client, article)
            .await
            .map_err(|e| tracing::warn!(error = %e, "failed to generate table of contents"))
            .ok();

        on_progress(ProgressEvent::starting(Stage::Keywords));
        sections.keywords = agent::extract_keywords(&self.client, article, settings.keyword_count)
            .await
            .map_err(|e| tracing::warn!(error = %e, "failed to extract keywords"))
            .ok();

        on_progress(ProgressEvent::starting(Stage::Delivery));
        let report = report::assemble(&sections, generated_at, started.elapsed());
        let delivery = self.deliver(&report).await;

        let (saved_to, save_error) = match &settings.output {
            Some(path) => match report.write_to(path) {
                Ok(()) => {
                    tracing::info!(path = %path.display(), "report saved");
                    (Some(path.clone()), None)
                }
                Err(e) => {
                    tracing::error!(path = %path.display(), error = %e, "failed to save report");
                    (None, Some(format!("failed to save report to {}: {}", path.display(), e)))
                }
            },
            None => (None, None),
        };

        Ok(Outcome {
            report,
            delivery,
            saved_to,
            save_error,
        })
    }

    async fn deliver(&self, report: &Report) -> Delivery {
        if !self.email_enabled {
            return Delivery::Skipped;
        }
        let Some(settings) = self.config.mail_settings() else {
            tracing::info!("email not configured, skipping delivery");
            return Delivery::Skipped;
        };

        match mailer::send_report(&settings, &self.config.email.subject, report.as_str()).await {
            Ok(()) => Delivery::Sent,
            Err(e) => {
                tracing::error!(error = %e, "failed to send email");
                Delivery::Failed(e.to_string())
            }
        }
    }
}
