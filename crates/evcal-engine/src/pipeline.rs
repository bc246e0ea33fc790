//! Stage orchestration: collect, process, integrate, publish.
//!
//! Stages hand data to each other only through snapshot files, so any stage
//! can be run on its own against what earlier runs left behind.

use crate::collect::credentials::{ChallengeResponder, Credentials};
use crate::collect::{CollectError, CollectSettings, TargetCollector};
use crate::config::EvcalConfig;
use crate::config::schema::Target;
use crate::integrate::Integrator;
use crate::process::Processor;
use crate::process::extractor::EventExtractor;
use crate::process::url_expander::UrlExpander;
use crate::process::validator::SchemaValidator;
use crate::publish::{PublishError, Publisher};
use crate::session::SessionLauncher;
use crate::storage::{
    INTEGRATED_PREFIX, RAW_PREFIX, SnapshotStore, StorageError, VALIDATED_PREFIX,
};
use chrono::{Local, NaiveDateTime};
use evcal_common::event::EventRecord;
use evcal_common::record::RawRecord;
use futures::future::join_all;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("No scraping targets configured")]
    NoTargets,

    #[error("All {0} scraping targets failed")]
    AllTargetsFailed(usize),

    #[error(transparent)]
    Collect(#[from] CollectError),

    #[error("Invalid extraction rules: {0}")]
    Rules(#[from] regex::Error),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Publish(#[from] PublishError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Collect,
    Process,
    Integrate,
    Publish,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Stage::Collect => "collect",
            Stage::Process => "process",
            Stage::Integrate => "integrate",
            Stage::Publish => "publish",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    Collect,
    Process,
    Integrate,
    Publish,
    #[default]
    All,
}

impl Mode {
    pub fn stages(&self) -> &'static [Stage] {
        match self {
            Mode::Collect => &[Stage::Collect],
            Mode::Process => &[Stage::Process],
            Mode::Integrate => &[Stage::Integrate],
            Mode::Publish => &[Stage::Publish],
            Mode::All => &[
                Stage::Collect,
                Stage::Process,
                Stage::Integrate,
                Stage::Publish,
            ],
        }
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "collect" => Ok(Mode::Collect),
            "process" => Ok(Mode::Process),
            "integrate" => Ok(Mode::Integrate),
            "publish" => Ok(Mode::Publish),
            "all" => Ok(Mode::All),
            other => Err(format!("unknown mode '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StageOutcome {
    /// Stage ran and produced this many items.
    Completed(usize),
    /// Stage ran but had nothing to work with or produced nothing.
    Empty,
    Failed(String),
    /// Not run because an earlier stage failed or came up empty.
    Skipped,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StageReport {
    pub stage: Stage,
    pub outcome: StageOutcome,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunReport {
    pub stages: Vec<StageReport>,
}

impl RunReport {
    pub fn outcome(&self, stage: Stage) -> Option<&StageOutcome> {
        self.stages
            .iter()
            .find(|r| r.stage == stage)
            .map(|r| &r.outcome)
    }

    /// True when something failed and nothing ran to completion.
    pub fn failed(&self) -> bool {
        let any_failed = self
            .stages
            .iter()
            .any(|r| matches!(r.outcome, StageOutcome::Failed(_)));
        let any_ran = self
            .stages
            .iter()
            .any(|r| matches!(r.outcome, StageOutcome::Completed(_) | StageOutcome::Empty));
        any_failed && !any_ran
    }
}

pub struct Pipeline {
    config: EvcalConfig,
    launcher: Box<dyn SessionLauncher>,
    responder: Box<dyn ChallengeResponder>,
    reference_time: Option<NaiveDateTime>,
}

impl Pipeline {
    pub fn new(
        config: EvcalConfig,
        launcher: Box<dyn SessionLauncher>,
        responder: Box<dyn ChallengeResponder>,
    ) -> Self {
        Self {
            config,
            launcher,
            responder,
            reference_time: None,
        }
    }

    /// Pin "now" for date inference and recurrence expansion.
    pub fn with_reference_time(mut self, now: NaiveDateTime) -> Self {
        self.reference_time = Some(now);
        self
    }

    fn now(&self) -> NaiveDateTime {
        self.reference_time
            .unwrap_or_else(|| Local::now().naive_local())
    }

    pub async fn run(&self, mode: Mode) -> RunReport {
        info!("Running pipeline in {:?} mode", mode);
        let mut report = RunReport::default();
        let mut blocked = false;

        for &stage in mode.stages() {
            if blocked {
                report.stages.push(StageReport {
                    stage,
                    outcome: StageOutcome::Skipped,
                });
                continue;
            }

            info!("Stage {} started", stage);
            let result = match stage {
                Stage::Collect => self.collect().await,
                Stage::Process => self.process().await,
                Stage::Integrate => self.integrate().await,
                Stage::Publish => self.publish().await,
            };
            let outcome = match result {
                Ok(0) => {
                    warn!("Stage {} produced nothing; skipping later stages", stage);
                    blocked = true;
                    StageOutcome::Empty
                }
                Ok(count) => {
                    info!("Stage {} completed with {} items", stage, count);
                    StageOutcome::Completed(count)
                }
                Err(e) => {
                    warn!("Stage {} failed: {}; skipping later stages", stage, e);
                    blocked = true;
                    StageOutcome::Failed(e.to_string())
                }
            };
            report.stages.push(StageReport { stage, outcome });
        }

        info!("Pipeline finished: {:?}", report);
        report
    }

    pub async fn collect(&self) -> Result<usize, PipelineError> {
        if self.config.targets.is_empty() {
            return Err(PipelineError::NoTargets);
        }

        let credentials = if self.config.scraping.skip_login {
            None
        } else {
            Some(
                Credentials::resolve(&self.config.credentials, self.responder.as_ref())
                    .await
                    .ok_or(CollectError::MissingCredentials)?,
            )
        };

        let settings = CollectSettings::from_config(&self.config);
        let collector = TargetCollector::new(&settings, self.responder.as_ref());
        let (searches, lists): (Vec<&Target>, Vec<&Target>) = self
            .config
            .targets
            .iter()
            .partition(|t| matches!(t, Target::Search { .. }));

        // Searches fan out on independent sessions; lists follow once they are done.
        let mut results = join_all(searches.iter().map(|target| {
            collector.collect(self.launcher.as_ref(), target, credentials.as_ref())
        }))
        .await;
        results.extend(
            join_all(lists.iter().map(|target| {
                collector.collect(self.launcher.as_ref(), target, credentials.as_ref())
            }))
            .await,
        );

        let targets: Vec<&Target> = searches.into_iter().chain(lists).collect();
        let mut records: Vec<RawRecord> = Vec::new();
        let mut failures = 0;
        for (target, result) in targets.iter().zip(results) {
            match result {
                Ok(batch) => records.extend(batch),
                Err(e) => {
                    failures += 1;
                    error!("Target '{}' failed: {}", target.label(), e);
                }
            }
        }
        if failures == targets.len() {
            return Err(PipelineError::AllTargetsFailed(failures));
        }

        if records.is_empty() {
            return Ok(0);
        }
        SnapshotStore::new(&self.config.paths.raw_dir)
            .save(RAW_PREFIX, &records)
            .await?;
        Ok(records.len())
    }

    pub async fn process(&self) -> Result<usize, PipelineError> {
        let records: Vec<RawRecord> = SnapshotStore::new(&self.config.paths.raw_dir)
            .load_all(RAW_PREFIX)
            .await?;
        if records.is_empty() {
            warn!("No raw data to process");
            return Ok(0);
        }

        let extractor = EventExtractor::new(self.config.extraction.clone())?;
        let validator = SchemaValidator::new(self.config.schema.clone());
        let expander = if self.config.url_expansion.enabled {
            match UrlExpander::new(&self.config.url_expansion) {
                Ok(expander) => Some(expander),
                Err(e) => {
                    warn!("URL expansion disabled: {}", e);
                    None
                }
            }
        } else {
            None
        };

        let outcome = Processor::new(extractor, validator, expander)
            .process(&records, self.now().date())
            .await;
        if outcome.valid.is_empty() {
            return Ok(0);
        }
        SnapshotStore::new(&self.config.paths.validated_dir)
            .save(VALIDATED_PREFIX, &outcome.valid)
            .await?;
        Ok(outcome.valid.len())
    }

    pub async fn integrate(&self) -> Result<usize, PipelineError> {
        let events: Vec<EventRecord> = SnapshotStore::new(&self.config.paths.validated_dir)
            .load_all(VALIDATED_PREFIX)
            .await?;
        if events.is_empty() {
            warn!("No validated events to integrate");
            return Ok(0);
        }

        let integrated = Integrator::new(self.config.dedup.clone(), self.config.recurrence.clone())
            .integrate(events, self.now());
        SnapshotStore::new(&self.config.paths.integrated_dir)
            .save(INTEGRATED_PREFIX, &integrated)
            .await?;
        Ok(integrated.len())
    }

    pub async fn publish(&self) -> Result<usize, PipelineError> {
        // Each integrated snapshot already covers every validated event.
        let events: Vec<EventRecord> = SnapshotStore::new(&self.config.paths.integrated_dir)
            .load_latest(INTEGRATED_PREFIX)
            .await?;
        if events.is_empty() {
            warn!("No integrated events to publish");
            return Ok(0);
        }

        Publisher::new(&self.config.paths.publish_dir, self.config.publish.clone())
            .publish(&events)
            .await?;
        Ok(events.len())
    }
}
