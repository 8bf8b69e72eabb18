//! Generation orchestrator.
//!
//! [`Generator::start`] does the cheap, fallible setup on the caller's
//! thread and hands the page walk to a background thread:
//!
//! ```text
//! start(game)
//!   ├── run already active?        → Busy
//!   ├── game lookup                → NotFound (progress untouched)
//!   ├── progress.begin("generate")
//!   ├── flatten tree → DeckLayout
//!   ├── reset output directory
//!   └── spawn "bundle-generator" ──▶ Pipeline::run ──▶ Done | Error
//! ```
//!
//! Only one run may be active per generator. The returned
//! [`GenerationHandle`] can cancel the run or wait for its summary; progress
//! is also visible through [`Generator::progress`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::bundle_dir::BundleDir;
use crate::config::{ConfigError, GeneratorConfig};
use crate::content::{ContentError, ContentProvider, SortOrder};
use crate::deck::{DeckError, DeckLayout};
use crate::grid::GridError;
use crate::imaging::{BackendError, ImageBackend};
use crate::pipeline::{BundleSummary, Pipeline};
use crate::progress::{ProgressReporter, ProgressSnapshot, Status};

pub const PHASE: &str = "generate";

#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("{0}")]
    NotFound(ContentError),
    #[error("Content error: {0}")]
    Content(ContentError),
    #[error("Decode failure: {0}")]
    DecodeFailure(BackendError),
    #[error("Encode failure: {0}")]
    EncodeFailure(BackendError),
    #[error("Configuration violation: {0}")]
    ConfigurationViolation(String),
    #[error("a generation run is already in progress")]
    Busy,
    #[error("generation cancelled")]
    Cancelled,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<ContentError> for GenerateError {
    fn from(e: ContentError) -> Self {
        if e.is_not_found() {
            GenerateError::NotFound(e)
        } else {
            GenerateError::Content(e)
        }
    }
}

impl From<GridError> for GenerateError {
    fn from(e: GridError) -> Self {
        GenerateError::ConfigurationViolation(e.to_string())
    }
}

impl From<DeckError> for GenerateError {
    fn from(e: DeckError) -> Self {
        GenerateError::ConfigurationViolation(e.to_string())
    }
}

impl From<ConfigError> for GenerateError {
    fn from(e: ConfigError) -> Self {
        GenerateError::ConfigurationViolation(e.to_string())
    }
}

/// Clears the generator's running flag when dropped.
struct RunGuard(Arc<AtomicBool>);

impl RunGuard {
    fn acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RunGuard(Arc::clone(flag)))
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct Generator {
    provider: Arc<dyn ContentProvider>,
    backend: Arc<dyn ImageBackend>,
    out: BundleDir,
    config: Arc<GeneratorConfig>,
    progress: ProgressReporter,
    running: Arc<AtomicBool>,
}

impl Generator {
    pub fn new(
        provider: Arc<dyn ContentProvider>,
        backend: Arc<dyn ImageBackend>,
        out: BundleDir,
        config: GeneratorConfig,
    ) -> Result<Self, GenerateError> {
        config.validate()?;
        Ok(Self {
            provider,
            backend,
            out,
            config: Arc::new(config),
            progress: ProgressReporter::new(),
            running: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Shared handle onto the status of the most recent run.
    pub fn progress(&self) -> ProgressReporter {
        self.progress.clone()
    }

    pub fn output(&self) -> &BundleDir {
        &self.out
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Start generating the bundle for `game_id`.
    ///
    /// Returns once the output directory has been reset and the background
    /// run is spawned.
    pub fn start(&self, game_id: &str, sort: SortOrder) -> Result<GenerationHandle, GenerateError> {
        let guard = RunGuard::acquire(&self.running).ok_or(GenerateError::Busy)?;
        let game = self.provider.game(game_id)?;

        self.progress.begin(PHASE);
        let setup = || -> Result<DeckLayout, GenerateError> {
            self.progress.set_message("Reading the card list...");
            let layout = collect_layout(
                self.provider.as_ref(),
                &game.id,
                sort,
                self.config.grid.page_capacity(),
            )?;
            self.out.reset()?;
            Ok(layout)
        };
        let layout = match setup() {
            Ok(layout) => layout,
            Err(e) => {
                self.fail(&e);
                return Err(e);
            }
        };

        let total = layout.card_count();
        info!(game = %game.id, cards = total, pages = layout.page_count(), "starting generation");

        let cancel = CancellationToken::new();
        let provider = Arc::clone(&self.provider);
        let backend = Arc::clone(&self.backend);
        let config = Arc::clone(&self.config);
        let out = self.out.clone();
        let progress = self.progress.clone();
        let token = cancel.clone();
        let groups = layout.into_groups();

        let spawned = std::thread::Builder::new()
            .name("bundle-generator".to_string())
            .spawn(move || {
                let _guard = guard;
                let pipeline = Pipeline {
                    provider: provider.as_ref(),
                    backend: backend.as_ref(),
                    out: &out,
                    config: &config,
                    progress: &progress,
                    cancel: &token,
                };
                let result = pipeline.run(&game, &groups, total);
                match &result {
                    Ok(summary) => {
                        info!(
                            game = %summary.game_id,
                            pages = summary.pages.len(),
                            entries = summary.card_entries,
                            "generation finished"
                        );
                        progress.set_percent(100.0);
                        progress.set_message(format!(
                            "Generated {} page(s) for {}",
                            summary.pages.len(),
                            summary.game_id
                        ));
                        progress.set_status(Status::Done);
                    }
                    Err(e) => {
                        error!(game = %game.id, error = %e, "generation failed");
                        progress.set_message(e.to_string());
                        progress.set_status(Status::Error);
                    }
                }
                result
            });

        match spawned {
            Ok(join) => Ok(GenerationHandle {
                progress: self.progress.clone(),
                cancel,
                join,
            }),
            Err(e) => {
                let e = GenerateError::Io(e);
                self.fail(&e);
                Err(e)
            }
        }
    }

    fn fail(&self, e: &GenerateError) {
        error!(error = %e, "generation setup failed");
        self.progress.set_message(e.to_string());
        self.progress.set_status(Status::Error);
    }
}

/// Flatten the game's tree into deck groups and pages.
pub fn collect_layout(
    provider: &dyn ContentProvider,
    game_id: &str,
    sort: SortOrder,
    page_capacity: usize,
) -> Result<DeckLayout, GenerateError> {
    let mut layout = DeckLayout::new(page_capacity)?;
    for collection in provider.collections(game_id, sort)? {
        for deck in provider.decks(game_id, &collection.id, sort)? {
            layout.select_group(&deck.id, &deck.image);
            for card in provider.cards(game_id, &collection.id, &deck.id, sort)? {
                layout.add_card(game_id, &collection.id, card.id, card.count)?;
            }
        }
    }
    Ok(layout)
}

/// A running (or finished) generation.
pub struct GenerationHandle {
    progress: ProgressReporter,
    cancel: CancellationToken,
    join: JoinHandle<Result<BundleSummary, GenerateError>>,
}

impl GenerationHandle {
    pub fn progress(&self) -> ProgressSnapshot {
        self.progress.snapshot()
    }

    /// Ask the run to stop. It notices before the next page or card.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Block until the run ends.
    pub fn wait(self) -> Result<BundleSummary, GenerateError> {
        match self.join.join() {
            Ok(result) => result,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }
}
