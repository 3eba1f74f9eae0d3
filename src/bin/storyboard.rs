//! Illustrates a story draft locally with the deterministic in-memory
//! backend.
//!
//! Usage:
//!
//! ```text
//! storyboard <draft-path> <output-dir>
//! ```
//!
//! The JSON draft at `draft-path` describes the story. A representative
//! draft is:
//!
//! ```json
//! {
//!   "title": "Emma and the Dragon",
//!   "visual_guide": {
//!     "style_guide": "Soft watercolour",
//!     "character_definitions": { "Emma": "a girl with red braids" },
//!     "setting_definitions": { "Magic Wand": "a silver wand" }
//!   },
//!   "characters": ["Emma", "Magic Wand"],
//!   "pages": [
//!     { "text": "Emma finds a wand." },
//!     { "text": "The wand glows.", "illustration_prompt": "close-up of the wand" }
//!   ],
//!   "scheduler": { "max_attempts": 3 }
//! }
//! ```
//!
//! Page images are written to `output-dir` as `page-NNN.<ext>` and the
//! master reference as `reference.<ext>`. Reference snapshots are kept in
//! `output-dir/references`. Set `RUST_LOG` to adjust log verbosity.

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;
use mockable::DefaultClock;
use picturebook::generation::{
    adapters::memory::InMemoryImageBackend,
    domain::{ImageData, ImageFormat},
};
use picturebook::illustration::{
    scheduler::{IllustrationScheduler, SchedulerConfig, SchedulerError, StoryProgress},
    services::IllustrationPipeline,
};
use picturebook::reference::{
    adapters::FileSystemSnapshotStore,
    cache::{MasterReferenceCache, MasterReferenceCacheConfig},
    ports::SnapshotStoreError,
};
use picturebook::story::{
    adapters::memory::InMemoryStoryRepository,
    domain::{CollectionVisualContext, Page, Story, StoryDomainError, VisualGuide},
    ports::{StoryRepository, StoryRepositoryError},
};
use serde::Deserialize;
use std::env;
use std::sync::Arc;
use thiserror::Error;
use tokio::runtime::Builder;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const REFERENCE_SNAPSHOT_DIR: &str = "references";

/// Boxed error type for the main result.
type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
enum StoryboardError {
    #[error("invalid arguments: {0}")]
    InvalidArgs(String),
    #[error("failed to read story draft: {0}")]
    DraftRead(#[source] std::io::Error),
    #[error("failed to parse story draft: {0}")]
    DraftParse(#[source] serde_json::Error),
    #[error("invalid story draft: {0}")]
    DraftInvalid(String),
    #[error(transparent)]
    Story(#[from] StoryDomainError),
    #[error("failed to prepare output directory: {0}")]
    Output(#[source] std::io::Error),
    #[error(transparent)]
    Snapshot(#[from] SnapshotStoreError),
    #[error("runtime init failed: {0}")]
    RuntimeInit(#[source] std::io::Error),
    #[error(transparent)]
    Repository(#[from] StoryRepositoryError),
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
    #[error("illustration incomplete: {failed} failed, {blocked} blocked")]
    Incomplete { failed: usize, blocked: usize },
}

#[derive(Debug, Deserialize)]
struct StoryDraft {
    title: String,
    #[serde(default)]
    visual_guide: Option<VisualGuide>,
    #[serde(default)]
    collection: Option<CollectionVisualContext>,
    #[serde(default)]
    characters: Vec<String>,
    pages: Vec<DraftPage>,
    #[serde(default)]
    scheduler: SchedulerConfig,
    #[serde(default)]
    cache: MasterReferenceCacheConfig,
}

#[derive(Debug, Deserialize)]
struct DraftPage {
    text: String,
    #[serde(default)]
    illustration_prompt: Option<String>,
}

fn main() -> Result<(), BoxError> {
    init_tracing();
    let (draft_path, output_path) = parse_args(collect_args()?.into_iter())?;
    run(&draft_path, &output_path).map_err(Into::into)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn collect_args() -> Result<Vec<Utf8PathBuf>, StoryboardError> {
    env::args_os()
        .map(|arg_os| {
            let arg = arg_os
                .into_string()
                .map_err(|_| StoryboardError::InvalidArgs("argument is not valid UTF-8".into()))?;
            Ok(Utf8PathBuf::from(arg))
        })
        .collect()
}

fn parse_args(
    mut args: impl Iterator<Item = Utf8PathBuf>,
) -> Result<(Utf8PathBuf, Utf8PathBuf), StoryboardError> {
    let _program = args.next();
    let draft_path = args
        .next()
        .ok_or_else(|| StoryboardError::InvalidArgs("missing draft path argument".into()))?;
    let output_path = args
        .next()
        .ok_or_else(|| StoryboardError::InvalidArgs("missing output directory argument".into()))?;
    if let Some(extra) = args.next() {
        let extra_arg = extra.as_str();
        return Err(StoryboardError::InvalidArgs(format!(
            "unexpected extra argument: {extra_arg}"
        )));
    }
    Ok((draft_path, output_path))
}

fn load_draft(path: &Utf8Path) -> Result<StoryDraft, StoryboardError> {
    let file_name = path
        .file_name()
        .ok_or_else(|| StoryboardError::InvalidArgs("draft path must include a file name".into()))?;
    let parent = path
        .parent()
        .filter(|dir| !dir.as_str().is_empty())
        .unwrap_or_else(|| Utf8Path::new("."));
    let dir = Dir::open_ambient_dir(parent, ambient_authority()).map_err(StoryboardError::DraftRead)?;
    let bytes = dir.read(file_name).map_err(StoryboardError::DraftRead)?;
    serde_json::from_slice(&bytes).map_err(StoryboardError::DraftParse)
}

fn build_story(draft: StoryDraft) -> Result<(Story, SchedulerConfig, MasterReferenceCacheConfig), StoryboardError> {
    let StoryDraft {
        title,
        visual_guide,
        collection,
        characters,
        pages,
        scheduler,
        cache,
    } = draft;
    let mut story = Story::new(title, &DefaultClock)?.with_character_names(characters);
    if let Some(guide) = visual_guide {
        story = story.with_visual_guide(guide);
    }
    if let Some(context) = collection {
        story = story.with_collection_context(context);
    }
    for (position, draft_page) in pages.into_iter().enumerate() {
        let page_index = u32::try_from(position)
            .map_err(|_| StoryboardError::DraftInvalid("too many pages".into()))?;
        let mut page = Page::new(page_index, draft_page.text);
        if let Some(prompt) = draft_page.illustration_prompt {
            page = page.with_illustration_prompt(prompt);
        }
        story = story.with_prepared_page(page);
    }
    Ok((story, scheduler, cache))
}

fn open_output(path: &Utf8Path) -> Result<Dir, StoryboardError> {
    Dir::create_ambient_dir_all(path, ambient_authority()).map_err(StoryboardError::Output)?;
    Dir::open_ambient_dir(path, ambient_authority()).map_err(StoryboardError::Output)
}

fn image_file_name(stem: &str, image: &ImageData) -> String {
    let extension = image.detect_format().map_or("bin", ImageFormat::extension);
    format!("{stem}.{extension}")
}

fn run(draft_path: &Utf8Path, output_path: &Utf8Path) -> Result<(), StoryboardError> {
    let (story, scheduler_config, cache_config) = build_story(load_draft(draft_path)?)?;
    let output = open_output(output_path)?;
    let snapshots = FileSystemSnapshotStore::open(&output_path.join(REFERENCE_SNAPSHOT_DIR))?;

    let runtime = Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(StoryboardError::RuntimeInit)?;
    let (illustrated, progress) = runtime.block_on(async {
        let stories = Arc::new(InMemoryStoryRepository::new());
        stories.store(&story).await?;
        let cache = MasterReferenceCache::new(cache_config).with_snapshot_store(Arc::new(snapshots));
        let pipeline = IllustrationPipeline::new(
            Arc::new(InMemoryImageBackend::new()),
            Arc::clone(&stories),
            cache,
            Arc::new(DefaultClock),
        );
        let scheduler =
            IllustrationScheduler::new(Arc::new(pipeline), Arc::new(DefaultClock), scheduler_config);
        scheduler.plan_story(&story)?;
        scheduler.run_until_idle().await?;

        let progress = scheduler.story_progress(story.id());
        let illustrated = stories
            .find_by_id(story.id())
            .await?
            .ok_or(StoryRepositoryError::NotFound(story.id()))?;
        Ok::<_, StoryboardError>((illustrated, progress))
    })?;

    write_images(&output, &illustrated)?;
    report(&illustrated, progress)
}

fn write_images(output: &Dir, story: &Story) -> Result<(), StoryboardError> {
    if let Some(reference) = story.character_reference() {
        let name = image_file_name("reference", reference);
        output
            .write(&name, reference.as_bytes())
            .map_err(StoryboardError::Output)?;
        info!(file = %name, "wrote master reference");
    }
    for page in story.pages() {
        let Some(image) = page.illustration() else {
            warn!(page_index = page.page_index(), status = %page.illustration_status(), "page has no illustration");
            continue;
        };
        let name = image_file_name(&format!("page-{:03}", page.page_index()), image);
        output
            .write(&name, image.as_bytes())
            .map_err(StoryboardError::Output)?;
        info!(file = %name, "wrote page illustration");
    }
    Ok(())
}

fn report(story: &Story, progress: StoryProgress) -> Result<(), StoryboardError> {
    info!(
        story_id = %story.id(),
        title = story.title(),
        ready = progress.ready,
        failed = progress.failed,
        blocked = progress.blocked,
        total = progress.total,
        "illustration run finished"
    );
    if progress.ready == progress.total {
        return Ok(());
    }
    Err(StoryboardError::Incomplete {
        failed: progress.failed,
        blocked: progress.blocked,
    })
}
