use std::fs;
use std::path::{Path, PathBuf};

use nv_api::StoryDocument;
use nv_core::NarrationError;
use walkdir::WalkDir;

use crate::{map_cli_story_invalid, map_cli_story_path, map_cli_story_read, LoadedStory};

const STORY_REF_PREFIX: &str = "story:";
const STORY_FILE_SUFFIX: &str = ".story.json";

/// Loads a story from a single JSON file, or from every `*.story.json`
/// under a directory merged in path order.
pub(crate) fn load_story_by_path(story: &str) -> Result<LoadedStory, NarrationError> {
    let root = resolve_story_path(story)?;
    let story_json = if root.is_dir() {
        read_story_dir(&root)?
    } else {
        fs::read_to_string(&root).map_err(map_cli_story_read)?
    };
    let title = root
        .file_name()
        .and_then(|name| name.to_str())
        .map(|name| name.trim_end_matches(STORY_FILE_SUFFIX).to_string())
        .unwrap_or_else(|| "untitled".to_string());

    Ok(LoadedStory {
        id: make_story_id(&root),
        title,
        story_json,
    })
}

pub(crate) fn load_story_by_ref(story_ref: &str) -> Result<LoadedStory, NarrationError> {
    let Some(raw) = story_ref.strip_prefix(STORY_REF_PREFIX) else {
        return Err(NarrationError::new(
            "CLI_STORY_REF_INVALID",
            format!("Unsupported story ref: {}", story_ref),
        ));
    };
    load_story_by_path(raw)
}

pub(crate) fn resolve_story_path(story: &str) -> Result<PathBuf, NarrationError> {
    let path = PathBuf::from(story);
    let absolute = if path.is_absolute() {
        path
    } else {
        std::env::current_dir()
            .map_err(map_cli_story_path)?
            .join(path)
    };

    if !absolute.exists() {
        return Err(NarrationError::new(
            "CLI_STORY_NOT_FOUND",
            format!("story does not exist: {}", absolute.display()),
        ));
    }
    Ok(absolute)
}

pub(crate) fn read_story_dir(story_dir: &Path) -> Result<String, NarrationError> {
    let mut files = WalkDir::new(story_dir)
        .follow_links(false)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| path.to_string_lossy().ends_with(STORY_FILE_SUFFIX))
        .collect::<Vec<_>>();
    files.sort();

    if files.is_empty() {
        return Err(NarrationError::new(
            "CLI_STORY_EMPTY",
            format!("No {} files under {}", STORY_FILE_SUFFIX, story_dir.display()),
        ));
    }

    let mut merged = StoryDocument { labels: Vec::new() };
    for path in files {
        let raw = fs::read_to_string(&path).map_err(map_cli_story_read)?;
        let document: StoryDocument = serde_json::from_str(&raw).map_err(|error| {
            NarrationError::new(
                "CLI_STORY_INVALID",
                format!("{}: {}", path.display(), error),
            )
        })?;
        tracing::debug!(path = %path.display(), labels = document.labels.len(), "story file read");
        merged.labels.extend(document.labels);
    }
    serde_json::to_string(&merged).map_err(map_cli_story_invalid)
}

pub(crate) fn make_story_id(story_path: &Path) -> String {
    format!("{}{}", STORY_REF_PREFIX, story_path.display())
}
