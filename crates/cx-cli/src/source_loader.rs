use std::fs;
use std::path::{Path, PathBuf};

use cx_core::CodexError;
use walkdir::WalkDir;

use crate::{
    map_cli_source_path, map_cli_source_read, LoadedStory, SourceArgs, DEFAULT_STORIES_DIR,
    DEFAULT_STORY_NAME, STORY_REF_PREFIX,
};

const STORY_EXTENSIONS: [&str; 2] = ["yaml", "yml"];

/// Resolves `--story` or `--stories-dir`/`--name` to a loaded story file.
pub(crate) fn load_story_from_args(source: &SourceArgs) -> Result<LoadedStory, CodexError> {
    if let Some(story) = &source.story {
        return load_story_by_file(story);
    }
    let stories_dir = source.stories_dir.as_deref().unwrap_or(DEFAULT_STORIES_DIR);
    let name = source.name.as_deref().unwrap_or(DEFAULT_STORY_NAME);
    load_story_by_dir(stories_dir, name)
}

pub(crate) fn load_story_by_dir(stories_dir: &str, name: &str) -> Result<LoadedStory, CodexError> {
    let root = resolve_stories_dir(stories_dir)?;
    let path = find_story_file(&root, name)?;
    read_story_file(path)
}

pub(crate) fn load_story_by_file(story: &str) -> Result<LoadedStory, CodexError> {
    let path = absolute_path(story)?;
    if !path.is_file() {
        return Err(CodexError::new(
            "CLI_SOURCE_NOT_FOUND",
            format!("story file does not exist: {}", path.display()),
        ));
    }
    read_story_file(path)
}

pub(crate) fn load_story_by_ref(story_ref: &str) -> Result<LoadedStory, CodexError> {
    let Some(raw) = story_ref.strip_prefix(STORY_REF_PREFIX) else {
        return Err(CodexError::new(
            "CLI_SOURCE_REF_INVALID",
            format!("Unsupported story ref: {}", story_ref),
        ));
    };
    load_story_by_file(raw)
}

pub(crate) fn resolve_stories_dir(stories_dir: &str) -> Result<PathBuf, CodexError> {
    let absolute = absolute_path(stories_dir)?;

    if !absolute.exists() {
        return Err(CodexError::new(
            "CLI_SOURCE_NOT_FOUND",
            format!("stories-dir does not exist: {}", absolute.display()),
        ));
    }

    if !absolute.is_dir() {
        return Err(CodexError::new(
            "CLI_SOURCE_NOT_DIR",
            format!("stories-dir is not a directory: {}", absolute.display()),
        ));
    }

    Ok(absolute)
}

/// Story files under `stories_dir`, as `(name, path)` sorted by name.
pub(crate) fn scan_story_files(stories_dir: &Path) -> Vec<(String, PathBuf)> {
    let mut stories = WalkDir::new(stories_dir)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| {
            let path = entry.into_path();
            let extension = path.extension()?.to_str()?;
            if !STORY_EXTENSIONS.contains(&extension) {
                return None;
            }
            let name = path.file_stem()?.to_str()?.to_string();
            Some((name, path))
        })
        .collect::<Vec<_>>();
    stories.sort_by(|left, right| left.0.cmp(&right.0));
    stories
}

pub(crate) fn find_story_file(stories_dir: &Path, name: &str) -> Result<PathBuf, CodexError> {
    let mut matches = scan_story_files(stories_dir)
        .into_iter()
        .filter(|(candidate, _)| candidate == name)
        .map(|(_, path)| path);

    let Some(found) = matches.next() else {
        return Err(CodexError::new(
            "CLI_STORY_NOT_FOUND",
            format!(
                "No story named \"{}\" (.yaml/.yml) under {}",
                name,
                stories_dir.display()
            ),
        ));
    };
    if let Some(other) = matches.next() {
        log::warn!(
            "Story name \"{}\" is ambiguous, using {} over {}",
            name,
            found.display(),
            other.display()
        );
    }
    Ok(found)
}

pub(crate) fn make_story_ref(path: &Path) -> String {
    format!("{}{}", STORY_REF_PREFIX, path.display())
}

fn read_story_file(path: PathBuf) -> Result<LoadedStory, CodexError> {
    let yaml = fs::read_to_string(&path).map_err(map_cli_source_read)?;
    let name = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("story")
        .to_string();
    log::debug!("Read story {} from {}", name, path.display());
    Ok(LoadedStory {
        id: make_story_ref(&path),
        name,
        path,
        yaml,
    })
}

fn absolute_path(raw: &str) -> Result<PathBuf, CodexError> {
    let path = PathBuf::from(raw);
    if path.is_absolute() {
        return Ok(path);
    }
    Ok(std::env::current_dir()
        .map_err(map_cli_source_path)?
        .join(path))
}
