use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

use crate::domain::language::Language;
use crate::domain::timeline::Timeline;

/// A script on disk with the timeline its last run rendered.
#[derive(Debug, Clone)]
pub struct ProjectFiles {
    pub name: String,
    pub language: Language,
    pub script_path: PathBuf,
    pub source: String,
    pub timeline: Timeline,
}

pub struct ProjectLoader;

impl ProjectLoader {
    /// Load one script. Without an explicit timeline, a sibling
    /// `<stem>.timeline.json` is used when present.
    pub fn load_project(script: &Path, timeline: Option<&Path>) -> Result<ProjectFiles> {
        let language = Language::from_path(script)
            .with_context(|| format!("Cannot infer language of {}", script.display()))?;
        let source = fs::read_to_string(script)
            .with_context(|| format!("Failed to read script {}", script.display()))?;

        let timeline = match timeline {
            Some(path) => Self::load_timeline(path)?,
            None => {
                let sibling = Self::timeline_path_for(script);
                if sibling.is_file() {
                    Self::load_timeline(&sibling)?
                } else {
                    Timeline::default()
                }
            }
        };

        let name = script
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| script.display().to_string());
        Ok(ProjectFiles { name, language, script_path: script.to_path_buf(), source, timeline })
    }

    pub fn load_timeline(path: &Path) -> Result<Timeline> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read timeline {}", path.display()))?;
        serde_json::from_str(&content).with_context(|| format!("Invalid timeline JSON in {}", path.display()))
    }

    pub fn timeline_path_for(script: &Path) -> PathBuf {
        let stem = script.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
        script.with_file_name(format!("{stem}.timeline.json"))
    }

    /// Every script under `dir`, sorted by path.
    pub fn discover(dir: &Path) -> Result<Vec<ProjectFiles>> {
        let mut scripts = Vec::new();
        Self::collect_scripts_recursive(dir, &mut scripts)?;
        scripts.sort();
        scripts.dedup();
        debug!(dir = %dir.display(), scripts = scripts.len(), "discovered scripts");
        scripts.iter().map(|path| Self::load_project(path, None)).collect()
    }

    fn collect_scripts_recursive(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
        if dir.ends_with("target") || dir.ends_with(".git") || dir.ends_with("node_modules") {
            return Ok(());
        }
        if !dir.exists() {
            return Ok(());
        }
        if dir.is_file() {
            if Language::from_path(dir).is_some() {
                out.push(dir.to_path_buf());
            }
            return Ok(());
        }

        for entry in fs::read_dir(dir).with_context(|| format!("Failed to list {}", dir.display()))? {
            let path = entry?.path();
            if path.is_dir() {
                Self::collect_scripts_recursive(&path, out)?;
            } else if Language::from_path(&path).is_some() {
                out.push(path);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sibling_timeline_is_picked_up() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("song.py");
        fs::write(&script, "fitMedia(DRUMS, 1, 1, 3)\n").unwrap();
        fs::write(
            dir.path().join("song.timeline.json"),
            r#"{"tempo": 100, "tracks": [{"clips": [{"sound": "DRUMS", "track": 1, "measure": 1, "start": 1, "end": 3}]}]}"#,
        )
        .unwrap();

        let project = ProjectLoader::load_project(&script, None).unwrap();
        assert_eq!(project.name, "song");
        assert_eq!(project.language, Language::Python);
        assert_eq!(project.timeline.tempo, Some(100.0));
        assert_eq!(project.timeline.tracks[0].clips.len(), 1);
    }

    #[test]
    fn test_discover_skips_other_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("a.js"), "makeBeat(X, 1, 1, '0+++');").unwrap();
        fs::write(dir.path().join("nested/b.py"), "x = 1\n").unwrap();
        fs::write(dir.path().join("notes.txt"), "nothing").unwrap();

        let projects = ProjectLoader::discover(dir.path()).unwrap();
        let names: Vec<_> = projects.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert!(projects[1].timeline.tracks.is_empty());
    }
}
