use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use serde::Deserialize;
use serde_json::Value;
use uitag_core::protocol::ApiResponse;
use uitag_core::{RawTagField, RenderSettings};
use uitag_lint::LintConfig;

pub const CONFIG_FILE: &str = "uitag.config.yaml";
const TAG_FILE_SUFFIX: &str = ".tags.json";

/// Tag rows for one model, read from `<model>.tags.json`.
pub struct TagFile {
    pub path: String,
    pub model: String,
    pub rows: Vec<RawTagField>,
}

/// Project configuration from uitag.config.yaml.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UiTagConfig {
    pub sources: Option<Vec<String>>,
    pub render: RenderSettings,
    pub lint: LintConfig,
}

/// File body: a bare row array, or a `/getuitag` response envelope.
#[derive(Deserialize)]
#[serde(untagged)]
enum TagDocument {
    Rows(Vec<RawTagField>),
    Envelope(ApiResponse<Vec<RawTagField>>),
}

/// Read tag files from a path (file or directory).
pub fn read_tag_files(input_path: &Path) -> Result<Vec<TagFile>, String> {
    if !input_path.exists() {
        return Err(format!("Path does not exist: {}", input_path.display()));
    }

    let paths = if input_path.is_file() {
        vec![input_path.to_path_buf()]
    } else if input_path.is_dir() {
        match read_project_config(input_path).and_then(|c| c.sources) {
            Some(patterns) if !patterns.is_empty() => glob_sources(input_path, &patterns)?,
            _ => glob_sources(input_path, &[format!("**/*{TAG_FILE_SUFFIX}")])?,
        }
    } else {
        return Err(format!(
            "Path is neither a file nor a directory: {}",
            input_path.display()
        ));
    };

    paths.iter().map(|p| read_tag_file(p)).collect()
}

/// Read project config next to the input: the directory itself, or the
/// directory holding the input file.
pub fn read_project_config(input_path: &Path) -> Option<UiTagConfig> {
    let dir = if input_path.is_dir() {
        input_path
    } else {
        input_path.parent()?
    };
    let config_path = dir.join(CONFIG_FILE);
    if !config_path.exists() {
        return None;
    }

    let content = fs::read_to_string(&config_path).ok()?;
    match serde_yaml::from_str(&content) {
        Ok(config) => Some(config),
        Err(e) => {
            log::warn!("ignoring {}: {e}", config_path.display());
            None
        }
    }
}

/// Inline JSON (`{...}`, `[...]`) or the path of a JSON file.
pub fn read_json_arg(arg: &str) -> Result<Value, String> {
    let trimmed = arg.trim_start();
    let content = if trimmed.starts_with('{') || trimmed.starts_with('[') {
        arg.to_string()
    } else {
        fs::read_to_string(arg).map_err(|e| format!("Failed to read {arg}: {e}"))?
    };
    serde_json::from_str(&content).map_err(|e| format!("Invalid JSON in {arg}: {e}"))
}

fn read_tag_file(path: &Path) -> Result<TagFile, String> {
    let content = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
    let rows = match serde_json::from_str(&content)
        .map_err(|e| format!("Invalid tag file {}: {}", path.display(), e))?
    {
        TagDocument::Rows(rows) => rows,
        TagDocument::Envelope(envelope) => envelope
            .into_result()
            .map_err(|e| format!("{}: {}", path.display(), e))?,
    };
    debug!("{}: {} rows", path.display(), rows.len());

    Ok(TagFile {
        path: path.to_string_lossy().to_string(),
        model: model_name(path),
        rows,
    })
}

/// `sysuser.tags.json` → `sysuser`.
fn model_name(path: &Path) -> String {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    match file_name.strip_suffix(TAG_FILE_SUFFIX) {
        Some(stem) => stem.to_string(),
        None => path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or(file_name),
    }
}

fn glob_sources(base_dir: &Path, patterns: &[String]) -> Result<Vec<PathBuf>, String> {
    let mut paths: Vec<PathBuf> = Vec::new();
    let mut seen: HashSet<PathBuf> = HashSet::new();

    for pattern in patterns {
        let full_pattern = base_dir.join(pattern);
        let pattern_str = full_pattern.to_string_lossy().replace('\\', "/");
        let entries = glob::glob(&pattern_str)
            .map_err(|e| format!("Invalid glob pattern '{}': {}", pattern, e))?;

        let mut matched: Vec<PathBuf> = Vec::new();
        for entry in entries {
            match entry {
                Ok(path) => {
                    if seen.insert(path.clone()) {
                        matched.push(path);
                    }
                }
                Err(e) => return Err(format!("Glob error: {}", e)),
            }
        }
        matched.sort();
        paths.extend(matched);
    }

    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_name_from_file() {
        assert_eq!(model_name(Path::new("samples/sysuser.tags.json")), "sysuser");
        assert_eq!(model_name(Path::new("dir/order.json")), "order");
    }

    #[test]
    fn tag_document_accepts_both_shapes() {
        let bare: TagDocument =
            serde_json::from_str(r#"[{"field": "a", "tag": "label:A"}]"#).unwrap();
        assert!(matches!(bare, TagDocument::Rows(rows) if rows.len() == 1));

        let wrapped: TagDocument = serde_json::from_str(
            r#"{"code": 0, "msg": "", "data": [{"field": "a", "tag": "label:A"}]}"#,
        )
        .unwrap();
        assert!(matches!(wrapped, TagDocument::Envelope(_)));
    }

    #[test]
    fn inline_json_argument() {
        assert_eq!(read_json_arg(r#"{"a": 1}"#).unwrap()["a"], 1);
        assert!(read_json_arg("no/such/file.json").is_err());
    }
}
