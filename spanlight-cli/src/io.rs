//! File I/O for the terminal annotator

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use spanlight_core::{AnswerDocument, Configuration, Document};

/// Load a text file and create a Document
pub fn load_file(path: &str) -> Result<Document> {
    let path = Path::new(path);
    let canonical = path
        .canonicalize()
        .with_context(|| format!("Failed to resolve path: {}", path.display()))?;

    let content = fs::read_to_string(&canonical)
        .with_context(|| format!("Failed to read file: {}", canonical.display()))?;

    let filepath = canonical.to_string_lossy().to_string();
    let filename = canonical
        .file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let title = canonical
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "Untitled".to_string());

    Ok(Document::with_file_info(title, content, filepath, filename))
}

/// Get the ~/.spanlight directory path, creating it if needed
pub fn spanlight_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not find home directory")?;
    let dir = home.join(".spanlight");

    if !dir.exists() {
        fs::create_dir_all(&dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    }

    Ok(dir)
}

/// Read a configuration file; a missing file yields the defaults
pub fn load_config(path: &Path) -> Result<Configuration> {
    if !path.exists() {
        return Ok(Configuration::default());
    }
    let json = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("Invalid configuration in {}", path.display()))
}

/// Read previously exported answers
pub fn load_answers(path: &str) -> Result<AnswerDocument> {
    let json = fs::read_to_string(path).with_context(|| format!("Failed to read answers: {}", path))?;
    spanlight_core::from_json(&json).with_context(|| format!("Invalid answers in {}", path))
}

/// Write answers as JSON into `dir`, named after the document
pub fn export_answers(dir: &Path, answers: &AnswerDocument) -> Result<PathBuf> {
    let export_path = dir.join(format!("{}.answers.json", answers.title));

    let json = spanlight_core::to_json(answers).context("Failed to serialize answers")?;

    fs::write(&export_path, json).with_context(|| format!("Failed to write {}", export_path.display()))?;

    Ok(export_path)
}

#[cfg(test)]
mod tests {
    use spanlight_core::{LabelOption, SpanAnswer};

    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("spanlight-{}-{}", name, std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_missing_config_uses_defaults() {
        let dir = scratch_dir("config-missing");
        let config = load_config(&dir.join("config.json")).unwrap();
        assert!(!config.allow_overlap);
        assert_eq!(config.line_height, 32.0);
    }

    #[test]
    fn test_config_reads_camel_case() {
        let dir = scratch_dir("config");
        let path = dir.join("config.json");
        fs::write(&path, r#"{"allowOverlap": true}"#).unwrap();

        let config = load_config(&path).unwrap();
        assert!(config.allow_overlap);
        assert!(!config.allow_character);
    }

    #[test]
    fn test_export_then_load_answers() {
        let dir = scratch_dir("answers");
        let file = dir.join("story.txt");
        fs::write(&file, "Ada met Bob.").unwrap();

        let doc = load_file(file.to_str().unwrap()).unwrap();
        assert_eq!(doc.title, "story");
        assert_eq!(doc.filename.as_deref(), Some("story.txt"));

        let labels = vec![LabelOption::new("per", "PER", "Person")];
        let mut answers = AnswerDocument::new(&doc, &[], &labels);
        answers.spans.push(SpanAnswer {
            start: 0,
            end: 3,
            label: "per".into(),
        });

        let path = export_answers(&dir, &answers).unwrap();
        assert!(path.ends_with("story.answers.json"));

        let loaded = load_answers(path.to_str().unwrap()).unwrap();
        assert_eq!(loaded.spans, answers.spans);
        assert_eq!(loaded.document_id, doc.id);
    }
}
