use super::types::Record;
use anyhow::{bail, Context, Result};
use atomic_write_file::AtomicWriteFile;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tokio_retry::{strategy::ExponentialBackoff, Retry};
use tracing::debug;

/// Where a board's records live.
///
/// Example YAML:
/// ```yaml
/// source: { file: pushups.json }
/// source: { url: "http://localhost:8000/beverages/" }
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "lowercase", deny_unknown_fields)]
pub enum RecordSource {
    /// JSON array of records on disk
    File(PathBuf),
    /// REST collection: GET lists, POST creates
    Url(String),
}

impl RecordSource {
    /// Resolve relative file paths against `base_dir` (the config directory)
    pub fn resolved(self, base_dir: &Path) -> Self {
        match self {
            RecordSource::File(path) if path.is_relative() => {
                RecordSource::File(base_dir.join(path))
            }
            other => other,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            RecordSource::File(path) => path.display().to_string(),
            RecordSource::Url(url) => url.clone(),
        }
    }

    /// Fetch the full record snapshot
    pub async fn list_records(&self) -> Result<Vec<Record>> {
        match self {
            RecordSource::File(path) => load_records(path),
            RecordSource::Url(url) => fetch_records(url).await,
        }
    }

    /// Create one record and return it as stored
    pub async fn submit_record(&self, record: Record) -> Result<Record> {
        match self {
            RecordSource::File(path) => append_record(path, record),
            RecordSource::Url(url) => post_record(url, record).await,
        }
    }
}

/// Load records from a JSON file
///
/// A missing file is an empty board, not an error.
pub fn load_records(path: &Path) -> Result<Vec<Record>> {
    if !path.exists() {
        debug!(path = %path.display(), "record file missing, starting empty");
        return Ok(Vec::new());
    }

    let file = File::open(path)
        .with_context(|| format!("Failed to open record file at {}", path.display()))?;

    let records: Vec<Record> = serde_json::from_reader(file)
        .with_context(|| format!("Failed to parse records in {}", path.display()))?;

    debug!(path = %path.display(), count = records.len(), "loaded records");
    Ok(records)
}

/// Save records to a JSON file atomically
pub fn save_records(path: &Path, records: &[Record]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
    }

    let mut file = AtomicWriteFile::open(path)
        .with_context(|| format!("Failed to open atomic write file at {}", path.display()))?;

    serde_json::to_writer_pretty(&mut file, records).context("Failed to serialize records")?;

    file.commit()
        .with_context(|| format!("Failed to save records to {}", path.display()))?;

    Ok(())
}

/// Append one record to a file source, assigning the next numeric id when the
/// record has none.
pub fn append_record(path: &Path, mut record: Record) -> Result<Record> {
    if let Some((key, _)) = record.inputs.iter().find(|(_, v)| !v.is_storable()) {
        bail!("Input '{}' of '{}' is not a finite number", key, record.name);
    }

    let mut records = load_records(path)?;

    if record.id.is_empty() {
        record.id = next_id(&records);
    } else if records.iter().any(|r| r.id == record.id) {
        bail!("A record with id '{}' already exists", record.id);
    }

    records.push(record.clone());
    save_records(path, &records)?;
    Ok(record)
}

fn next_id(records: &[Record]) -> String {
    let max = records
        .iter()
        .filter_map(|r| r.id.parse::<u64>().ok())
        .max()
        .unwrap_or(0);
    (max + 1).to_string()
}

async fn fetch_records(url: &str) -> Result<Vec<Record>> {
    // Retry strategy: exponential backoff with 3 attempts
    let retry_strategy = ExponentialBackoff::from_millis(100)
        .max_delay(std::time::Duration::from_secs(5))
        .take(3);

    let client = reqwest::Client::new();
    let client = &client;
    let records = Retry::spawn(retry_strategy, || async {
        client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<Record>>()
            .await
    })
    .await
    .with_context(|| format!("Failed to fetch records from {}", url))?;

    debug!(url, count = records.len(), "fetched records");
    Ok(records)
}

// Not retried: a POST that timed out may still have been stored.
async fn post_record(url: &str, record: Record) -> Result<Record> {
    let client = reqwest::Client::new();
    let created = client
        .post(url)
        .json(&record)
        .send()
        .await
        .and_then(|response| response.error_for_status())
        .with_context(|| format!("Failed to submit record to {}", url))?
        .json::<Record>()
        .await
        .context("Failed to parse created record")?;

    debug!(url, id = %created.id, "submitted record");
    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    fn temp_path(name: &str) -> PathBuf {
        let path = env::temp_dir().join(format!("leaderboard_test_{}.json", name));
        let _ = fs::remove_file(&path);
        path
    }

    #[test]
    fn test_load_missing_file_returns_empty() {
        let path = temp_path("missing");
        let records = load_records(&path).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_append_assigns_next_id() {
        let path = temp_path("append_ids");

        let first = append_record(&path, Record::new("", "Anna").with_input("total_remaining", 500.0))
            .unwrap();
        let second = append_record(&path, Record::new("", "Ben").with_input("total_remaining", 420.0))
            .unwrap();

        assert_eq!(first.id, "1");
        assert_eq!(second.id, "2");

        let loaded = load_records(&path).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[1].name, "Ben");
        assert_eq!(loaded[1].input("total_remaining"), Some(420.0));

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_append_rejects_duplicate_id() {
        let path = temp_path("append_dup");
        append_record(&path, Record::new("9", "Anna")).unwrap();
        let result = append_record(&path, Record::new("9", "Other"));
        assert!(result.is_err());
        assert_eq!(load_records(&path).unwrap().len(), 1);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_append_rejects_non_finite_input() {
        let path = temp_path("append_non_finite");
        append_record(&path, Record::new("", "Pils").with_input("price", 0.79)).unwrap();

        let result = append_record(&path, Record::new("", "Broken").with_input("price", f64::INFINITY));
        assert!(result.is_err());
        let result = append_record(&path, Record::new("", "Broken").with_input("volume", f64::NAN));
        assert!(result.is_err());

        // File stays readable with only the valid record
        let records = load_records(&path).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "Pils");
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_load_file_with_null_inputs() {
        let path = temp_path("null_inputs");
        fs::write(
            &path,
            r#"[{"id": 1, "name": "Pils", "inputs": {"price": null, "volume": 0.5}}]"#,
        )
        .unwrap();

        let records = load_records(&path).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].input("price"), None);

        // Null survives a save/load cycle
        save_records(&path, &records).unwrap();
        assert_eq!(load_records(&path).unwrap(), records);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_next_id_skips_non_numeric() {
        let records = vec![Record::new("abc", "a"), Record::new("4", "b")];
        assert_eq!(next_id(&records), "5");
        assert_eq!(next_id(&[]), "1");
    }

    #[test]
    fn test_corrupt_file_is_error() {
        let path = temp_path("corrupt");
        fs::write(&path, "not json").unwrap();
        assert!(load_records(&path).is_err());
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_resolved_relative_path() {
        let source = RecordSource::File(PathBuf::from("pushups.json"));
        let resolved = source.resolved(Path::new("/etc/leaderboard"));
        assert_eq!(
            resolved,
            RecordSource::File(PathBuf::from("/etc/leaderboard/pushups.json"))
        );

        let url = RecordSource::Url("http://localhost:8000/beverages/".to_string());
        assert_eq!(url.clone().resolved(Path::new("/tmp")), url);
    }

    #[tokio::test]
    async fn test_file_source_submit_then_list() {
        let path = temp_path("source_roundtrip");
        let source = RecordSource::File(path.clone());

        let created = source
            .submit_record(Record::new("", "Pils").with_input("price", 0.79))
            .await
            .unwrap();
        assert_eq!(created.id, "1");

        let records = source.list_records().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "Pils");

        let _ = fs::remove_file(&path);
    }
}
