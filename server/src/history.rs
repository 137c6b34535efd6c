use std::{
    fs::OpenOptions,
    io,
    path::{Path, PathBuf},
    sync::Mutex,
};

use chrono::Local;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One line of the translation history.
#[derive(Debug, Clone)]
pub struct HistoryRecord {
    pub timestamp: String,
    pub input_text: String,
    pub translated_text: String,
    pub detected_lang: String,
    pub target_lang: String,
    pub tone: String,
}

impl HistoryRecord {
    /// Build a record stamped with the current local time.
    pub fn now(
        input_text: &str,
        translated_text: &str,
        detected_lang: &str,
        target_lang: &str,
        tone: &str,
    ) -> Self {
        Self {
            timestamp: Local::now().format(TIMESTAMP_FORMAT).to_string(),
            input_text: input_text.to_string(),
            translated_text: translated_text.to_string(),
            detected_lang: detected_lang.to_string(),
            target_lang: target_lang.to_string(),
            tone: tone.to_string(),
        }
    }

    fn fields(&self) -> [&str; 6] {
        [
            &self.timestamp,
            &self.input_text,
            &self.translated_text,
            &self.detected_lang,
            &self.target_lang,
            &self.tone,
        ]
    }
}

/// Append-only CSV log. No header row; appends are serialized in-process.
#[derive(Debug)]
pub struct HistoryLog {
    path: PathBuf,
    lock: Mutex<()>,
}

impl HistoryLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, record: &HistoryRecord) -> io::Result<()> {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| io::Error::other("history lock poisoned"))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        writer.write_record(record.fields())?;
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    #[test]
    fn appends_one_six_field_row_per_call() {
        let dir = tempfile::tempdir().unwrap();
        let log = HistoryLog::new(dir.path().join("history.csv"));

        log.append(&HistoryRecord::now("Hello", "Bonjour", "en", "fr", "casual"))
            .unwrap();
        log.append(&HistoryRecord::now(
            "Translate casually: Hi, there",
            "Salut, toi",
            "en",
            "fr",
            "casual",
        ))
        .unwrap();

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_path(log.path())
            .unwrap();
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();

        assert_eq!(rows.len(), 2);
        for row in &rows {
            assert_eq!(row.len(), 6);
            assert!(NaiveDateTime::parse_from_str(&row[0], TIMESTAMP_FORMAT).is_ok());
            assert_eq!(row[0].len(), "2024-01-31 23:59:59".len());
        }
        // embedded commas survive quoting
        assert_eq!(&rows[1][1], "Translate casually: Hi, there");
        assert_eq!(&rows[1][2], "Salut, toi");
    }

    #[test]
    fn creates_missing_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let log = HistoryLog::new(dir.path().join("logs/nested/history.csv"));
        log.append(&HistoryRecord::now("a", "b", "en", "de", "")).unwrap();
        assert!(log.path().exists());
    }
}
