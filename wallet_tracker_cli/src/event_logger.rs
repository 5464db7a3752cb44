use chrono::Utc;
use log::info;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use wallet_tracker_core::{AnalyticsSink, CoreError, Properties, SinkResult, TrackedCall};

/// Appends every analytics call to a JSON-lines file.
pub struct JsonLinesSink {
    path: PathBuf,
}

impl JsonLinesSink {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn append(&self, call: &TrackedCall) -> SinkResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut line = serde_json::to_string(call)?;
        line.push('\n');

        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| CoreError::Io(format!("Failed to open {:?}: {}", self.path, e)))?;
        f.write_all(line.as_bytes())?;
        Ok(())
    }
}

impl AnalyticsSink for JsonLinesSink {
    fn track(&self, name: &str, properties: &Properties) -> SinkResult<()> {
        info!("track {}", name);
        self.append(&TrackedCall::Track {
            name: name.to_string(),
            properties: properties.clone(),
            received_at: Utc::now(),
        })
    }

    fn identify(&self, user_id: &str, traits: &Properties) -> SinkResult<()> {
        info!("identify {}", user_id);
        self.append(&TrackedCall::Identify {
            user_id: user_id.to_string(),
            traits: traits.clone(),
            received_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_appends_one_line_per_call() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out").join("events.jsonl");
        let sink = JsonLinesSink::new(path.clone());

        let mut props = Properties::new();
        props.insert("key".to_string(), json!("value"));
        sink.track("Custom", &props).unwrap();
        sink.identify("0xAB", &Properties::new()).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<TrackedCall> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].label(), "Custom");
        assert_eq!(lines[1].label(), "identify");
        assert!(text.lines().next().unwrap().contains(r#""type":"track""#));
    }
}
