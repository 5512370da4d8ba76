//! Newline-delimited JSON spoken with the host editor extension.
//!
//! Inbound, one object per line, discriminated by `"type"`. Outbound, one
//! [`EngineEvent`] per line, discriminated by `"event"`.

use std::path::PathBuf;

use fixtrace_core::{Diagnostic, EngineEvent};
use serde::Deserialize;
use tokio::io::{AsyncWrite, AsyncWriteExt};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostMessage {
    /// A document was opened. `language` defaults to one inferred from the
    /// file extension.
    Open {
        file: PathBuf,
        #[serde(default)]
        language: Option<String>,
        text: String,
    },
    /// The buffer changed. `text`, when present, is the full new content.
    Change {
        file: PathBuf,
        #[serde(default)]
        text: Option<String>,
        #[serde(default)]
        changes: Vec<serde_json::Value>,
    },
    Close {
        file: PathBuf,
    },
    Diagnostics {
        files: Vec<FileDiagnostics>,
    },
    Log {
        text: String,
    },
    WillSave {
        file: PathBuf,
        text: String,
    },
    DidSave {
        file: PathBuf,
        text: String,
    },
    Track {
        file: PathBuf,
    },
    Untrack,
    Roots {
        roots: Vec<PathBuf>,
    },
}

/// The complete current diagnostic list for one file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FileDiagnostics {
    pub file: PathBuf,
    #[serde(default)]
    pub diagnostics: Vec<Diagnostic>,
}

/// Decodes one input line. Blank lines decode to `None`.
pub fn parse_line(line: &str) -> Result<Option<HostMessage>, serde_json::Error> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    serde_json::from_str(line).map(Some)
}

/// Writes engine events as JSON lines, flushing after each.
pub struct EventWriter<W> {
    out: W,
}

impl<W: AsyncWrite + Unpin> EventWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub async fn write(&mut self, event: &EngineEvent) -> anyhow::Result<()> {
        let mut line = serde_json::to_string(event)?;
        line.push('\n');
        self.out.write_all(line.as_bytes()).await?;
        self.out.flush().await?;
        Ok(())
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fixtrace_core::types::UNKNOWN;
    use fixtrace_core::{CapturedError, ErrorSource, Severity};

    #[test]
    fn decodes_diagnostics_with_integer_severity() {
        let line = r#"{"type":"diagnostics","files":[{"file":"/w/a.ts","diagnostics":[
            {"range":{"start":{"line":4,"character":2},"end":{"line":4,"character":9}},
             "message":"Expected ';'.","severity":0}]}]}"#
            .replace('\n', "");
        let Some(HostMessage::Diagnostics { files }) = parse_line(&line).unwrap() else {
            panic!("expected diagnostics");
        };
        assert_eq!(files[0].file, PathBuf::from("/w/a.ts"));
        let diagnostic = &files[0].diagnostics[0];
        assert_eq!(diagnostic.severity, Severity::Error);
        assert_eq!(diagnostic.range.start.line, 4);
    }

    #[test]
    fn rejects_unknown_severity_codes() {
        let line = r#"{"type":"diagnostics","files":[{"file":"/w/a.ts","diagnostics":[{"range":{"start":{"line":0,"character":0},"end":{"line":0,"character":1}},"message":"x","severity":7}]}]}"#;
        assert!(parse_line(line).is_err());
    }

    #[test]
    fn decodes_change_and_unit_messages() {
        let change = parse_line(r#"{"type":"change","file":"/w/a.ts","changes":[{"text":"x"}]}"#)
            .unwrap()
            .unwrap();
        assert_eq!(
            change,
            HostMessage::Change {
                file: PathBuf::from("/w/a.ts"),
                text: None,
                changes: vec![serde_json::json!({"text": "x"})],
            }
        );
        assert_eq!(parse_line(r#"{"type":"untrack"}"#).unwrap(), Some(HostMessage::Untrack));
        assert_eq!(parse_line("   ").unwrap(), None);
        assert!(parse_line("not json").is_err());
        assert!(parse_line(r#"{"type":"explode"}"#).is_err());
    }

    #[tokio::test]
    async fn writes_one_tagged_object_per_line() {
        let event = EngineEvent::ErrorDetected(CapturedError {
            id: uuid::Uuid::nil(),
            message: "Error: boom".to_owned(),
            file: PathBuf::from(UNKNOWN),
            line: None,
            language: UNKNOWN.to_owned(),
            code_context: String::new(),
            severity: Severity::Error,
            source: ErrorSource::LogOutput,
            timestamp: 1_700_000_000_000,
        });
        let mut writer = EventWriter::new(Vec::new());
        writer.write(&event).await.unwrap();
        writer.write(&event).await.unwrap();
        let out = String::from_utf8(writer.into_inner()).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        let value: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(value["event"], "error_detected");
        assert_eq!(value["source"], "log-output");
        assert_eq!(value["severity"], "error");
        assert_eq!(value["file"], "unknown");
        assert!(value["line"].is_null());
        assert_eq!(value["codeContext"], "");
    }
}
