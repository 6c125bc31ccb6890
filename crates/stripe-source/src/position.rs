//! Resume position for the change iterator.
//!
//! A [`Position`] is the complete, serializable resume state of a sync
//! session. It is handed back to the caller with every emitted record so the
//! caller can persist it and later reopen the stream exactly where it left
//! off.
//!
//! ## Wire format
//!
//! ```json
//! {"mode":"incremental","watermark":1652790765,"cursor":"evt_1652447199","index":0}
//! ```
//!
//! `mode` is one of `"snapshot"` or `"incremental"` (`"cdc"` is accepted as a
//! legacy alias of `"incremental"` when decoding).

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which sub-iterator is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Walking the current state of the resource collection.
    Snapshot,
    /// Polling the change-event feed.
    Incremental,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Snapshot => "snapshot",
            Mode::Incremental => "incremental",
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Mode {
    type Err = PositionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "snapshot" => Ok(Mode::Snapshot),
            "incremental" | "cdc" => Ok(Mode::Incremental),
            other => Err(PositionError::UnexpectedMode(other.to_string())),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PositionError {
    #[error("malformed position token: {0}")]
    Format(String),

    #[error("unexpected iterator mode '{0}'")]
    UnexpectedMode(String),
}

/// Where in the logical stream the iterator is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawPosition")]
pub struct Position {
    /// Active sub-iterator.
    pub mode: Mode,
    /// Unix timestamp (seconds) that bounds the incremental window from below.
    /// Fixed when the session first starts and carried unchanged afterwards.
    pub watermark: i64,
    /// Identifier of the last item (snapshot) or of the newest event of the
    /// last fully consumed batch (incremental). Empty before the first page.
    pub cursor: String,
    /// Offset into the current incremental batch.
    pub index: usize,
}

/// Loosely-typed shape used to validate a token before building a `Position`.
///
/// `iterator_type` and `created_at` are the field names written by earlier
/// releases of the connector.
#[derive(Debug, Deserialize)]
struct RawPosition {
    #[serde(alias = "iterator_type")]
    mode: Option<String>,
    #[serde(alias = "created_at")]
    watermark: Option<i64>,
    #[serde(default)]
    cursor: String,
    #[serde(default)]
    index: i64,
}

impl TryFrom<RawPosition> for Position {
    type Error = PositionError;

    fn try_from(raw: RawPosition) -> Result<Self, Self::Error> {
        let mode = raw
            .mode
            .ok_or_else(|| PositionError::Format("\"mode\" value must be set".to_string()))?
            .parse::<Mode>()?;

        let watermark = match raw.watermark {
            Some(w) if w > 0 => w,
            Some(w) => {
                return Err(PositionError::Format(format!(
                    "\"watermark\" must be a positive unix timestamp, got {w}"
                )))
            }
            None => {
                return Err(PositionError::Format(
                    "\"watermark\" value must be set".to_string(),
                ))
            }
        };

        let index = usize::try_from(raw.index).map_err(|_| {
            PositionError::Format(format!("\"index\" must not be negative, got {}", raw.index))
        })?;

        Ok(Position {
            mode,
            watermark,
            cursor: raw.cursor,
            index,
        })
    }
}

impl Position {
    /// The canonical start-of-stream position.
    pub fn start(watermark: i64) -> Self {
        Self {
            mode: Mode::Snapshot,
            watermark,
            cursor: String::new(),
            index: 0,
        }
    }

    /// Decode a resume token.
    ///
    /// An absent token yields the start-of-stream position with the
    /// watermark set to the current time. This is the only place the clock
    /// is read during a session.
    pub fn decode(token: Option<&[u8]>) -> Result<Self, PositionError> {
        let Some(token) = token else {
            return Ok(Self::start(Utc::now().timestamp()));
        };

        let raw: RawPosition =
            serde_json::from_slice(token).map_err(|e| PositionError::Format(e.to_string()))?;
        Position::try_from(raw)
    }

    /// Encode into the opaque resume token.
    pub fn encode(&self) -> Vec<u8> {
        self.to_token_string().into_bytes()
    }

    fn to_token_string(&self) -> String {
        // Field order is fixed so equal positions always encode to equal bytes.
        format!(
            r#"{{"mode":"{}","watermark":{},"cursor":{},"index":{}}}"#,
            self.mode,
            self.watermark,
            serde_json::Value::String(self.cursor.clone()),
            self.index
        )
    }

    /// Switch to incremental mode. Has no effect once already incremental.
    pub(crate) fn enter_incremental(&mut self) {
        if self.mode == Mode::Snapshot {
            self.mode = Mode::Incremental;
            self.cursor.clear();
            self.index = 0;
        }
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_token_string())
    }
}

impl checkpoint::Checkpoint for Position {
    const SOURCE_TYPE: &'static str = "stripe";

    fn to_cli_string(&self) -> String {
        self.to_token_string()
    }

    fn from_cli_string(s: &str) -> anyhow::Result<Self> {
        Ok(Position::decode(Some(s.as_bytes()))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use checkpoint::{Checkpoint, CheckpointFile};

    fn reachable_positions() -> Vec<Position> {
        vec![
            Position::start(1652790765),
            Position {
                mode: Mode::Snapshot,
                watermark: 1652790765,
                cursor: "price_1651153850".to_string(),
                index: 0,
            },
            Position {
                mode: Mode::Incremental,
                watermark: 1652790765,
                cursor: String::new(),
                index: 3,
            },
            Position {
                mode: Mode::Incremental,
                watermark: 1652790765,
                cursor: "evt_1652447199".to_string(),
                index: 0,
            },
            Position {
                mode: Mode::Incremental,
                watermark: i64::MAX,
                cursor: "evt_\"quoted\"".to_string(),
                index: 99,
            },
        ]
    }

    #[test]
    fn test_roundtrip_reachable_positions() {
        for p in reachable_positions() {
            let decoded = Position::decode(Some(&p.encode())).unwrap();
            assert_eq!(decoded, p);
        }
    }

    #[test]
    fn test_encode_is_deterministic() {
        let p = Position {
            mode: Mode::Incremental,
            watermark: 1652790765,
            cursor: "evt_1".to_string(),
            index: 2,
        };
        assert_eq!(p.encode(), p.clone().encode());
        assert_eq!(
            String::from_utf8(p.encode()).unwrap(),
            r#"{"mode":"incremental","watermark":1652790765,"cursor":"evt_1","index":2}"#
        );
    }

    #[test]
    fn test_decode_absent_token_starts_snapshot_now() {
        let before = Utc::now().timestamp();
        let p = Position::decode(None).unwrap();
        let after = Utc::now().timestamp();

        assert_eq!(p.mode, Mode::Snapshot);
        assert!(p.watermark >= before && p.watermark <= after);
        assert!(p.cursor.is_empty());
        assert_eq!(p.index, 0);
    }

    #[test]
    fn test_decode_legacy_cdc_mode() {
        let p = Position::decode(Some(
            br#"{"mode":"cdc","created_at":1652790765,"cursor":"evt_1","index":1}"#,
        ))
        .unwrap();
        assert_eq!(p.mode, Mode::Incremental);
        assert_eq!(p.watermark, 1652790765);
        assert_eq!(p.cursor, "evt_1");
        assert_eq!(p.index, 1);
    }

    #[test]
    fn test_decode_optional_fields_default() {
        let p = Position::decode(Some(br#"{"mode":"snapshot","watermark":10}"#)).unwrap();
        assert_eq!(p, Position::start(10));
    }

    #[test]
    fn test_decode_unexpected_mode() {
        let err = Position::decode(Some(br#"{"mode":"bogus","watermark":10}"#)).unwrap_err();
        assert_eq!(err, PositionError::UnexpectedMode("bogus".to_string()));
    }

    #[test]
    fn test_decode_format_errors() {
        let cases: &[&[u8]] = &[
            b"not json",
            b"",
            br#"{"watermark":10}"#,
            br#"{"mode":"snapshot"}"#,
            br#"{"mode":"snapshot","watermark":0}"#,
            br#"{"mode":"snapshot","watermark":10,"index":-1}"#,
            br#"{"mode":"snapshot","watermark":"yesterday"}"#,
        ];
        for case in cases {
            let err = Position::decode(Some(case)).unwrap_err();
            assert!(
                matches!(err, PositionError::Format(_)),
                "expected format error for {:?}, got {err:?}",
                String::from_utf8_lossy(case)
            );
        }
    }

    #[test]
    fn test_enter_incremental_clears_cursor_once() {
        let mut p = Position {
            mode: Mode::Snapshot,
            watermark: 10,
            cursor: "plan_3".to_string(),
            index: 0,
        };
        p.enter_incremental();
        assert_eq!(p.mode, Mode::Incremental);
        assert!(p.cursor.is_empty());
        assert_eq!(p.watermark, 10);

        p.cursor = "evt_9".to_string();
        p.enter_incremental();
        assert_eq!(p.cursor, "evt_9");
    }

    #[test]
    fn test_checkpoint_cli_string_roundtrip() {
        let p = Position {
            mode: Mode::Incremental,
            watermark: 1652790765,
            cursor: "evt_1652447199".to_string(),
            index: 0,
        };
        let parsed = Position::from_cli_string(&p.to_cli_string()).unwrap();
        assert_eq!(parsed, p);
        assert!(Position::from_cli_string("{}").is_err());
    }

    #[test]
    fn test_checkpoint_file_roundtrip() {
        let p = Position {
            mode: Mode::Snapshot,
            watermark: 1652790765,
            cursor: "sub_1".to_string(),
            index: 0,
        };
        let file = CheckpointFile::new(&p, "subscription").unwrap();
        assert_eq!(file.source_type(), Position::SOURCE_TYPE);

        let parsed: Position = file.parse().unwrap();
        assert_eq!(parsed, p);
    }

    #[test]
    fn test_serde_deserialize_validates() {
        let err = serde_json::from_str::<Position>(r#"{"mode":"bogus","watermark":1}"#);
        assert!(err.is_err());
    }
}
