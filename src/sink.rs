//! Destinations for change records.

use std::io::Write;

use anyhow::Context;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::value::RawValue;
use stripe_sync_source::{ChangeOp, ChangeRecord, RecordKey};

/// Where a sync session sends its records.
///
/// `flush` is called before each checkpoint, so anything written before it
/// must be durable once it returns.
#[async_trait]
pub trait RecordSink: Send {
    async fn write(&mut self, record: &ChangeRecord) -> anyhow::Result<()>;

    async fn flush(&mut self) -> anyhow::Result<()>;
}

#[derive(Serialize)]
struct OutputLine<'a> {
    position: String,
    operation: ChangeOp,
    key: &'a RecordKey,
    payload: Option<&'a RawValue>,
    timestamp: i64,
    resource: &'a str,
}

/// Writes one JSON object per record, newline separated.
pub struct JsonlSink<W: Write + Send> {
    writer: W,
}

impl<W: Write + Send> JsonlSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// Render a record as the JSON object written by [`JsonlSink`].
pub fn to_json_line(record: &ChangeRecord) -> anyhow::Result<String> {
    let payload = record
        .payload
        .as_deref()
        .map(|bytes| {
            let text = std::str::from_utf8(bytes).context("Payload is not UTF-8")?;
            serde_json::from_str::<&RawValue>(text).context("Payload is not JSON")
        })
        .transpose()?;

    let line = OutputLine {
        position: record.position.to_string(),
        operation: record.op,
        key: &record.key,
        payload,
        timestamp: record.timestamp,
        resource: &record.resource,
    };
    Ok(serde_json::to_string(&line)?)
}

#[async_trait]
impl<W: Write + Send> RecordSink for JsonlSink<W> {
    async fn write(&mut self, record: &ChangeRecord) -> anyhow::Result<()> {
        let line = to_json_line(record)
            .with_context(|| format!("Failed to encode record {}", record.id()))?;
        writeln!(self.writer, "{line}").context("Failed to write record")?;
        Ok(())
    }

    async fn flush(&mut self) -> anyhow::Result<()> {
        self.writer.flush().context("Failed to flush output")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use stripe_sync_source::{Mode, Position};

    fn record(op: ChangeOp, payload: Option<&str>) -> ChangeRecord {
        ChangeRecord {
            position: Position {
                mode: Mode::Incremental,
                watermark: 1652790765,
                cursor: "evt_1".to_string(),
                index: 0,
            },
            op,
            key: RecordKey {
                id: "sub_1".to_string(),
            },
            payload: payload.map(|p| p.as_bytes().to_vec()),
            timestamp: 1652790800,
            resource: "subscription".to_string(),
        }
    }

    #[tokio::test]
    async fn test_jsonl_line_shape() {
        let mut sink = JsonlSink::new(Vec::new());
        sink.write(&record(ChangeOp::Update, Some(r#"{"id":"sub_1","status":"active"}"#)))
            .await
            .unwrap();
        sink.write(&record(ChangeOp::Delete, None)).await.unwrap();
        sink.flush().await.unwrap();

        let output = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<Value> = output
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);

        assert_eq!(
            lines[0],
            json!({
                "position": r#"{"mode":"incremental","watermark":1652790765,"cursor":"evt_1","index":0}"#,
                "operation": "update",
                "key": {"id": "sub_1"},
                "payload": {"id": "sub_1", "status": "active"},
                "timestamp": 1652790800,
                "resource": "subscription"
            })
        );
        assert_eq!(lines[1]["operation"], "delete");
        assert_eq!(lines[1]["payload"], Value::Null);
    }

    #[test]
    fn test_non_json_payload_is_rejected() {
        assert!(to_json_line(&record(ChangeOp::Create, Some("not json"))).is_err());
    }
}
