//! JSON documents printed on stdout.

use mediagate_core::{AppError, ErrorMetadata, Identity, Record};
use mediagate_workflow::Outcome;
use serde::Serialize;
use serde_json::{json, Value};

#[derive(Serialize)]
struct RecordView<'a> {
    #[serde(flatten)]
    record: &'a Record,
    public_path: String,
}

pub fn outcome(outcome: &Outcome) -> Value {
    match outcome {
        Outcome::Done => json!({ "outcome": "done" }),
        Outcome::Refused(violation) => json!({
            "outcome": "refused",
            "code": violation.code(),
            "message": violation.to_string(),
        }),
    }
}

/// A fault as shown to the operator; sensitive details stay in the log.
pub fn fault(err: &AppError) -> Value {
    let mut doc = json!({
        "outcome": "error",
        "code": err.error_code(),
        "message": err.client_message(),
        "recoverable": err.is_recoverable(),
    });
    if let Some(action) = err.suggested_action() {
        doc["suggested_action"] = json!(action);
    }
    doc
}

pub fn records(records: &[Record], public_path: impl Fn(&str) -> String) -> Value {
    let views: Vec<RecordView<'_>> = records
        .iter()
        .map(|record| RecordView {
            record,
            public_path: public_path(&record.path),
        })
        .collect();
    json!({ "records": views })
}

pub fn identity(identity: &Identity) -> Value {
    json!({ "identity": identity })
}
