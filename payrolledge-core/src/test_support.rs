// src/test_support.rs

use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;

use crate::api_client::ApiClient;
use crate::config::ClientConfig;
use crate::download::MemorySink;
use crate::models::PayrollStatus;
use crate::notify::RecordingNotifier;
use crate::session::SessionContext;

pub(crate) const TEST_TOKEN: &str = "test-access-token";

/// Client pointed at a mock server, with its own token file in a temp dir.
pub(crate) struct Harness {
    pub client: ApiClient,
    pub notifier: Arc<RecordingNotifier>,
    pub sink: Arc<MemorySink>,
    pub _dir: TempDir,
}

pub(crate) fn harness(base_url: &str) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let session = SessionContext::new(dir.path().join("token.json"));
    session.persist(TEST_TOKEN).unwrap();

    let config = ClientConfig {
        api_base_url: base_url.to_string(),
        request_timeout_secs: 5,
        ..ClientConfig::default()
    };
    Harness {
        client: ApiClient::new(&config, session).unwrap(),
        notifier: Arc::new(RecordingNotifier::new()),
        sink: Arc::new(MemorySink::new()),
        _dir: dir,
    }
}

pub(crate) fn record_json(id: i64, employee_id: i64, status: PayrollStatus, month: u32, year: i32) -> Value {
    json!({
        "id": id, "employee_id": employee_id, "month": month, "year": year,
        "basic_salary": 30000, "hra": 12000, "conveyance": 1600, "special_allowance": 6400,
        "overtime_amount": 0, "bonus": 0, "arrears": 0, "other_earnings": 0,
        "pf_employee": 1800, "pf_employer": 1800, "esic_employee": 0, "esic_employer": 0,
        "professional_tax": 200, "tds": 0, "other_deductions": 0,
        "gross_earnings": 50000, "total_deductions": 2000, "net_salary": 48000,
        "working_days": 22, "days_present": 22, "days_absent": 0, "overtime_hours": 0,
        "status": status.as_str(),
        "processed_by": 1, "processed_at": "2025-04-01T10:00:00",
        "approved_by": null, "approved_at": null, "payment_date": null,
        "payment_mode": null, "remarks": null, "created_at": "2025-04-01T10:00:00"
    })
}

pub(crate) fn page_json(items: Vec<Value>) -> Value {
    let total = items.len();
    json!({
        "items": items,
        "total": total,
        "page": 1,
        "page_size": 50,
        "total_pages": 1
    })
}
