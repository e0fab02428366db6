// src/process.rs

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info};

use crate::api_client::ApiClient;
use crate::error::PayrollError;
use crate::models::{PayrollPeriod, ProcessRequest};
use crate::notify::Notifier;
use crate::route::Route;

/// Submits a processing run for a period and says where to go next.
pub struct PayrollProcessTrigger {
    client: ApiClient,
    notifier: Arc<dyn Notifier>,
    processing: AtomicBool,
}

impl PayrollProcessTrigger {
    pub fn new(client: ApiClient, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            client,
            notifier,
            processing: AtomicBool::new(false),
        }
    }

    pub fn is_processing(&self) -> bool {
        self.processing.load(Ordering::SeqCst)
    }

    /// Processes payroll for `period`, for all active employees when
    /// `employee_ids` is `None`. On success the caller should show the
    /// payroll list; on failure it stays where it is.
    pub async fn process(
        &self,
        period: PayrollPeriod,
        employee_ids: Option<Vec<i64>>,
    ) -> Result<Route, PayrollError> {
        if self.processing.swap(true, Ordering::SeqCst) {
            return Err(PayrollError::ActionNotAllowed(
                "payroll processing is already running".to_string(),
            ));
        }

        let request = ProcessRequest::new(period, employee_ids);
        let result = self.client.process(&request).await;
        self.processing.store(false, Ordering::SeqCst);

        match result {
            Ok(records) => {
                info!("Processed {} payroll records for {}", records.len(), period);
                self.notifier.success("Payroll processed successfully");
                Ok(Route::PayrollList)
            }
            Err(e) => {
                error!("Processing payroll for {} failed: {}", period, e);
                self.notifier.error(&e.detail_or("Failed to process payroll"));
                Err(e)
            }
        }
    }
}
