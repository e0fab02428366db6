// src/payroll_view.rs

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, error, info, warn};

use crate::api_client::ApiClient;
use crate::download::{DownloadArtifact, DownloadSink};
use crate::error::PayrollError;
use crate::models::{
    Employee, MarkPaidReceipt, PayrollPeriod, PayrollRecord, PayrollStatus, PayrollSummary,
};
use crate::notify::Notifier;

pub const RECORDS_PAGE_SIZE: u32 = 50;
pub const EMPLOYEE_LOOKUP_PAGE_SIZE: u32 = 100;

// --- Gating rules ---

/// Per-row actions the list offers for a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordActions {
    pub download_payslip: bool,
    pub approve: bool,
}

impl RecordActions {
    pub fn for_status(status: PayrollStatus) -> Self {
        Self {
            download_payslip: status != PayrollStatus::Draft,
            approve: status.can_advance_to(PayrollStatus::Approved),
        }
    }
}

/// "Mark as Paid" is offered only while some record is approved and none is paid yet.
pub fn can_mark_as_paid(records: &[PayrollRecord]) -> bool {
    let any_approved = records.iter().any(|r| r.status == PayrollStatus::Approved);
    let any_paid = records.iter().any(|r| r.status == PayrollStatus::Paid);
    any_approved && !any_paid
}

// --- Summary cards ---

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryCard {
    pub label: &'static str,
    pub value: String,
}

/// Rupees in lakhs with one decimal, e.g. `₹4.2L`.
pub fn format_lakhs(amount: Decimal) -> String {
    let lakhs = (amount / dec!(100000))
        .round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero);
    format!("₹{:.1}L", lakhs)
}

pub fn summary_cards(summary: &PayrollSummary) -> Vec<SummaryCard> {
    vec![
        SummaryCard {
            label: "Total Employees",
            value: summary.total_employees.to_string(),
        },
        SummaryCard {
            label: "Total Gross",
            value: format_lakhs(summary.total_gross),
        },
        SummaryCard {
            label: "Total Deductions",
            value: format_lakhs(summary.total_deductions),
        },
        SummaryCard {
            label: "Total Net Salary",
            value: format_lakhs(summary.total_net),
        },
    ]
}

// --- View ---

#[derive(Debug)]
struct ViewState {
    period: PayrollPeriod,
    records: Vec<PayrollRecord>,
    summary: Option<PayrollSummary>,
    employees: Vec<Employee>,
    loading: bool,
    // Bumped on every period change; responses started under an older value are dropped.
    generation: u64,
    // Bumped by every fetch_records call; only the latest fetch may clear `loading`.
    fetch_ticket: u64,
}

/// Clears `loading` when a fetch settles or is dropped, unless a newer fetch owns it.
struct LoadingGuard<'a> {
    state: &'a Mutex<ViewState>,
    ticket: u64,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.fetch_ticket == self.ticket {
            state.loading = false;
        }
    }
}

/// Payroll records and summary for one selected period.
///
/// Every mutation is followed by a full re-fetch of the list; nothing is
/// patched locally because the backend owns every computed amount.
pub struct PayrollListView {
    client: ApiClient,
    notifier: Arc<dyn Notifier>,
    sink: Arc<dyn DownloadSink>,
    state: Mutex<ViewState>,
}

impl PayrollListView {
    pub fn new(
        client: ApiClient,
        notifier: Arc<dyn Notifier>,
        sink: Arc<dyn DownloadSink>,
        period: PayrollPeriod,
    ) -> Self {
        Self {
            client,
            notifier,
            sink,
            state: Mutex::new(ViewState {
                period,
                records: Vec::new(),
                summary: None,
                employees: Vec::new(),
                loading: false,
                generation: 0,
                fetch_ticket: 0,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, ViewState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // --- Accessors ---

    pub fn period(&self) -> PayrollPeriod {
        self.state().period
    }

    pub fn records(&self) -> Vec<PayrollRecord> {
        self.state().records.clone()
    }

    pub fn summary(&self) -> Option<PayrollSummary> {
        self.state().summary.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state().loading
    }

    pub fn can_mark_as_paid(&self) -> bool {
        can_mark_as_paid(&self.state().records)
    }

    pub fn actions_for(&self, record: &PayrollRecord) -> RecordActions {
        RecordActions::for_status(record.status)
    }

    /// Empty when there is no summary for the period.
    pub fn summary_cards(&self) -> Vec<SummaryCard> {
        self.state()
            .summary
            .as_ref()
            .map(summary_cards)
            .unwrap_or_default()
    }

    pub fn employee_name(&self, employee_id: i64) -> String {
        self.state()
            .employees
            .iter()
            .find(|e| e.id == employee_id)
            .map(Employee::display_name)
            .unwrap_or_else(|| format!("Employee #{}", employee_id))
    }

    fn record_status(&self, record_id: i64) -> Option<PayrollStatus> {
        self.state()
            .records
            .iter()
            .find(|r| r.id == record_id)
            .map(|r| r.status)
    }

    /// Switches the selected period. Responses still in flight for the old
    /// period will be ignored when they land.
    pub fn set_period(&self, period: PayrollPeriod) {
        let mut state = self.state();
        if state.period != period {
            state.period = period;
            state.generation += 1;
            debug!(
                "Payroll view switched to {} (generation {})",
                period, state.generation
            );
        }
    }

    // --- Fetching ---

    /// Replaces the record list with the backend's records for the selected period.
    pub async fn fetch_records(&self) -> Result<(), PayrollError> {
        let (period, generation, _loading) = {
            let mut state = self.state();
            state.loading = true;
            state.fetch_ticket += 1;
            let guard = LoadingGuard {
                state: &self.state,
                ticket: state.fetch_ticket,
            };
            (state.period, state.generation, guard)
        };

        let result = self.client.list_records(period, RECORDS_PAGE_SIZE).await;

        let mut state = self.state();
        if state.generation != generation {
            debug!(
                "Discarding stale payroll records response for {} (generation {} != {})",
                period, generation, state.generation
            );
            return Ok(());
        }

        match result {
            Ok(page) => {
                info!(
                    "Loaded {} payroll records for {} (total {})",
                    page.items.len(),
                    period,
                    page.total
                );
                state.records = page.items;
                Ok(())
            }
            Err(e) => {
                drop(state);
                error!("Failed to fetch payroll records for {}: {}", period, e);
                self.notifier.error("Failed to fetch payroll records");
                Err(e)
            }
        }
    }

    /// Loads the summary. Any failure means "no summary for this period".
    pub async fn fetch_summary(&self) {
        let (period, generation) = {
            let state = self.state();
            (state.period, state.generation)
        };

        let result = self.client.get_summary(period).await;

        let mut state = self.state();
        if state.generation != generation {
            debug!("Discarding stale summary response for {}", period);
            return;
        }
        state.summary = match result {
            Ok(summary) if summary.total_employees > 0 => Some(summary),
            Ok(_) => {
                debug!("No processed payroll for {}, summary is empty", period);
                None
            }
            Err(e) => {
                debug!("No payroll summary for {}: {}", period, e);
                None
            }
        };
    }

    /// Loads the employee lookup used to label rows. Failures only get logged.
    pub async fn fetch_employees(&self) {
        match self.client.list_employees(EMPLOYEE_LOOKUP_PAGE_SIZE).await {
            Ok(page) => self.state().employees = page.items,
            Err(e) => warn!("Failed to fetch employees: {}", e),
        }
    }

    /// Everything the page loads whenever the period changes.
    pub async fn refresh(&self) -> Result<(), PayrollError> {
        let (records, _, _) = tokio::join!(
            self.fetch_records(),
            self.fetch_employees(),
            self.fetch_summary()
        );
        records
    }

    // --- Actions ---

    /// Approves a processed record, then re-fetches the list. A failed
    /// re-fetch toasts on its own and does not turn the approval into an error.
    pub async fn approve(&self, record_id: i64) -> Result<(), PayrollError> {
        match self.record_status(record_id) {
            Some(PayrollStatus::Processed) => {}
            Some(status) => {
                return Err(PayrollError::ActionNotAllowed(format!(
                    "record {} is {}, only processed records can be approved",
                    record_id, status
                )))
            }
            None => {
                return Err(PayrollError::ActionNotAllowed(format!(
                    "record {} is not in the list for {}",
                    record_id,
                    self.period()
                )))
            }
        }

        match self.client.approve_record(record_id).await {
            Ok(record) => {
                info!("Record {} approved (status {})", record_id, record.status);
                self.notifier.success("Payroll approved");
                self.refetch_after_write().await;
                Ok(())
            }
            Err(e) => {
                error!("Approving record {} failed: {}", record_id, e);
                self.notifier.error("Failed to approve payroll");
                Err(e)
            }
        }
    }

    /// Moves every approved record of the period to paid, then re-fetches the list.
    pub async fn mark_as_paid(
        &self,
        payment_date: Option<NaiveDate>,
    ) -> Result<MarkPaidReceipt, PayrollError> {
        let period = {
            let state = self.state();
            if !can_mark_as_paid(&state.records) {
                return Err(PayrollError::ActionNotAllowed(format!(
                    "{} needs approved records and no paid records before it can be marked as paid",
                    state.period
                )));
            }
            state.period
        };

        match self.client.mark_paid(period, payment_date).await {
            Ok(receipt) => {
                info!(
                    "{} ({} records, net {})",
                    receipt.message, receipt.total_records, receipt.total_net_paid
                );
                self.notifier.success("Payroll marked as paid");
                self.refetch_after_write().await;
                Ok(receipt)
            }
            Err(e) => {
                error!("Marking {} as paid failed: {}", period, e);
                self.notifier.error(&e.detail_or("Failed to mark as paid"));
                Err(e)
            }
        }
    }

    async fn refetch_after_write(&self) {
        if let Err(e) = self.fetch_records().await {
            warn!("List is stale until the next refresh: {}", e);
        }
    }

    /// Saves the record's payslip as `payslip_{recordId}.pdf`. Draft records have none.
    pub async fn download_payslip(&self, record_id: i64) -> Result<PathBuf, PayrollError> {
        match self.record_status(record_id) {
            Some(status) if RecordActions::for_status(status).download_payslip => {}
            Some(status) => {
                return Err(PayrollError::ActionNotAllowed(format!(
                    "record {} is {}, payslips exist only after processing",
                    record_id, status
                )))
            }
            None => {
                return Err(PayrollError::ActionNotAllowed(format!(
                    "record {} is not in the list for {}",
                    record_id,
                    self.period()
                )))
            }
        }

        let result = async {
            let bytes = self.client.payslip_pdf(record_id).await?;
            self.sink.save(&DownloadArtifact::payslip(record_id, bytes))
        }
        .await;

        match result {
            Ok(path) => {
                self.notifier.success("Payslip downloaded");
                Ok(path)
            }
            Err(e) => {
                error!("Payslip download for record {} failed: {}", record_id, e);
                self.notifier.error("Failed to download payslip");
                Err(e)
            }
        }
    }

    // --- Read-only extras ---

    pub async fn get_record(&self, record_id: i64) -> Result<PayrollRecord, PayrollError> {
        self.client.get_record(record_id).await
    }

    /// The backend's calculation preview for one employee in the selected period.
    pub async fn calculate_preview(&self, employee_id: i64) -> Result<Value, PayrollError> {
        self.client.calculate(employee_id, self.period()).await
    }
}

/// Net payroll for the dashboard tile; zero when the period has no summary.
pub async fn dashboard_total_net(client: &ApiClient, period: PayrollPeriod) -> Decimal {
    match client.get_summary(period).await {
        Ok(summary) => summary.total_net,
        Err(e) => {
            debug!("No summary for dashboard ({}): {}", period, e);
            Decimal::ZERO
        }
    }
}
