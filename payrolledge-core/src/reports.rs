// src/reports.rs

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{error, info};

use crate::api_client::ApiClient;
use crate::download::{DownloadArtifact, DownloadSink};
use crate::error::PayrollError;
use crate::models::PayrollPeriod;
use crate::notify::Notifier;

/// Step-by-step guidance shown alongside the report list. The backend enforces
/// the ordering; the client only explains it.
pub const JOURNAL_FLOW_GUIDANCE: &str = "1. Journal Entries (Accrual) - download after processing payroll (before actual payment)\n\
2. Go to the Payroll page and run \"Mark as Paid\"\n\
3. Payment Entries - download after marking as paid (actual bank payments)";

pub const PAYSLIP_GUIDANCE: &str = "To download individual employee payslips, use the download action next to each record on the Payroll page.";

const NO_PAID_RECORDS_HINT: &str = "No paid payroll records found. Mark payroll as paid first.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ReportKind {
    Attendance,
    #[default]
    Payroll,
    Pfesi,
    Journal,
    Payment,
}

impl ReportKind {
    pub const ALL: [ReportKind; 5] = [
        ReportKind::Payroll,
        ReportKind::Attendance,
        ReportKind::Pfesi,
        ReportKind::Journal,
        ReportKind::Payment,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportKind::Attendance => "attendance",
            ReportKind::Payroll => "payroll",
            ReportKind::Pfesi => "pfesi",
            ReportKind::Journal => "journal",
            ReportKind::Payment => "payment",
        }
    }

    pub fn endpoint(&self) -> &'static str {
        match self {
            ReportKind::Attendance => "attendance-report",
            ReportKind::Payroll => "payroll-register",
            ReportKind::Pfesi => "pf-esi-report",
            ReportKind::Journal => "journal-entries",
            ReportKind::Payment => "payment-entries",
        }
    }

    pub fn csv_endpoint(&self) -> Option<&'static str> {
        match self {
            ReportKind::Journal => Some("journal-entries-csv"),
            ReportKind::Payment => Some("payment-entries-csv"),
            _ => None,
        }
    }

    pub fn offers_csv(&self) -> bool {
        self.csv_endpoint().is_some()
    }

    pub fn title(&self) -> &'static str {
        match self {
            ReportKind::Attendance => "Attendance Report",
            ReportKind::Payroll => "Payroll Register",
            ReportKind::Pfesi => "PF/ESI Report",
            ReportKind::Journal => "Journal Entries (Accrual)",
            ReportKind::Payment => "Payment Entries",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ReportKind::Attendance => "Employee attendance details",
            ReportKind::Payroll => "Complete payroll summary for the month",
            ReportKind::Pfesi => "Statutory contributions report",
            ReportKind::Journal => "Before payment - for Tally/QuickBooks",
            ReportKind::Payment => "After payment - bank & liability settlements",
        }
    }

    fn json_success_message(&self) -> &'static str {
        match self {
            ReportKind::Journal => "Journal entries downloaded",
            ReportKind::Payment => "Payment entries downloaded",
            _ => "Report downloaded successfully",
        }
    }

    fn csv_success_message(&self) -> &'static str {
        match self {
            ReportKind::Payment => "Payment entries CSV downloaded",
            _ => "Journal entries CSV downloaded",
        }
    }

    fn json_fallback_error(&self) -> &'static str {
        match self {
            ReportKind::Payment => NO_PAID_RECORDS_HINT,
            _ => "Failed to download report",
        }
    }

    fn csv_fallback_error(&self) -> &'static str {
        match self {
            ReportKind::Payment => NO_PAID_RECORDS_HINT,
            _ => "Failed to download",
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportKind {
    type Err = PayrollError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ReportKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                PayrollError::ConfigError(format!(
                    "Unknown report type '{}', expected one of: attendance, payroll, pfesi, journal, payment",
                    s
                ))
            })
    }
}

#[derive(Debug, Clone, Copy)]
struct ReportsState {
    kind: ReportKind,
    period: PayrollPeriod,
    department_id: Option<i64>,
    loading: bool,
}

/// The reports page: one selected report kind, one period, one shared loading flag.
pub struct ReportsWorkflow {
    client: ApiClient,
    notifier: Arc<dyn Notifier>,
    sink: Arc<dyn DownloadSink>,
    state: Mutex<ReportsState>,
}

impl ReportsWorkflow {
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
            state: Mutex::new(ReportsState {
                kind: ReportKind::default(),
                period,
                department_id: None,
                loading: false,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, ReportsState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn select(&self, kind: ReportKind) {
        self.state().kind = kind;
    }

    pub fn selected(&self) -> ReportKind {
        self.state().kind
    }

    pub fn set_period(&self, period: PayrollPeriod) {
        self.state().period = period;
    }

    pub fn period(&self) -> PayrollPeriod {
        self.state().period
    }

    /// Department filter, applied to the attendance report only.
    pub fn set_department(&self, department_id: Option<i64>) {
        self.state().department_id = department_id;
    }

    pub fn is_loading(&self) -> bool {
        self.state().loading
    }

    /// Whether the CSV action is shown for the current selection.
    pub fn offers_csv(&self) -> bool {
        self.selected().offers_csv()
    }

    fn begin(&self) -> ReportsState {
        let mut state = self.state();
        state.loading = true;
        *state
    }

    fn finish(&self) {
        self.state().loading = false;
    }

    /// Fetches the selected report as JSON and saves it as
    /// `{reportType}_{month}_{year}.json`.
    pub async fn generate_report(&self) -> Result<PathBuf, PayrollError> {
        let snapshot = self.begin();
        let result = self.fetch_and_save_json(snapshot).await;
        self.finish();

        match result {
            Ok(path) => {
                self.notifier.success(snapshot.kind.json_success_message());
                Ok(path)
            }
            Err(e) => {
                error!(
                    "Generating {} for {} failed: {}",
                    snapshot.kind, snapshot.period, e
                );
                self.notifier
                    .error(&e.detail_or(snapshot.kind.json_fallback_error()));
                Err(e)
            }
        }
    }

    async fn fetch_and_save_json(&self, snapshot: ReportsState) -> Result<PathBuf, PayrollError> {
        let payload = self
            .client
            .report_json(snapshot.kind, snapshot.period, snapshot.department_id)
            .await?;
        let artifact = DownloadArtifact::json_report(snapshot.kind, snapshot.period, &payload)?;
        self.sink.save(&artifact)
    }

    /// Saves the CSV export of the selected report. Only journal and payment
    /// entries have one.
    pub async fn download_csv(&self) -> Result<PathBuf, PayrollError> {
        let kind = self.selected();
        if !kind.offers_csv() {
            return Err(PayrollError::ActionNotAllowed(format!(
                "{} has no CSV export",
                kind.title()
            )));
        }

        let snapshot = self.begin();
        let result = async {
            let bytes = self.client.report_csv(snapshot.kind, snapshot.period).await?;
            let artifact = DownloadArtifact::csv_report(snapshot.kind, snapshot.period, bytes);
            self.sink.save(&artifact)
        }
        .await;
        self.finish();

        match result {
            Ok(path) => {
                self.notifier.success(snapshot.kind.csv_success_message());
                Ok(path)
            }
            Err(e) => {
                error!(
                    "CSV export of {} for {} failed: {}",
                    snapshot.kind, snapshot.period, e
                );
                self.notifier
                    .error(&e.detail_or(snapshot.kind.csv_fallback_error()));
                Err(e)
            }
        }
    }

    /// Payslips are always PDF bytes, saved as `payslip_{recordId}.pdf`.
    pub async fn download_payslip(&self, record_id: i64) -> Result<PathBuf, PayrollError> {
        let result = async {
            let bytes = self.client.payslip_pdf(record_id).await?;
            self.sink.save(&DownloadArtifact::payslip(record_id, bytes))
        }
        .await;

        match result {
            Ok(path) => {
                info!("Payslip for record {} saved to {:?}", record_id, path);
                Ok(path)
            }
            Err(e) => {
                self.notifier.error("Failed to download payslip");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_journal_and_payment_offer_csv() {
        let with_csv: Vec<_> = ReportKind::ALL
            .into_iter()
            .filter(ReportKind::offers_csv)
            .collect();
        assert_eq!(with_csv, vec![ReportKind::Journal, ReportKind::Payment]);
    }

    #[test]
    fn test_parse_report_kind() {
        assert_eq!("PFESI".parse::<ReportKind>().unwrap(), ReportKind::Pfesi);
        assert_eq!(" journal ".parse::<ReportKind>().unwrap(), ReportKind::Journal);
        assert!("form16".parse::<ReportKind>().is_err());
        assert_eq!(ReportKind::default(), ReportKind::Payroll);
    }
}
