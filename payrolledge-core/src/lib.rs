// src/lib.rs

pub mod api_client;
pub mod config;
pub mod download;
pub mod employee;
pub mod error;
pub mod interceptor;
pub mod models;
pub mod notify;
pub mod payroll_view;
pub mod process;
pub mod render;
pub mod reports;
pub mod route;
pub mod session;
pub mod settings;

pub use api_client::ApiClient;
pub use config::ClientConfig;
pub use download::{DownloadArtifact, DownloadSink, FileSystemSink, MemorySink};
pub use employee::EmployeePayroll;
pub use error::PayrollError;
pub use interceptor::{ResponseInterceptor, UnauthorizedRedirect};
pub use models::{
    ComponentType, Employee, MarkPaidReceipt, NewSalaryComponent, PaginatedResponse,
    PayrollPeriod, PayrollRecord, PayrollSettings, PayrollSettingsUpdate, PayrollStatus,
    PayrollSummary, ProcessRequest, RecordQuery, SalaryComponent, SalaryComponentChanges,
};
pub use notify::{Notifier, RecordingNotifier, Toast, TracingNotifier};
pub use payroll_view::{dashboard_total_net, PayrollListView, RecordActions};
pub use process::PayrollProcessTrigger;
pub use reports::{ReportKind, ReportsWorkflow};
pub use route::Route;
pub use session::SessionContext;
pub use settings::PayrollSettingsPage;

#[cfg(test)]
mod test_support;

#[cfg(test)]
mod api_client_tests;
#[cfg(test)]
mod settings_tests;
