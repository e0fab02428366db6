// src/models.rs

use chrono::{Datelike, Local, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::PayrollError;

// --- Payroll status ---

/// Lifecycle of a payroll record. Ordered: a record only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayrollStatus {
    Draft,
    Processed,
    Approved,
    Paid,
}

impl PayrollStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PayrollStatus::Draft => "draft",
            PayrollStatus::Processed => "processed",
            PayrollStatus::Approved => "approved",
            PayrollStatus::Paid => "paid",
        }
    }

    pub fn next(&self) -> Option<PayrollStatus> {
        match self {
            PayrollStatus::Draft => Some(PayrollStatus::Processed),
            PayrollStatus::Processed => Some(PayrollStatus::Approved),
            PayrollStatus::Approved => Some(PayrollStatus::Paid),
            PayrollStatus::Paid => None,
        }
    }

    /// Only the immediate successor is a legal transition.
    pub fn can_advance_to(&self, target: PayrollStatus) -> bool {
        self.next() == Some(target)
    }

    // Badge colour shown next to each row.
    pub fn badge_colour(&self) -> &'static str {
        match self {
            PayrollStatus::Draft => "gray",
            PayrollStatus::Processed => "blue",
            PayrollStatus::Approved => "green",
            PayrollStatus::Paid => "purple",
        }
    }
}

impl fmt::Display for PayrollStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PayrollStatus {
    type Err = PayrollError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [
            PayrollStatus::Draft,
            PayrollStatus::Processed,
            PayrollStatus::Approved,
            PayrollStatus::Paid,
        ]
        .into_iter()
        .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
        .ok_or_else(|| {
            PayrollError::ConfigError(format!(
                "Unknown payroll status '{}', expected draft, processed, approved or paid",
                s
            ))
        })
    }
}

// --- Payroll period ---

/// A (month, year) pair identifying one payroll run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PayrollPeriod {
    month: u32,
    year: i32,
}

impl PayrollPeriod {
    pub fn new(month: u32, year: i32) -> Result<Self, PayrollError> {
        if !(1..=12).contains(&month) {
            return Err(PayrollError::InvalidPeriod { month, year });
        }
        Ok(Self { month, year })
    }

    /// The period the pages open on: today's month and year.
    pub fn current() -> Self {
        let today = Local::now().date_naive();
        Self {
            month: today.month(),
            year: today.year(),
        }
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn query(&self) -> Vec<(&'static str, String)> {
        vec![
            ("month", self.month.to_string()),
            ("year", self.year.to_string()),
        ]
    }
}

impl Default for PayrollPeriod {
    fn default() -> Self {
        Self::current()
    }
}

impl fmt::Display for PayrollPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.month, self.year)
    }
}

// --- API Data Structures ---

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PayrollRecord {
    pub id: i64,
    pub employee_id: i64,
    pub month: u32,
    pub year: i32,

    // Earnings
    pub basic_salary: Decimal,
    pub hra: Decimal,
    pub conveyance: Decimal,
    pub special_allowance: Decimal,
    pub overtime_amount: Decimal,
    pub bonus: Decimal,
    pub arrears: Decimal,
    pub other_earnings: Decimal,

    // Deductions
    pub pf_employee: Decimal,
    pub pf_employer: Decimal,
    pub esic_employee: Decimal,
    pub esic_employer: Decimal,
    pub professional_tax: Decimal,
    pub tds: Decimal,
    pub other_deductions: Decimal,

    // Computed server side, never recomputed here
    pub gross_earnings: Decimal,
    pub total_deductions: Decimal,
    pub net_salary: Decimal,

    #[serde(default)]
    pub working_days: f64,
    #[serde(default)]
    pub days_present: f64,
    #[serde(default)]
    pub days_absent: f64,
    #[serde(default)]
    pub overtime_hours: f64,

    pub status: PayrollStatus,

    pub processed_by: Option<i64>,
    pub processed_at: Option<String>,
    pub approved_by: Option<i64>,
    pub approved_at: Option<String>,
    pub payment_date: Option<String>,
    pub payment_mode: Option<String>,
    pub remarks: Option<String>,
    #[serde(default)]
    pub created_at: String,
}

impl PayrollRecord {
    pub fn period(&self) -> Result<PayrollPeriod, PayrollError> {
        PayrollPeriod::new(self.month, self.year)
    }

    pub fn belongs_to(&self, period: PayrollPeriod) -> bool {
        self.month == period.month() && self.year == period.year()
    }
}

/// Aggregate over all records of a period. Recomputed by the backend on every fetch.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PayrollSummary {
    pub total_employees: u32,
    pub total_gross: Decimal,
    pub total_deductions: Decimal,
    pub total_net: Decimal,
    pub total_pf_employee: Decimal,
    pub total_pf_employer: Decimal,
    pub total_esic_employee: Decimal,
    pub total_esic_employer: Decimal,
    pub total_professional_tax: Decimal,
    pub total_tds: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u32,
}

// Only what the payroll pages need to label rows.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Employee {
    pub id: i64,
    pub employee_code: Option<String>,
    pub first_name: String,
    pub last_name: Option<String>,
}

impl Employee {
    pub fn display_name(&self) -> String {
        match self.last_name.as_deref().map(str::trim) {
            Some(last) if !last.is_empty() => format!("{} {}", self.first_name, last),
            _ => self.first_name.clone(),
        }
    }
}

/// What the backend reports after moving a period's approved records to paid.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MarkPaidReceipt {
    pub message: String,
    pub payment_date: Option<String>,
    #[serde(default)]
    pub total_records: u32,
    #[serde(default)]
    pub total_net_paid: Decimal,
    #[serde(default)]
    pub payment_entries: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessRequest {
    pub month: u32,
    pub year: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employee_ids: Option<Vec<i64>>,
}

impl ProcessRequest {
    pub fn new(period: PayrollPeriod, employee_ids: Option<Vec<i64>>) -> Self {
        Self {
            month: period.month(),
            year: period.year(),
            employee_ids,
        }
    }
}

/// Filters for `GET /payroll/records`. Unset fields are left out of the query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordQuery {
    pub employee_id: Option<i64>,
    pub period: Option<PayrollPeriod>,
    pub status: Option<PayrollStatus>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl RecordQuery {
    pub fn for_period(period: PayrollPeriod, page_size: u32) -> Self {
        Self {
            period: Some(period),
            page_size: Some(page_size),
            ..Self::default()
        }
    }

    /// One employee's records across all periods, newest first as the backend orders them.
    pub fn for_employee(employee_id: i64, page_size: u32) -> Self {
        Self {
            employee_id: Some(employee_id),
            page_size: Some(page_size),
            ..Self::default()
        }
    }

    pub fn query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        if let Some(id) = self.employee_id {
            query.push(("employee_id", id.to_string()));
        }
        if let Some(period) = self.period {
            query.extend(period.query());
        }
        if let Some(status) = self.status {
            query.push(("status", status.as_str().to_string()));
        }
        if let Some(page) = self.page {
            query.push(("page", page.to_string()));
        }
        if let Some(page_size) = self.page_size {
            query.push(("page_size", page_size.to_string()));
        }
        query
    }
}

// --- Statutory settings ---

/// Editable PF/ESIC/PT rates and limits. Sent whole on every update.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PayrollSettingsUpdate {
    #[serde(with = "rust_decimal::serde::float")]
    pub epf_rate_employee: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub epf_rate_employer: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub esic_rate_employee: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub esic_rate_employer: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub professional_tax: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub professional_tax_limit: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub epf_wage_limit: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub esic_wage_limit: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub standard_deduction: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PayrollSettings {
    pub id: i64,
    #[serde(flatten)]
    pub rates: PayrollSettingsUpdate,
    pub is_active: bool,
    #[serde(default)]
    pub updated_at: Option<String>,
}

// --- Salary components ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentType {
    Earning,
    Deduction,
}

impl ComponentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentType::Earning => "earning",
            ComponentType::Deduction => "deduction",
        }
    }
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ComponentType {
    type Err = PayrollError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "earning" => Ok(ComponentType::Earning),
            "deduction" => Ok(ComponentType::Deduction),
            other => Err(PayrollError::ConfigError(format!(
                "Unknown component type '{}', expected earning or deduction",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SalaryComponent {
    pub id: i64,
    pub employee_id: i64,
    pub component_name: String,
    pub component_type: ComponentType,
    pub amount: Decimal,
    pub effective_from: String,
    pub effective_to: Option<String>,
    #[serde(default = "default_true")]
    pub is_taxable: bool,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize)]
pub struct NewSalaryComponent {
    pub employee_id: i64,
    pub component_name: String,
    pub component_type: ComponentType,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub effective_from: NaiveDateTime,
    pub effective_to: Option<NaiveDateTime>,
    pub is_taxable: bool,
}

/// Partial update; only the fields that are set are sent.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SalaryComponentChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub component_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub component_type: Option<ComponentType>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        with = "rust_decimal::serde::float_option"
    )]
    pub amount: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effective_from: Option<NaiveDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effective_to: Option<NaiveDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_taxable: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

impl SalaryComponentChanges {
    pub fn is_empty(&self) -> bool {
        self.component_name.is_none()
            && self.component_type.is_none()
            && self.amount.is_none()
            && self.effective_from.is_none()
            && self.effective_to.is_none()
            && self.is_taxable.is_none()
            && self.is_active.is_none()
    }
}
