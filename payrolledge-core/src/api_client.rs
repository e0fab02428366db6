// src/api_client.rs

use bytes::Bytes;
use chrono::NaiveDate;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::config::ClientConfig;
use crate::error::{error_message, extract_detail, PayrollError};
use crate::interceptor::ResponseInterceptor;
use crate::models::{
    Employee, MarkPaidReceipt, NewSalaryComponent, PaginatedResponse, PayrollPeriod,
    PayrollRecord, PayrollSettings, PayrollSettingsUpdate, PayrollSummary, ProcessRequest,
    RecordQuery, SalaryComponent, SalaryComponentChanges,
};
use crate::reports::ReportKind;
use crate::session::SessionContext;

/// HTTP client for the PayrollEdge REST API.
///
/// Every request carries the session's bearer token. A 401 response runs the
/// registered interceptor before the error reaches the caller.
#[derive(Clone)]
pub struct ApiClient {
    base_url: Url,
    http_client: Client,
    session: SessionContext,
    interceptor: Option<Arc<dyn ResponseInterceptor>>,
}

impl ApiClient {
    pub fn new(config: &ClientConfig, session: SessionContext) -> Result<Self, PayrollError> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        let base_url = Url::parse(config.api_base_url.trim_end_matches('/'))?;

        Ok(Self {
            base_url,
            http_client,
            session,
            interceptor: None,
        })
    }

    /// Registers the single 401 interceptor, replacing any previous one.
    pub fn with_interceptor(mut self, interceptor: Arc<dyn ResponseInterceptor>) -> Self {
        self.interceptor = Some(interceptor);
        self
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint_url(&self, endpoint: &str) -> Result<Url, PayrollError> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let url = if endpoint.starts_with('/') {
            format!("{}{}", base, endpoint)
        } else {
            format!("{}/{}", base, endpoint)
        };
        Ok(Url::parse(&url)?)
    }

    pub fn build_request(
        &self,
        method: Method,
        endpoint: &str,
    ) -> Result<RequestBuilder, PayrollError> {
        let url = self.endpoint_url(endpoint)?;
        let mut request = self
            .http_client
            .request(method, url)
            .header(ACCEPT, "application/json");
        if let Some(token) = self.session.token() {
            request = request.header(AUTHORIZATION, format!("Bearer {}", token));
        }
        Ok(request)
    }

    /// Sends the request and turns any non-2xx status into a `PayrollError`.
    async fn execute(
        &self,
        request_builder: RequestBuilder,
        context_msg: &str,
    ) -> Result<Response, PayrollError> {
        let request = request_builder.build().map_err(|e| {
            error!("Request build failed for '{}': {}", context_msg, e);
            PayrollError::Request(e)
        })?;
        let method = request.method().clone();
        let request_url = request.url().to_string();
        debug!("Sending {} for '{}' to {}", method, context_msg, request_url);

        let response = self.http_client.execute(request).await.map_err(|e| {
            error!(
                "HTTP execution failed before receiving response for '{}' (URL: {}): {}",
                context_msg, request_url, e
            );
            PayrollError::Request(e)
        })?;

        let status = response.status();
        info!(
            "Received response for '{}' ({} {}): Status={}",
            context_msg, method, request_url, status
        );
        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::UNAUTHORIZED {
            warn!("Unauthorized response for '{}', running interceptor", context_msg);
            if let Some(interceptor) = &self.interceptor {
                interceptor.on_unauthorized(&self.session).await;
            }
            return Err(PayrollError::Unauthorized);
        }

        let error_body = response.text().await.ok();
        error!(
            "API Error Response: Status={}, Body='{}' for URL: {}",
            status,
            error_body.as_deref().unwrap_or_default(),
            request_url
        );
        let detail = error_body
            .as_deref()
            .and_then(|body| serde_json::from_str::<Value>(body).ok())
            .and_then(|value| extract_detail(&value));
        Err(PayrollError::ApiError {
            status,
            message: error_message(error_body.as_deref()),
            detail,
        })
    }

    pub async fn send_and_deserialize<T: DeserializeOwned>(
        &self,
        request_builder: RequestBuilder,
        context_msg: &str,
    ) -> Result<T, PayrollError> {
        let response = self.execute(request_builder, context_msg).await?;
        let bytes = response.bytes().await?;
        serde_json::from_slice::<T>(&bytes).map_err(|e| {
            error!("JSON deserialization failed for '{}': {}", context_msg, e);
            PayrollError::Json(e)
        })
    }

    pub async fn send_for_bytes(
        &self,
        request_builder: RequestBuilder,
        context_msg: &str,
    ) -> Result<Bytes, PayrollError> {
        let response = self.execute(request_builder, context_msg).await?;
        let bytes = response.bytes().await?;
        debug!("Read {} bytes for '{}'", bytes.len(), context_msg);
        Ok(bytes)
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
        context_msg: &str,
    ) -> Result<T, PayrollError> {
        let request = self.build_request(Method::GET, endpoint)?.query(query);
        self.send_and_deserialize(request, context_msg).await
    }

    // --- Payroll endpoints ---

    pub async fn list_records(
        &self,
        period: PayrollPeriod,
        page_size: u32,
    ) -> Result<PaginatedResponse<PayrollRecord>, PayrollError> {
        self.query_records(&RecordQuery::for_period(period, page_size))
            .await
    }

    pub async fn query_records(
        &self,
        query: &RecordQuery,
    ) -> Result<PaginatedResponse<PayrollRecord>, PayrollError> {
        self.get("/payroll/records", &query.query(), "List Payroll Records")
            .await
    }

    pub async fn get_record(&self, record_id: i64) -> Result<PayrollRecord, PayrollError> {
        let endpoint = format!("/payroll/records/{}", record_id);
        self.get(&endpoint, &[], "Get Payroll Record").await
    }

    pub async fn get_summary(&self, period: PayrollPeriod) -> Result<PayrollSummary, PayrollError> {
        self.get("/payroll/summary", &period.query(), "Get Payroll Summary")
            .await
    }

    /// Backend's preview of one employee's pay for a period, returned untouched.
    pub async fn calculate(
        &self,
        employee_id: i64,
        period: PayrollPeriod,
    ) -> Result<Value, PayrollError> {
        let endpoint = format!("/payroll/calculate/{}", employee_id);
        self.get(&endpoint, &period.query(), "Calculate Payroll Preview")
            .await
    }

    pub async fn process(
        &self,
        request: &ProcessRequest,
    ) -> Result<Vec<PayrollRecord>, PayrollError> {
        let builder = self
            .build_request(Method::POST, "/payroll/process")?
            .json(request);
        self.send_and_deserialize(builder, "Process Payroll").await
    }

    pub async fn approve_record(&self, record_id: i64) -> Result<PayrollRecord, PayrollError> {
        let endpoint = format!("/payroll/records/{}/approve", record_id);
        let builder = self.build_request(Method::POST, &endpoint)?;
        self.send_and_deserialize(builder, "Approve Payroll Record")
            .await
    }

    pub async fn mark_paid(
        &self,
        period: PayrollPeriod,
        payment_date: Option<NaiveDate>,
    ) -> Result<MarkPaidReceipt, PayrollError> {
        let mut query = period.query();
        if let Some(date) = payment_date {
            query.push(("payment_date", date.format("%Y-%m-%d").to_string()));
        }
        let builder = self
            .build_request(Method::POST, "/reports/mark-paid")?
            .query(&query);
        self.send_and_deserialize(builder, "Mark Payroll Paid").await
    }

    // --- Report endpoints ---

    pub async fn payslip_pdf(&self, record_id: i64) -> Result<Bytes, PayrollError> {
        let endpoint = format!("/reports/payslip/{}", record_id);
        let builder = self.build_request(Method::GET, &endpoint)?;
        self.send_for_bytes(builder, "Generate Payslip").await
    }

    pub async fn report_json(
        &self,
        kind: ReportKind,
        period: PayrollPeriod,
        department_id: Option<i64>,
    ) -> Result<Value, PayrollError> {
        let mut query = period.query();
        if let (ReportKind::Attendance, Some(department)) = (kind, department_id) {
            query.push(("department_id", department.to_string()));
        }
        let endpoint = format!("/reports/{}", kind.endpoint());
        self.get(&endpoint, &query, kind.title()).await
    }

    pub async fn report_csv(
        &self,
        kind: ReportKind,
        period: PayrollPeriod,
    ) -> Result<Bytes, PayrollError> {
        let csv_endpoint = kind.csv_endpoint().ok_or_else(|| {
            PayrollError::ActionNotAllowed(format!("{} has no CSV export", kind.title()))
        })?;
        let endpoint = format!("/reports/{}", csv_endpoint);
        let builder = self
            .build_request(Method::GET, &endpoint)?
            .query(&period.query());
        self.send_for_bytes(builder, kind.title()).await
    }

    // --- Settings ---

    pub async fn get_settings(&self) -> Result<PayrollSettings, PayrollError> {
        self.get("/payroll/settings", &[], "Get Payroll Settings")
            .await
    }

    /// Admin only. The backend answers 403 for other roles.
    pub async fn update_settings(
        &self,
        update: &PayrollSettingsUpdate,
    ) -> Result<PayrollSettings, PayrollError> {
        let builder = self
            .build_request(Method::PUT, "/payroll/settings")?
            .json(update);
        self.send_and_deserialize(builder, "Update Payroll Settings")
            .await
    }

    // --- Salary components ---

    pub async fn employee_components(
        &self,
        employee_id: i64,
    ) -> Result<Vec<SalaryComponent>, PayrollError> {
        let endpoint = format!("/payroll/components/employee/{}", employee_id);
        self.get(&endpoint, &[], "List Salary Components").await
    }

    pub async fn create_component(
        &self,
        component: &NewSalaryComponent,
    ) -> Result<SalaryComponent, PayrollError> {
        let builder = self
            .build_request(Method::POST, "/payroll/components")?
            .json(component);
        self.send_and_deserialize(builder, "Create Salary Component")
            .await
    }

    pub async fn update_component(
        &self,
        component_id: i64,
        changes: &SalaryComponentChanges,
    ) -> Result<SalaryComponent, PayrollError> {
        let endpoint = format!("/payroll/components/{}", component_id);
        let builder = self.build_request(Method::PUT, &endpoint)?.json(changes);
        self.send_and_deserialize(builder, "Update Salary Component")
            .await
    }

    // --- Lookups ---

    pub async fn list_employees(
        &self,
        page_size: u32,
    ) -> Result<PaginatedResponse<Employee>, PayrollError> {
        self.get(
            "/employees/",
            &[("page_size", page_size.to_string())],
            "List Employees",
        )
        .await
    }
}
