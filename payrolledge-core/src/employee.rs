// src/employee.rs

use std::sync::Arc;
use tracing::{error, info, warn};

use crate::api_client::ApiClient;
use crate::error::PayrollError;
use crate::models::{
    NewSalaryComponent, PayrollRecord, PayrollStatus, RecordQuery, SalaryComponent,
    SalaryComponentChanges,
};
use crate::notify::Notifier;

/// How many recent records the employee page shows.
pub const HISTORY_PAGE_SIZE: u32 = 5;

/// Payroll side of one employee: salary components and recent records.
pub struct EmployeePayroll {
    client: ApiClient,
    notifier: Arc<dyn Notifier>,
    employee_id: i64,
}

impl EmployeePayroll {
    pub fn new(client: ApiClient, notifier: Arc<dyn Notifier>, employee_id: i64) -> Self {
        Self {
            client,
            notifier,
            employee_id,
        }
    }

    /// Most recent records across all periods, optionally in one status.
    /// Empty when the lookup fails.
    pub async fn history(&self, status: Option<PayrollStatus>) -> Vec<PayrollRecord> {
        let query = RecordQuery {
            status,
            ..RecordQuery::for_employee(self.employee_id, HISTORY_PAGE_SIZE)
        };
        match self.client.query_records(&query).await {
            Ok(page) => page.items,
            Err(e) => {
                warn!(
                    "Failed to fetch payroll records for employee {}: {}",
                    self.employee_id, e
                );
                Vec::new()
            }
        }
    }

    pub async fn components(&self) -> Result<Vec<SalaryComponent>, PayrollError> {
        self.client.employee_components(self.employee_id).await
    }

    pub async fn add_component(
        &self,
        component: NewSalaryComponent,
    ) -> Result<SalaryComponent, PayrollError> {
        if component.employee_id != self.employee_id {
            return Err(PayrollError::ActionNotAllowed(format!(
                "component belongs to employee {}, not {}",
                component.employee_id, self.employee_id
            )));
        }
        match self.client.create_component(&component).await {
            Ok(created) => {
                info!(
                    "Added {} '{}' ({}) for employee {}",
                    created.component_type, created.component_name, created.amount, self.employee_id
                );
                self.notifier.success("Salary component added");
                Ok(created)
            }
            Err(e) => {
                error!("Adding component for employee {} failed: {}", self.employee_id, e);
                self.notifier
                    .error(&e.detail_or("Failed to add salary component"));
                Err(e)
            }
        }
    }

    pub async fn update_component(
        &self,
        component_id: i64,
        changes: &SalaryComponentChanges,
    ) -> Result<SalaryComponent, PayrollError> {
        if changes.is_empty() {
            return Err(PayrollError::ActionNotAllowed(format!(
                "nothing to update on component {}",
                component_id
            )));
        }
        match self.client.update_component(component_id, changes).await {
            Ok(updated) => {
                info!("Component {} updated", component_id);
                self.notifier.success("Salary component updated");
                Ok(updated)
            }
            Err(e) => {
                error!("Updating component {} failed: {}", component_id, e);
                self.notifier
                    .error(&e.detail_or("Failed to update salary component"));
                Err(e)
            }
        }
    }
}
