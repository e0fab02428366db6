// src/settings.rs

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{error, info, warn};

use crate::api_client::ApiClient;
use crate::error::PayrollError;
use crate::models::{PayrollSettings, PayrollSettingsUpdate};
use crate::notify::Notifier;

/// Statutory rates and limits used by the backend's calculations.
pub struct PayrollSettingsPage {
    client: ApiClient,
    notifier: Arc<dyn Notifier>,
    current: Mutex<Option<PayrollSettings>>,
    saving: AtomicBool,
}

impl PayrollSettingsPage {
    pub fn new(client: ApiClient, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            client,
            notifier,
            current: Mutex::new(None),
            saving: AtomicBool::new(false),
        }
    }

    pub fn current(&self) -> Option<PayrollSettings> {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_saving(&self) -> bool {
        self.saving.load(Ordering::SeqCst)
    }

    /// Fetches the active settings. A failure is logged only; the page stays empty.
    pub async fn load(&self) -> Option<PayrollSettings> {
        match self.client.get_settings().await {
            Ok(settings) => {
                *self.current.lock().unwrap_or_else(PoisonError::into_inner) =
                    Some(settings.clone());
                Some(settings)
            }
            Err(e) => {
                warn!("Failed to fetch payroll settings: {}", e);
                None
            }
        }
    }

    /// Replaces every rate and limit at once.
    pub async fn save(
        &self,
        update: &PayrollSettingsUpdate,
    ) -> Result<PayrollSettings, PayrollError> {
        if self.saving.swap(true, Ordering::SeqCst) {
            return Err(PayrollError::ActionNotAllowed(
                "a settings update is already running".to_string(),
            ));
        }
        let result = self.client.update_settings(update).await;
        self.saving.store(false, Ordering::SeqCst);

        match result {
            Ok(settings) => {
                info!("Payroll settings {} updated", settings.id);
                *self.current.lock().unwrap_or_else(PoisonError::into_inner) =
                    Some(settings.clone());
                self.notifier.success("Settings updated successfully");
                Ok(settings)
            }
            Err(e) => {
                error!("Updating payroll settings failed: {}", e);
                self.notifier.error("Failed to update settings");
                Err(e)
            }
        }
    }
}
