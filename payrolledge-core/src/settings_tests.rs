// src/settings_tests.rs

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;
    use serde_json::{json, Value};
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::super::notify::Toast;
    use super::super::settings::PayrollSettingsPage;
    use super::super::test_support::{harness, TEST_TOKEN};

    fn settings_json(esic_rate_employee: f64) -> Value {
        json!({
            "id": 1,
            "epf_rate_employee": 12.0,
            "epf_rate_employer": 12.0,
            "esic_rate_employee": esic_rate_employee,
            "esic_rate_employer": 3.25,
            "professional_tax": 200.0,
            "professional_tax_limit": 15000.0,
            "epf_wage_limit": 15000.0,
            "esic_wage_limit": 21000.0,
            "standard_deduction": 50000.0,
            "is_active": true,
            "created_at": "2025-01-01T00:00:00",
            "updated_at": "2025-01-01T00:00:00"
        })
    }

    #[tokio::test]
    async fn test_load_then_save_whole_settings() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/payroll/settings"))
            .and(header("authorization", format!("Bearer {}", TEST_TOKEN).as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(settings_json(0.75)))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/api/payroll/settings"))
            .and(body_json(json!({
                "epf_rate_employee": 12.0,
                "epf_rate_employer": 12.0,
                "esic_rate_employee": 1.0,
                "esic_rate_employer": 3.25,
                "professional_tax": 200.0,
                "professional_tax_limit": 15000.0,
                "epf_wage_limit": 15000.0,
                "esic_wage_limit": 21000.0,
                "standard_deduction": 50000.0
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(settings_json(1.0)))
            .expect(1)
            .mount(&server)
            .await;

        let h = harness(&format!("{}/api", server.uri()));
        let page = PayrollSettingsPage::new(h.client.clone(), h.notifier.clone());
        let loaded = page.load().await.unwrap();
        assert_eq!(loaded.rates.esic_rate_employee, dec!(0.75));

        let mut update = loaded.rates.clone();
        update.esic_rate_employee = dec!(1.0);
        let saved = page.save(&update).await.unwrap();

        assert_eq!(saved.rates.esic_rate_employee, dec!(1.0));
        assert_eq!(page.current(), Some(saved));
        assert!(!page.is_saving());
        assert_eq!(
            h.notifier.toasts(),
            vec![Toast::Success("Settings updated successfully".to_string())]
        );
    }

    #[tokio::test]
    async fn test_failed_load_is_logged_only() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/payroll/settings"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let h = harness(&format!("{}/api", server.uri()));
        let page = PayrollSettingsPage::new(h.client.clone(), h.notifier.clone());

        assert!(page.load().await.is_none());
        assert!(page.current().is_none());
        assert!(h.notifier.toasts().is_empty());
    }

    #[tokio::test]
    async fn test_non_admin_update_keeps_previous_settings() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/payroll/settings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(settings_json(0.75)))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/api/payroll/settings"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({
                "detail": "Not enough permissions"
            })))
            .mount(&server)
            .await;

        let h = harness(&format!("{}/api", server.uri()));
        let page = PayrollSettingsPage::new(h.client.clone(), h.notifier.clone());
        let loaded = page.load().await.unwrap();

        let err = page.save(&loaded.rates).await.unwrap_err();
        assert_eq!(err.status(), Some(reqwest::StatusCode::FORBIDDEN));
        assert_eq!(page.current(), Some(loaded));
        // The settings page has one fixed failure message.
        assert_eq!(
            h.notifier.last(),
            Some(Toast::Error("Failed to update settings".to_string()))
        );
    }
}
