// src/api_client_tests.rs

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::super::error::PayrollError;
    use super::super::interceptor::UnauthorizedRedirect;
    use super::super::models::{PayrollPeriod, PayrollStatus, ProcessRequest};
    use super::super::reports::ReportKind;
    use super::super::test_support::{harness, page_json, record_json, TEST_TOKEN};

    fn march_2025() -> PayrollPeriod {
        PayrollPeriod::new(3, 2025).unwrap()
    }

    #[tokio::test]
    async fn test_requests_carry_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/payroll/summary"))
            .and(header("authorization", format!("Bearer {}", TEST_TOKEN).as_str()))
            .and(query_param("month", "3"))
            .and(query_param("year", "2025"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "total_employees": 2,
                "total_gross": 100000,
                "total_deductions": 4000,
                "total_net": 96000
            })))
            .expect(1)
            .mount(&server)
            .await;

        let h = harness(&format!("{}/api", server.uri()));
        let summary = h.client.get_summary(march_2025()).await.unwrap();
        assert_eq!(summary.total_employees, 2);
        assert_eq!(summary.total_net, dec!(96000));
        assert_eq!(summary.total_tds, dec!(0));
    }

    #[tokio::test]
    async fn test_no_authorization_header_without_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/employees/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page_json(vec![])))
            .mount(&server)
            .await;

        let h = harness(&format!("{}/api", server.uri()));
        h.client.session().clear().unwrap();
        h.client.list_employees(100).await.unwrap();

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].headers.get("authorization").is_none());
        assert_eq!(requests[0].url.query(), Some("page_size=100"));
    }

    #[tokio::test]
    async fn test_unauthorized_clears_session_and_redirects_once() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/payroll/records"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(json!({ "detail": "Token expired" })),
            )
            .mount(&server)
            .await;

        let h = harness(&format!("{}/api", server.uri()));
        let redirects = Arc::new(Mutex::new(Vec::new()));
        let seen = redirects.clone();
        let client = h
            .client
            .clone()
            .with_interceptor(Arc::new(UnauthorizedRedirect::new(move |to| {
                seen.lock().unwrap().push(to.to_string())
            })));

        let token_file = client.session().token_file_path().to_path_buf();
        assert!(token_file.exists());

        let result = client.list_records(march_2025(), 50).await;
        assert!(matches!(result, Err(PayrollError::Unauthorized)));
        assert!(!client.session().is_authenticated());
        assert!(!token_file.exists());
        assert_eq!(*redirects.lock().unwrap(), vec!["/login".to_string()]);
    }

    #[tokio::test]
    async fn test_unauthorized_without_interceptor_keeps_session() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/payroll/records/9"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let h = harness(&format!("{}/api", server.uri()));
        let result = h.client.get_record(9).await;
        assert!(matches!(result, Err(PayrollError::Unauthorized)));
        assert!(h.client.session().is_authenticated());
    }

    #[tokio::test]
    async fn test_error_detail_is_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/reports/mark-paid"))
            .and(query_param("payment_date", "2025-04-05"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "detail": "No approved payroll records found"
            })))
            .mount(&server)
            .await;

        let h = harness(&format!("{}/api", server.uri()));
        let date = NaiveDate::from_ymd_opt(2025, 4, 5).unwrap();
        match h.client.mark_paid(march_2025(), Some(date)).await {
            Err(PayrollError::ApiError {
                status,
                message,
                detail,
            }) => {
                assert_eq!(status.as_u16(), 404);
                assert_eq!(message, "No approved payroll records found");
                assert_eq!(detail.as_deref(), Some("No approved payroll records found"));
            }
            other => panic!("Expected ApiError but got: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_error_without_body_uses_generic_message() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/payroll/summary"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let h = harness(&format!("{}/api", server.uri()));
        let err = h.client.get_summary(march_2025()).await.unwrap_err();
        match &err {
            PayrollError::ApiError {
                message, detail, ..
            } => {
                assert_eq!(message, "An error occurred");
                assert_eq!(detail, &None);
            }
            other => panic!("Expected ApiError but got: {:?}", other),
        }
        assert_eq!(err.detail_or("Failed to fetch"), "Failed to fetch");
    }

    #[tokio::test]
    async fn test_process_posts_period_and_employee_ids() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/payroll/process"))
            .and(body_json(json!({ "month": 3, "year": 2025, "employee_ids": [4] })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                record_json(1, 4, PayrollStatus::Processed, 3, 2025)
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let h = harness(&format!("{}/api", server.uri()));
        let records = h
            .client
            .process(&ProcessRequest::new(march_2025(), Some(vec![4])))
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, PayrollStatus::Processed);
    }

    #[tokio::test]
    async fn test_department_filter_only_for_attendance() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/reports/attendance-report"))
            .and(query_param("department_id", "4"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "records": [] })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/reports/payroll-register"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "records": [] })))
            .expect(1)
            .mount(&server)
            .await;

        let h = harness(&format!("{}/api", server.uri()));
        h.client
            .report_json(ReportKind::Attendance, march_2025(), Some(4))
            .await
            .unwrap();
        h.client
            .report_json(ReportKind::Payroll, march_2025(), Some(4))
            .await
            .unwrap();

        let requests = server.received_requests().await.unwrap();
        let register = requests
            .iter()
            .find(|r| r.url.path() == "/api/reports/payroll-register")
            .unwrap();
        assert_eq!(register.url.query(), Some("month=3&year=2025"));
    }

    #[tokio::test]
    async fn test_csv_only_for_journal_and_payment() {
        let server = MockServer::start().await;
        let h = harness(&format!("{}/api", server.uri()));

        let result = h.client.report_csv(ReportKind::Pfesi, march_2025()).await;
        assert!(matches!(result, Err(PayrollError::ActionNotAllowed(_))));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[test]
    fn test_interceptor_counter_with_runtime() {
        // Same 401 path driven from a plain runtime, counting callback hits.
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/api/payroll/records/5/approve"))
                .respond_with(ResponseTemplate::new(401))
                .expect(2)
                .mount(&server)
                .await;

            let h = harness(&format!("{}/api", server.uri()));
            let hits = Arc::new(AtomicUsize::new(0));
            let counter = hits.clone();
            let client = h
                .client
                .clone()
                .with_interceptor(Arc::new(UnauthorizedRedirect::new(move |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                })));

            assert!(client.approve_record(5).await.is_err());
            assert!(client.approve_record(5).await.is_err());
            assert_eq!(hits.load(Ordering::SeqCst), 2);
        });
    }
}
