// src/main.rs

use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::env;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use payrolledge_core::payroll_view::format_lakhs;
use payrolledge_core::{
    ApiClient, ClientConfig, FileSystemSink, PayrollListView, PayrollPeriod,
    PayrollProcessTrigger, PayrollStatus, ReportKind, ReportsWorkflow, SessionContext,
    TracingNotifier, UnauthorizedRedirect,
};

#[derive(Debug, Serialize)]
struct LoginRequest {
    username: String,
    password: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    token_type: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set global tracing subscriber")?;

    let config = ClientConfig::from_env().context("Failed to load PAYROLLEDGE_* configuration")?;
    let period = smoke_period()?;
    println!("\n🔧 PayrollEdge smoke run against {} for {}", config.api_base_url, period);

    // Step 1: Session
    println!("\n🔍 Signing in...");
    let session = SessionContext::load(&config.token_file)?;
    if !session.is_authenticated() {
        let token = obtain_token(&config.api_base_url).await?;
        if token.is_empty() {
            println!("No token, nothing to test.");
            return Ok(());
        }
        session.persist(&token)?;
    }
    println!("Token file: {}", session.token_file_path().display());

    let client = ApiClient::new(&config, session)?
        .with_interceptor(Arc::new(UnauthorizedRedirect::new(|path| {
            println!("⚠️ Backend rejected the token, sign in again via {}", path)
        })));
    let notifier = Arc::new(TracingNotifier);
    let sink = Arc::new(FileSystemSink::new(&config.download_dir));
    let view = PayrollListView::new(client.clone(), notifier.clone(), sink.clone(), period);

    // Step 2: Summary before processing
    println!("\n🔍 Fetching summary...");
    view.fetch_summary().await;
    match view.summary() {
        Some(summary) => println!(
            "Summary: {} employees, net {}",
            summary.total_employees,
            format_lakhs(summary.total_net)
        ),
        None => println!("No summary yet for {}", period),
    }

    // Step 3: Process
    println!("\n🔍 Processing payroll...");
    let trigger = PayrollProcessTrigger::new(client.clone(), notifier.clone());
    match trigger.process(period, None).await {
        Ok(route) => println!("Processed, next page: {}", route.path()),
        Err(e) => println!("Processing failed: {}", e.detail_or("Failed to process payroll")),
    }

    // Step 4: List
    println!("\n🔍 Listing records...");
    view.refresh().await?;
    let records = view.records();
    for record in &records {
        println!(
            "  #{} {:<24} net {:>10} {}",
            record.id,
            view.employee_name(record.employee_id),
            record.net_salary,
            record.status
        );
    }
    if records.is_empty() {
        println!("No records for {}, stopping here.", period);
        return Ok(());
    }

    // Step 5: Approve
    println!("\n🔍 Approving processed records...");
    let mut approved = 0;
    for record in records.iter().filter(|r| r.status == PayrollStatus::Processed) {
        match view.approve(record.id).await {
            Ok(()) => approved += 1,
            Err(e) => println!("Record {} not approved: {}", record.id, e),
        }
    }
    println!("Approved {} records", approved);

    // Step 6: Journal entries (accrual)
    println!("\n🔍 Downloading journal entries...");
    let reports = ReportsWorkflow::new(client.clone(), notifier.clone(), sink.clone(), period);
    reports.select(ReportKind::Journal);
    match reports.generate_report().await {
        Ok(path) => println!("Saved {}", path.display()),
        Err(e) => println!("Journal entries failed: {}", e),
    }

    // Step 7: Mark as paid
    println!("\n🔍 Marking payroll as paid...");
    if view.can_mark_as_paid() {
        match view.mark_as_paid(None).await {
            Ok(receipt) => println!(
                "{} ({} records, net {})",
                receipt.message, receipt.total_records, receipt.total_net_paid
            ),
            Err(e) => println!("Mark as paid failed: {}", e.detail_or("Failed to mark as paid")),
        }
    } else {
        println!("Nothing to mark as paid");
    }

    // Step 8: Payment entries
    println!("\n🔍 Downloading payment entries...");
    reports.select(ReportKind::Payment);
    for result in [reports.generate_report().await, reports.download_csv().await] {
        match result {
            Ok(path) => println!("Saved {}", path.display()),
            Err(e) => println!("Payment entries failed: {}", e),
        }
    }

    println!("\n✅ Smoke run complete!");
    Ok(())
}

/// `PAYROLLEDGE_SMOKE_MONTH` / `PAYROLLEDGE_SMOKE_YEAR`, defaulting to the current month.
fn smoke_period() -> Result<PayrollPeriod> {
    let current = PayrollPeriod::current();
    let month = match env::var("PAYROLLEDGE_SMOKE_MONTH") {
        Ok(m) => m.parse().context("PAYROLLEDGE_SMOKE_MONTH must be a number")?,
        Err(_) => current.month(),
    };
    let year = match env::var("PAYROLLEDGE_SMOKE_YEAR") {
        Ok(y) => y.parse().context("PAYROLLEDGE_SMOKE_YEAR must be a number")?,
        Err(_) => current.year(),
    };
    Ok(PayrollPeriod::new(month, year)?)
}

/// Logs in with `PAYROLLEDGE_SMOKE_USERNAME`/`PASSWORD` when set, otherwise asks for a token.
async fn obtain_token(api_base_url: &str) -> Result<String> {
    let (username, password) = match (
        env::var("PAYROLLEDGE_SMOKE_USERNAME"),
        env::var("PAYROLLEDGE_SMOKE_PASSWORD"),
    ) {
        (Ok(u), Ok(p)) => (u, p),
        _ => return prompt_for_token(),
    };

    let response = Client::new()
        .post(format!("{}/auth/login", api_base_url.trim_end_matches('/')))
        .json(&LoginRequest { username, password })
        .send()
        .await?;
    println!("Login response status: {}", response.status());
    if !response.status().is_success() {
        println!("Login failed: {}", response.text().await?);
        return prompt_for_token();
    }
    let token = response.json::<TokenResponse>().await?;
    println!("Got {} token", token.token_type);
    Ok(token.access_token)
}

fn prompt_for_token() -> Result<String> {
    println!("Enter access token (press Enter to skip):");
    let mut token = String::new();
    std::io::stdin().read_line(&mut token)?;
    Ok(token.trim().to_string())
}
