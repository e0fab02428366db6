// src/main.rs

use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, NaiveTime};
use clap::{Args, Parser, Subcommand};
use rust_decimal::Decimal;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use payrolledge_core::download::FileSystemSink;
use payrolledge_core::payroll_view::{dashboard_total_net, format_lakhs};
use payrolledge_core::render::{write_records_csv, write_records_table, write_summary_cards};
use payrolledge_core::reports::{JOURNAL_FLOW_GUIDANCE, PAYSLIP_GUIDANCE};
use payrolledge_core::{
    ApiClient, ClientConfig, ComponentType, EmployeePayroll, NewSalaryComponent, PayrollListView,
    PayrollPeriod, PayrollProcessTrigger, PayrollSettingsPage, PayrollSettingsUpdate, PayrollStatus,
    ReportKind, ReportsWorkflow, SalaryComponentChanges, SessionContext,
    TracingNotifier, UnauthorizedRedirect,
};

#[derive(Parser)]
#[command(name = "payrolledge")]
#[command(about = "Run and report on PayrollEdge payroll from the terminal")]
#[command(version)]
struct Cli {
    /// API base URL (overrides PAYROLLEDGE_API_BASE_URL)
    #[arg(long)]
    api_url: Option<String>,

    /// Token file (overrides PAYROLLEDGE_TOKEN_FILE)
    #[arg(long)]
    token_file: Option<PathBuf>,

    /// Where downloads are saved (overrides PAYROLLEDGE_DOWNLOAD_DIR)
    #[arg(long)]
    download_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug, Clone, Copy)]
struct PeriodArgs {
    /// Month, 1-12 (default: current month)
    #[arg(long)]
    month: Option<u32>,

    /// Year (default: current year)
    #[arg(long)]
    year: Option<i32>,
}

impl PeriodArgs {
    fn period(&self) -> Result<PayrollPeriod> {
        let current = PayrollPeriod::current();
        let period = PayrollPeriod::new(
            self.month.unwrap_or(current.month()),
            self.year.unwrap_or(current.year()),
        )?;
        Ok(period)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the stored access token
    #[command(subcommand)]
    Session(SessionCommand),

    /// List payroll records and the summary for a period
    Records {
        #[command(flatten)]
        period: PeriodArgs,

        /// Print the records as CSV instead of a table
        #[arg(long)]
        csv: bool,
    },

    /// Show the summary cards for a period
    Summary {
        #[command(flatten)]
        period: PeriodArgs,
    },

    /// Process payroll for a period
    Process {
        #[command(flatten)]
        period: PeriodArgs,

        /// Only these employees (default: all active employees)
        #[arg(long = "employee")]
        employees: Vec<i64>,
    },

    /// Approve a processed record
    Approve {
        record_id: i64,

        #[command(flatten)]
        period: PeriodArgs,
    },

    /// Mark every approved record of a period as paid
    MarkPaid {
        #[command(flatten)]
        period: PeriodArgs,

        /// Payment date, YYYY-MM-DD (default: the 28th of the payroll month)
        #[arg(long)]
        payment_date: Option<NaiveDate>,
    },

    /// Download a record's payslip PDF
    Payslip { record_id: i64 },

    /// Download a report (attendance, payroll, pfesi, journal, payment)
    Report {
        kind: ReportKind,

        #[command(flatten)]
        period: PeriodArgs,

        /// Download the CSV export (journal and payment only)
        #[arg(long)]
        csv: bool,

        /// Department filter for the attendance report
        #[arg(long)]
        department: Option<i64>,
    },

    /// Preview one employee's payroll calculation
    Preview {
        employee_id: i64,

        #[command(flatten)]
        period: PeriodArgs,
    },

    /// Net payroll of the current month
    Dashboard,

    /// Show or change the statutory payroll settings
    #[command(subcommand)]
    Settings(SettingsCommand),

    /// Manage an employee's salary components
    #[command(subcommand)]
    Components(ComponentsCommand),

    /// An employee's most recent payroll records
    History {
        employee_id: i64,

        /// Only records in this status (draft, processed, approved, paid)
        #[arg(long)]
        status: Option<PayrollStatus>,
    },
}

#[derive(Subcommand)]
enum SettingsCommand {
    /// Print the active settings
    Show,
    /// Change some rates or limits; the rest keep their current values (admin only)
    Set(SettingsChanges),
}

#[derive(Args, Debug, Default)]
struct SettingsChanges {
    #[arg(long)]
    epf_rate_employee: Option<Decimal>,
    #[arg(long)]
    epf_rate_employer: Option<Decimal>,
    #[arg(long)]
    esic_rate_employee: Option<Decimal>,
    #[arg(long)]
    esic_rate_employer: Option<Decimal>,
    #[arg(long)]
    professional_tax: Option<Decimal>,
    #[arg(long)]
    professional_tax_limit: Option<Decimal>,
    #[arg(long)]
    epf_wage_limit: Option<Decimal>,
    #[arg(long)]
    esic_wage_limit: Option<Decimal>,
    #[arg(long)]
    standard_deduction: Option<Decimal>,
}

impl SettingsChanges {
    /// Overlays the given flags on `current`. `None` when no flag was passed.
    fn apply(&self, current: &PayrollSettingsUpdate) -> Option<PayrollSettingsUpdate> {
        let mut update = current.clone();
        let mut changed = false;
        for (slot, value) in [
            (&mut update.epf_rate_employee, self.epf_rate_employee),
            (&mut update.epf_rate_employer, self.epf_rate_employer),
            (&mut update.esic_rate_employee, self.esic_rate_employee),
            (&mut update.esic_rate_employer, self.esic_rate_employer),
            (&mut update.professional_tax, self.professional_tax),
            (&mut update.professional_tax_limit, self.professional_tax_limit),
            (&mut update.epf_wage_limit, self.epf_wage_limit),
            (&mut update.esic_wage_limit, self.esic_wage_limit),
            (&mut update.standard_deduction, self.standard_deduction),
        ] {
            if let Some(value) = value {
                *slot = value;
                changed = true;
            }
        }
        changed.then_some(update)
    }
}

#[derive(Subcommand)]
enum ComponentsCommand {
    /// List an employee's salary components
    List { employee_id: i64 },

    /// Add an earning or deduction to an employee's salary
    Add {
        employee_id: i64,

        #[arg(long)]
        name: String,

        /// earning or deduction
        #[arg(long = "type")]
        component_type: ComponentType,

        #[arg(long)]
        amount: Decimal,

        /// First day the component applies, YYYY-MM-DD
        #[arg(long)]
        from: NaiveDate,

        /// Last day the component applies, YYYY-MM-DD (default: open-ended)
        #[arg(long)]
        to: Option<NaiveDate>,

        /// Exclude the component from taxable income
        #[arg(long)]
        not_taxable: bool,
    },

    /// Change fields of an existing component
    Update {
        employee_id: i64,
        component_id: i64,

        #[arg(long)]
        name: Option<String>,

        #[arg(long = "type")]
        component_type: Option<ComponentType>,

        #[arg(long)]
        amount: Option<Decimal>,

        #[arg(long)]
        from: Option<NaiveDate>,

        #[arg(long)]
        to: Option<NaiveDate>,

        #[arg(long)]
        taxable: Option<bool>,

        #[arg(long)]
        active: Option<bool>,
    },
}

#[derive(Subcommand)]
enum SessionCommand {
    /// Store the token returned by the login endpoint
    SetToken { token: String },
    /// Forget the stored token
    Clear,
    /// Show whether a token is stored
    Show,
}

struct App {
    client: ApiClient,
    notifier: Arc<TracingNotifier>,
    sink: Arc<FileSystemSink>,
}

impl App {
    fn list_view(&self, period: PayrollPeriod) -> PayrollListView {
        PayrollListView::new(
            self.client.clone(),
            self.notifier.clone(),
            self.sink.clone(),
            period,
        )
    }

    fn employee(&self, employee_id: i64) -> EmployeePayroll {
        EmployeePayroll::new(self.client.clone(), self.notifier.clone(), employee_id)
    }

    fn reports(&self, period: PayrollPeriod) -> ReportsWorkflow {
        ReportsWorkflow::new(
            self.client.clone(),
            self.notifier.clone(),
            self.sink.clone(),
            period,
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // --- Setup ---
    dotenv::dotenv().ok();
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder().with_env_filter(env_filter).finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set global tracing subscriber")?;

    let cli = Cli::parse();

    // --- Configuration ---
    let mut config = ClientConfig::from_env().context("Failed to load PAYROLLEDGE_* configuration")?;
    if let Some(url) = cli.api_url {
        config.api_base_url = url;
    }
    if let Some(path) = cli.token_file {
        config.token_file = path;
    }
    if let Some(dir) = cli.download_dir {
        config.download_dir = dir;
    }
    config.validate().context("Invalid configuration")?;
    info!(
        "Using API at {} (token file: {})",
        config.api_base_url,
        config.token_file.display()
    );

    let session = SessionContext::load(&config.token_file)
        .with_context(|| format!("Failed to load session from {:?}", config.token_file))?;

    if let Commands::Session(command) = &cli.command {
        return run_session(command, &session);
    }

    let client = ApiClient::new(&config, session)
        .context("Failed to create API client")?
        .with_interceptor(Arc::new(UnauthorizedRedirect::logging()));
    let app = App {
        client,
        notifier: Arc::new(TracingNotifier),
        sink: Arc::new(FileSystemSink::new(&config.download_dir)),
    };

    run(cli.command, &app).await
}

fn run_session(command: &SessionCommand, session: &SessionContext) -> Result<()> {
    match command {
        SessionCommand::SetToken { token } => {
            session.persist(token).context("Failed to store token")?;
            println!("Token stored in {}", session.token_file_path().display());
        }
        SessionCommand::Clear => {
            session.clear().context("Failed to clear session")?;
            println!("Session cleared");
        }
        SessionCommand::Show => match session.stored() {
            Some(stored) => println!(
                "Signed in ({} token saved {}, file {})",
                stored.token_type,
                stored.saved_at.format("%Y-%m-%d %H:%M:%S UTC"),
                session.token_file_path().display()
            ),
            None => println!("Not signed in. Run `payrolledge session set-token <TOKEN>`."),
        },
    }
    Ok(())
}

async fn run(command: Commands, app: &App) -> Result<()> {
    match command {
        Commands::Session(_) => Ok(()),

        Commands::Records { period, csv } => {
            let view = app.list_view(period.period()?);
            view.refresh().await.context("Failed to fetch payroll records")?;
            let records = view.records();
            let stdout = io::stdout();
            if csv {
                write_records_csv(stdout.lock(), &records, |id| view.employee_name(id))?;
            } else {
                write_summary_cards(stdout.lock(), &view.summary_cards())?;
                println!();
                write_records_table(stdout.lock(), &records, |id| view.employee_name(id))?;
                let awaiting: Vec<String> = records
                    .iter()
                    .filter(|r| view.actions_for(r).approve)
                    .map(|r| format!("#{}", r.id))
                    .collect();
                if !awaiting.is_empty() {
                    println!("\nAwaiting approval: {}", awaiting.join(", "));
                }
                if view.can_mark_as_paid() {
                    println!("\nAll approved. Run `payrolledge mark-paid` to record the payment.");
                }
            }
            Ok(())
        }

        Commands::Summary { period } => {
            let view = app.list_view(period.period()?);
            view.fetch_summary().await;
            write_summary_cards(io::stdout().lock(), &view.summary_cards())?;
            Ok(())
        }

        Commands::Process { period, employees } => {
            let period = period.period()?;
            let trigger = PayrollProcessTrigger::new(app.client.clone(), app.notifier.clone());
            let employee_ids = (!employees.is_empty()).then_some(employees);
            let next = trigger
                .process(period, employee_ids)
                .await
                .with_context(|| format!("Processing payroll for {} failed", period))?;
            info!("Continuing to {}", next.path());

            let view = app.list_view(period);
            view.refresh().await.context("Failed to fetch payroll records")?;
            write_records_table(io::stdout().lock(), &view.records(), |id| {
                view.employee_name(id)
            })?;
            Ok(())
        }

        Commands::Approve { record_id, period } => {
            let view = app.list_view(period.period()?);
            view.fetch_records().await.context("Failed to fetch payroll records")?;
            view.approve(record_id)
                .await
                .with_context(|| format!("Approving record {} failed", record_id))?;
            println!("Record {} approved", record_id);
            Ok(())
        }

        Commands::MarkPaid {
            period,
            payment_date,
        } => {
            let view = app.list_view(period.period()?);
            view.fetch_records().await.context("Failed to fetch payroll records")?;
            let receipt = view
                .mark_as_paid(payment_date)
                .await
                .context("Marking payroll as paid failed")?;
            println!(
                "{}: {} records, net paid {}",
                receipt.message, receipt.total_records, receipt.total_net_paid
            );
            Ok(())
        }

        Commands::Payslip { record_id } => {
            let view = app.list_view(PayrollPeriod::current());
            let record = view
                .get_record(record_id)
                .await
                .with_context(|| format!("Failed to fetch record {}", record_id))?;
            view.set_period(record.period()?);
            view.fetch_records().await.context("Failed to fetch payroll records")?;
            let path = view
                .download_payslip(record_id)
                .await
                .context("Payslip download failed")?;
            println!("Saved {}", path.display());
            Ok(())
        }

        Commands::Report {
            kind,
            period,
            csv,
            department,
        } => {
            let reports = app.reports(period.period()?);
            reports.select(kind);
            reports.set_department(department);
            let path = if csv {
                reports.download_csv().await
            } else {
                reports.generate_report().await
            }
            .with_context(|| format!("{} download failed", kind.title()))?;
            println!("Saved {}", path.display());
            match kind {
                ReportKind::Journal | ReportKind::Payment => println!("\n{}", JOURNAL_FLOW_GUIDANCE),
                ReportKind::Payroll => println!("\n{}", PAYSLIP_GUIDANCE),
                _ => {}
            }
            Ok(())
        }

        Commands::Preview {
            employee_id,
            period,
        } => {
            let view = app.list_view(period.period()?);
            let preview = view
                .calculate_preview(employee_id)
                .await
                .with_context(|| format!("Preview for employee {} failed", employee_id))?;
            println!("{}", serde_json::to_string_pretty(&preview)?);
            Ok(())
        }

        Commands::Dashboard => {
            let period = PayrollPeriod::current();
            let total = dashboard_total_net(&app.client, period).await;
            println!("Net payroll {}: {} ({})", period, total, format_lakhs(total));
            Ok(())
        }

        Commands::Settings(command) => run_settings(command, app).await,

        Commands::Components(command) => run_components(command, app).await,

        Commands::History {
            employee_id,
            status,
        } => {
            let records = app.employee(employee_id).history(status).await;
            if records.is_empty() {
                println!("No payroll records for employee {}", employee_id);
            } else {
                write_records_table(io::stdout().lock(), &records, |id| {
                    format!("Employee #{}", id)
                })?;
            }
            Ok(())
        }
    }
}

async fn run_settings(command: SettingsCommand, app: &App) -> Result<()> {
    let page = PayrollSettingsPage::new(app.client.clone(), app.notifier.clone());
    let Some(current) = page.load().await else {
        bail!("Payroll settings are not available");
    };

    let settings = match command {
        SettingsCommand::Show => current,
        SettingsCommand::Set(changes) => {
            let Some(update) = changes.apply(&current.rates) else {
                bail!("Nothing to change, pass at least one --<setting> flag");
            };
            page.save(&update).await.context("Updating payroll settings failed")?
        }
    };

    let rates = &settings.rates;
    for (label, value) in [
        ("EPF rate (employee) %", rates.epf_rate_employee),
        ("EPF rate (employer) %", rates.epf_rate_employer),
        ("ESIC rate (employee) %", rates.esic_rate_employee),
        ("ESIC rate (employer) %", rates.esic_rate_employer),
        ("Professional tax", rates.professional_tax),
        ("Professional tax limit", rates.professional_tax_limit),
        ("EPF wage limit", rates.epf_wage_limit),
        ("ESIC wage limit", rates.esic_wage_limit),
        ("Standard deduction", rates.standard_deduction),
    ] {
        println!("{:<24} {}", label, value);
    }
    Ok(())
}

async fn run_components(command: ComponentsCommand, app: &App) -> Result<()> {
    match command {
        ComponentsCommand::List { employee_id } => {
            let components = app
                .employee(employee_id)
                .components()
                .await
                .with_context(|| format!("Failed to fetch components of employee {}", employee_id))?;
            for c in &components {
                println!(
                    "#{:<5} {:<24} {:<9} {:>10}  from {}{}{}",
                    c.id,
                    c.component_name,
                    c.component_type.as_str(),
                    c.amount,
                    c.effective_from,
                    c.effective_to
                        .as_deref()
                        .map(|to| format!(" to {}", to))
                        .unwrap_or_default(),
                    if c.is_active { "" } else { " (inactive)" }
                );
            }
            if components.is_empty() {
                println!("No salary components for employee {}", employee_id);
            }
        }
        ComponentsCommand::Add {
            employee_id,
            name,
            component_type,
            amount,
            from,
            to,
            not_taxable,
        } => {
            let component = NewSalaryComponent {
                employee_id,
                component_name: name,
                component_type,
                amount,
                effective_from: from.and_time(NaiveTime::MIN),
                effective_to: to.map(|d| d.and_time(NaiveTime::MIN)),
                is_taxable: !not_taxable,
            };
            let created = app
                .employee(employee_id)
                .add_component(component)
                .await
                .context("Adding salary component failed")?;
            println!("Component {} added", created.id);
        }
        ComponentsCommand::Update {
            employee_id,
            component_id,
            name,
            component_type,
            amount,
            from,
            to,
            taxable,
            active,
        } => {
            let changes = SalaryComponentChanges {
                component_name: name,
                component_type,
                amount,
                effective_from: from.map(|d| d.and_time(NaiveTime::MIN)),
                effective_to: to.map(|d| d.and_time(NaiveTime::MIN)),
                is_taxable: taxable,
                is_active: active,
            };
            app.employee(employee_id)
                .update_component(component_id, &changes)
                .await
                .with_context(|| format!("Updating component {} failed", component_id))?;
            println!("Component {} updated", component_id);
        }
    }
    Ok(())
}
