// src/render.rs

use std::io::Write;

use crate::error::{io_context, PayrollError};
use crate::models::PayrollRecord;
use crate::payroll_view::{RecordActions, SummaryCard};

const RECORD_CSV_HEADER: [&str; 8] = [
    "id",
    "employee_id",
    "employee",
    "working_days",
    "gross_earnings",
    "total_deductions",
    "net_salary",
    "status",
];

/// Writes the record list as CSV, labelling rows with `employee_name`.
pub fn write_records_csv<W, F>(
    writer: W,
    records: &[PayrollRecord],
    employee_name: F,
) -> Result<(), PayrollError>
where
    W: Write,
    F: Fn(i64) -> String,
{
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(RECORD_CSV_HEADER)?;
    for record in records {
        csv_writer.write_record([
            record.id.to_string(),
            record.employee_id.to_string(),
            employee_name(record.employee_id),
            record.working_days.to_string(),
            record.gross_earnings.to_string(),
            record.total_deductions.to_string(),
            record.net_salary.to_string(),
            record.status.to_string(),
        ])?;
    }
    csv_writer
        .flush()
        .map_err(|e| io_context(e, "Failed to flush records CSV"))
}

/// Plain text table for the terminal.
pub fn write_records_table<W, F>(
    mut out: W,
    records: &[PayrollRecord],
    employee_name: F,
) -> Result<(), PayrollError>
where
    W: Write,
    F: Fn(i64) -> String,
{
    let io_err = |e: std::io::Error| io_context(e, "Failed to write records table");
    if records.is_empty() {
        writeln!(out, "No payroll records for this period").map_err(io_err)?;
        return Ok(());
    }

    writeln!(
        out,
        "{:<6} {:<24} {:>6} {:>12} {:>12} {:>12} {:<10} {}",
        "ID", "Employee", "Days", "Gross", "Deductions", "Net", "Status", "Actions"
    )
    .map_err(io_err)?;
    for record in records {
        let actions = RecordActions::for_status(record.status);
        let mut labels = Vec::new();
        if actions.download_payslip {
            labels.push("payslip");
        }
        if actions.approve {
            labels.push("approve");
        }
        writeln!(
            out,
            "{:<6} {:<24} {:>6} {:>12} {:>12} {:>12} {:<10} {}",
            record.id,
            employee_name(record.employee_id),
            record.working_days,
            record.gross_earnings,
            record.total_deductions,
            record.net_salary,
            format!("{} ({})", record.status, record.status.badge_colour()),
            labels.join(",")
        )
        .map_err(io_err)?;
    }
    Ok(())
}

pub fn write_summary_cards<W: Write>(mut out: W, cards: &[SummaryCard]) -> Result<(), PayrollError> {
    if cards.is_empty() {
        writeln!(out, "No summary for this period")
            .map_err(|e| io_context(e, "Failed to write summary"))?;
        return Ok(());
    }
    for card in cards {
        writeln!(out, "{:<18} {}", card.label, card.value)
            .map_err(|e| io_context(e, "Failed to write summary"))?;
    }
    Ok(())
}
