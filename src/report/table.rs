use comfy_table::{presets::UTF8_FULL, Attribute, Cell, Color, ContentArrangement, Table};

use crate::engine::{Priority, ResultSet, Status};
use crate::host::HostProfile;
use crate::rules::Rule;

use super::EMPTY_MESSAGE;

/// Human-readable table with a host header and a summary line.
pub fn render_table(results: &ResultSet, host: &HostProfile) -> String {
    if results.is_empty() {
        return EMPTY_MESSAGE.to_string();
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("Parameter").add_attribute(Attribute::Bold),
        Cell::new("Status").add_attribute(Attribute::Bold),
        Cell::new("Priority").add_attribute(Attribute::Bold),
        Cell::new("Note").add_attribute(Attribute::Bold),
    ]);

    for result in results {
        table.add_row(vec![
            Cell::new(&result.parameter),
            status_cell(result.status),
            priority_cell(result.priority),
            Cell::new(&result.note),
        ]);
    }

    let summary = results.summary();
    let mut out = format!(
        "Host: {} CPUs, {:.1}GB memory, {} storage, {} deployment",
        host.cpu_count,
        host.memory_gb(),
        host.storage_type,
        host.deployment_type
    );
    if let Some(rto) = host.desired_rto_minutes {
        out.push_str(&format!(", RTO {}min", rto));
    }
    out.push('\n');
    out.push_str(&table.to_string());
    out.push_str(&format!(
        "\n{} checks: {} passed, {} failed ({} high, {} medium, {} low)",
        summary.total,
        summary.passed,
        summary.failed,
        summary.failed_high,
        summary.failed_medium,
        summary.failed_low
    ));
    out
}

/// Listing of the rule catalog in evaluation order.
pub fn render_catalog(rules: &[Rule]) -> String {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("#").add_attribute(Attribute::Bold),
        Cell::new("Parameter").add_attribute(Attribute::Bold),
        Cell::new("Category").add_attribute(Attribute::Bold),
        Cell::new("Inputs").add_attribute(Attribute::Bold),
    ]);

    for (i, rule) in rules.iter().enumerate() {
        let inputs: Vec<String> = rule
            .inputs
            .iter()
            .map(|p| format!("{} ({})", p.name, p.kind))
            .collect();
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(rule.parameter),
            Cell::new(rule.category),
            Cell::new(inputs.join("\n")),
        ]);
    }

    table.to_string()
}

fn status_cell(status: Status) -> Cell {
    let color = match status {
        Status::Passed => Color::Green,
        Status::Failed => Color::Red,
    };
    Cell::new(status.as_str()).fg(color)
}

fn priority_cell(priority: Priority) -> Cell {
    let cell = Cell::new(priority.as_str());
    match priority {
        Priority::High => cell.add_attribute(Attribute::Bold),
        Priority::Medium | Priority::Low => cell,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::CheckResult;

    #[test]
    fn test_empty_table_message() {
        let host = HostProfile::with_memory_gb(4, 16);
        assert_eq!(
            render_table(&ResultSet::default(), &host),
            "No results match the specified criteria."
        );
    }

    #[test]
    fn test_table_contains_rows_and_summary() {
        let host = HostProfile::with_memory_gb(4, 16).rto_minutes(5.0);
        let results = ResultSet::new(vec![
            CheckResult::passed("track_io_timing", Priority::Low, "track_io_timing is enabled."),
            CheckResult::failed("statement_timeout", Priority::Low, "No timeout set."),
        ]);
        let out = render_table(&results, &host);

        assert!(out.starts_with("Host: 4 CPUs, 16.0GB memory, ssd storage, onprem deployment, RTO 5min"));
        assert!(out.contains("track_io_timing"));
        assert!(out.contains("statement_timeout"));
        assert!(out.contains("2 checks: 1 passed, 1 failed (0 high, 0 medium, 1 low)"));
    }

    #[test]
    fn test_catalog_listing() {
        let out = render_catalog(crate::rules::CATALOG);
        assert!(out.contains("random_page_cost/seq_page_cost"));
        assert!(out.contains("log_temp_files (bytes)"));
        assert!(out.contains("observability"));
    }
}
