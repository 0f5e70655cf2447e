use crate::engine::ResultSet;

const HEADER: [&str; 6] = [
    "parameter",
    "status",
    "priority",
    "note",
    "current_value",
    "recommended_value",
];

/// CSV with a header row; an empty set renders the header alone.
pub fn render_csv(results: &ResultSet) -> String {
    let mut out = HEADER.join(",");
    out.push('\n');
    for result in results {
        let row = [
            result.parameter.as_str(),
            result.status.as_str(),
            result.priority.as_str(),
            result.note.as_str(),
            result.current_value.as_deref().unwrap_or(""),
            result.recommended_value.as_deref().unwrap_or(""),
        ];
        let fields: Vec<String> = row.iter().map(|f| escape(f)).collect();
        out.push_str(&fields.join(","));
        out.push('\n');
    }
    out
}

/// Quote a field when it contains a separator, quote or line break.
fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{CheckResult, Priority};

    #[test]
    fn test_header_only_when_empty() {
        assert_eq!(
            render_csv(&ResultSet::default()),
            "parameter,status,priority,note,current_value,recommended_value\n"
        );
    }

    #[test]
    fn test_fields_with_commas_are_quoted() {
        let results = ResultSet::new(vec![CheckResult::failed(
            "random_page_cost/seq_page_cost",
            Priority::Medium,
            "For SSD: reduce random_page_cost",
        )
        .current("random=4, seq=1")
        .recommended("random_page_cost 1.1-1.3")]);

        let csv = render_csv(&results);
        let row = csv.lines().nth(1).unwrap();
        assert_eq!(
            row,
            "random_page_cost/seq_page_cost,FAILED,MEDIUM,For SSD: reduce random_page_cost,\"random=4, seq=1\",random_page_cost 1.1-1.3"
        );
    }

    #[test]
    fn test_quotes_are_doubled() {
        assert_eq!(escape(r#"say "hi""#), r#""say ""hi""""#);
        assert_eq!(escape("plain"), "plain");
    }
}
