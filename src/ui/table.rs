use crate::language::Language;
use crate::report::AnalysisReport;
use tabled::{settings::Style, Table, Tabled};

#[derive(Tabled)]
pub struct TableRow {
    #[tabled(rename = "Metric")]
    pub metric: String,
    #[tabled(rename = "Value")]
    pub value: String,
}

#[derive(Tabled)]
struct LanguageRow {
    #[tabled(rename = "Language")]
    language: &'static str,
    #[tabled(rename = "Extensions")]
    extensions: String,
}

#[derive(Default)]
pub struct TableBuilder {
    rows: Vec<TableRow>,
}

impl TableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_row(&mut self, label: &str, value: impl ToString) {
        self.rows.push(TableRow {
            metric: label.to_string(),
            value: value.to_string(),
        });
    }

    pub fn build(&self) -> String {
        if self.rows.is_empty() {
            return String::new();
        }
        Table::new(&self.rows).with(Style::rounded()).to_string()
    }
}

/// Graph and completeness figures of a report
pub fn summary_table(report: &AnalysisReport) -> String {
    let stats = report.graph.stats();
    let completeness = &report.completeness;
    let mut builder = TableBuilder::new();
    builder.add_row("Files analyzed", completeness.files_analyzed);
    builder.add_row("Files skipped", completeness.files_skipped);
    builder.add_row("Parse failures", completeness.parse_failures);
    if completeness.partial {
        builder.add_row("Abandoned", completeness.abandoned);
    }
    builder.add_row("Modules", stats.modules);
    builder.add_row("Classes", stats.classes);
    builder.add_row("Functions", stats.functions);
    builder.add_row("Methods", stats.methods);
    builder.add_row(
        "Imports (internal / external)",
        format!("{} / {}", stats.internal_imports, stats.external_imports),
    );
    builder.add_row(
        "Calls (resolved / unresolved)",
        format!("{} / {}", stats.resolved_calls, stats.unresolved_calls),
    );
    if completeness.consistency_violations > 0 {
        builder.add_row("Consistency violations", completeness.consistency_violations);
    }
    builder.build()
}

pub fn languages_table() -> String {
    let rows: Vec<LanguageRow> = Language::all()
        .iter()
        .map(|language| LanguageRow {
            language: language.as_str(),
            extensions: language
                .extensions()
                .iter()
                .map(|e| format!(".{}", e))
                .collect::<Vec<_>>()
                .join(" "),
        })
        .collect();
    Table::new(rows).with(Style::rounded()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_builder_renders_nothing() {
        assert!(TableBuilder::new().build().is_empty());
    }

    #[test]
    fn test_languages_table_lists_extensions() {
        let table = languages_table();
        assert!(table.contains("python"));
        assert!(table.contains(".rs"));
        assert!(table.contains(".mjs"));
    }
}
