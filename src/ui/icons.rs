use crate::diagnostics::DiagnosticKind;

pub struct Icons;

impl Icons {
    pub const MAP: &str = "🗺️";
    pub const CHECK: &str = "✅";
    pub const CROSS: &str = "❌";
    pub const WARN: &str = "⚠️";
    pub const STATS: &str = "📊";
    pub const LINK: &str = "🔗";
    pub const FILE: &str = "📄";
    pub const PACKAGE: &str = "📦";
    pub const GEAR: &str = "⚙️";
    pub const SKIP: &str = "⏭️";
    pub const HOURGLASS: &str = "⏳";

    pub fn for_diagnostic(kind: &DiagnosticKind) -> &'static str {
        match kind {
            DiagnosticKind::Skipped(_) => Self::SKIP,
            DiagnosticKind::ParseFailure(_) => Self::WARN,
            DiagnosticKind::Abandoned => Self::HOURGLASS,
            DiagnosticKind::ConsistencyViolation(_) => Self::CROSS,
        }
    }
}
