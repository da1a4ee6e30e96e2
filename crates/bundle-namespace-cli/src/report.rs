//! Terminal rendering for validation reports and lockfile trees.

use console::style;

use bundle_namespace_core::lockfile::LockDocument;
use bundle_namespace_core::validator::ReportSink;

/// Prints report lines to the terminal with severity colors.
///
/// With `issues_only`, the "is valid" acknowledgement is suppressed.
#[derive(Debug, Default)]
pub struct ConsoleSink {
    issues_only: bool,
}

impl ConsoleSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issues_only() -> Self {
        Self { issues_only: true }
    }
}

impl ReportSink for ConsoleSink {
    fn error(&mut self, message: &str) {
        println!("{}", style(message).red());
    }

    fn warn(&mut self, message: &str) {
        println!("{}", style(message).yellow());
    }

    fn info(&mut self, message: &str) {
        if !self.issues_only {
            println!("{}", style(message).green());
        }
    }
}

/// Lines of the indented `source / namespace / package` tree
pub fn tree_lines(document: &LockDocument) -> Vec<String> {
    let mut lines = Vec::new();
    for source in document.sources() {
        lines.push(format!("{}:", source));
        let Some(namespaces) = document.namespaces(source) else {
            continue;
        };
        for (namespace, packages) in namespaces {
            lines.push(format!("  {} ({}):", namespace, packages.len()));
            for (package, record) in packages {
                let version = record.version.as_deref().unwrap_or("-");
                let mut line = format!("    {:<24} {}", package, version);
                if let Some(platform) = &record.platform {
                    line.push_str(&format!(" [{}]", platform));
                }
                if !record.dependencies.is_empty() {
                    line.push_str(&format!(" -> {}", record.dependencies.join(", ")));
                }
                lines.push(line);
            }
        }
    }
    lines
}
