use blueprint::{Action, ProvisioningResult, RunSummary};
use colored::{ColoredString, Colorize};

/// Print an info message
pub fn info(msg: &str) {
    println!("{} {}", "ℹ".blue(), msg);
}

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print a warning message
pub fn warn(msg: &str) {
    println!("{} {}", "⚠".yellow(), msg);
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Print a dim/muted message
pub fn dim(msg: &str) {
    println!("  {}", msg.dimmed());
}

/// Print a header/title
pub fn header(title: &str) {
    println!();
    println!("{}", title.bold());
    println!("{}", "─".repeat(title.chars().count()).dimmed());
}

/// Print a key-value pair
pub fn kv(key: &str, value: &str) {
    println!("  {}: {}", key.dimmed(), value);
}

// ============================================================================
// Results
// ============================================================================

/// Status symbol for a result
pub fn symbol(result: &ProvisioningResult) -> ColoredString {
    match result.action {
        Action::Created | Action::Deleted => "✓".green(),
        Action::Skipped if result.planned => "→".cyan(),
        Action::Skipped => "○".dimmed(),
        Action::Failed => "✗".red(),
    }
}

/// Action label, with dry-run outcomes spelled as what would happen
pub fn action_label(result: &ProvisioningResult) -> String {
    match result.action {
        Action::Skipped if result.planned => "PLANNED".to_string(),
        action => action.to_string(),
    }
}

/// One-line description of a result
pub fn result_line(result: &ProvisioningResult) -> String {
    let mut line = format!(
        "{} {:<8} {} {}",
        symbol(result),
        action_label(result),
        result.resource_type.dimmed(),
        result.resource_name.bold()
    );
    if let Some(id) = &result.server_id {
        line.push_str(&format!(" {}", format!("[{id}]").dimmed()));
    }
    if let Some(error) = &result.error {
        line.push_str(&format!(": {}", error.red()));
    }
    line
}

/// Print every result, one per line
pub fn print_results(results: &[ProvisioningResult]) {
    for result in results {
        println!("  {}", result_line(result));
    }
}

/// Print a run summary
pub fn print_summary(summary: &RunSummary) {
    println!();
    let mut parts = Vec::new();
    if summary.created > 0 {
        parts.push(format!("{} created", summary.created).green().to_string());
    }
    if summary.deleted > 0 {
        parts.push(format!("{} deleted", summary.deleted).green().to_string());
    }
    if summary.planned > 0 {
        parts.push(format!("{} planned", summary.planned).cyan().to_string());
    }
    if summary.skipped > 0 {
        parts.push(format!("{} unchanged", summary.skipped).dimmed().to_string());
    }
    if summary.failed > 0 {
        parts.push(format!("{} failed", summary.failed).red().to_string());
    }
    if parts.is_empty() {
        println!("  {}", "Nothing to do".dimmed());
    } else {
        println!("  {}", parts.join(", "));
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use blueprint::{ResourceDefinition, ServerId};

    fn resource() -> ResourceDefinition {
        ResourceDefinition {
            resource_type: "system".into(),
            name: "S1".into(),
            properties: Default::default(),
            id_reference: "sys1".into(),
            tags: Default::default(),
        }
    }

    #[test]
    fn test_action_label_for_planned() {
        let planned =
            ProvisioningResult::planned(&resource(), ServerId::placeholder("system", "sys1"));
        assert_eq!(action_label(&planned), "PLANNED");
        let skipped = ProvisioningResult::skipped(&resource(), None);
        assert_eq!(action_label(&skipped), "SKIPPED");
    }

    #[test]
    fn test_result_line_includes_id_and_error() {
        colored::control::set_override(false);
        let created = ProvisioningResult::created(&resource(), ServerId::new("system-1"));
        let line = result_line(&created);
        assert!(line.contains("CREATED"));
        assert!(line.contains("S1"));
        assert!(line.contains("[system-1]"));

        let failed = ProvisioningResult::failed(&resource(), "quota exceeded");
        assert!(result_line(&failed).ends_with(": quota exceeded"));
    }
}
