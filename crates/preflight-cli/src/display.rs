//! Display formatting for CLI output
//!
//! Provides:
//! - `ConsoleReporter`, the terminal implementation of the core `Reporter`
//! - Listings for configurations, components and upgrade decisions

use console::{Term, style};
use preflight_core::{
    ComponentDescriptor, ConfigurationSet, Configurations, Reporter, UpgradeDecision,
};
use std::io::{self, Write};
use std::time::Instant;

/// Step reporter writing to stderr
pub struct ConsoleReporter {
    term: Term,
    current: Option<(String, Instant)>,
}

impl ConsoleReporter {
    pub fn new() -> Self {
        Self {
            term: Term::stderr(),
            current: None,
        }
    }

    fn elapsed(&self) -> String {
        self.current
            .as_ref()
            .map(|(_, started)| format!(" {}", style(format!("({:.1}s)", started.elapsed().as_secs_f64())).dim()))
            .unwrap_or_default()
    }
}

impl Reporter for ConsoleReporter {
    fn step(&mut self, name: &str) {
        let _ = self
            .term
            .write_line(&format!("{} {}", style("→").blue().bold(), style(name).bold()));
        self.current = Some((name.to_string(), Instant::now()));
    }

    fn info(&mut self, message: &str) {
        let _ = self.term.write_line(&format!("  {} {}", style("•").dim(), message));
    }

    fn success(&mut self, message: &str) {
        let elapsed = self.elapsed();
        let _ = self
            .term
            .write_line(&format!("{} {}{}", style("✓").green().bold(), message, elapsed));
        self.current = None;
    }

    fn failure(&mut self, message: &str) {
        let step = self
            .current
            .take()
            .map(|(name, _)| format!("{}: ", name))
            .unwrap_or_default();
        let _ = self
            .term
            .write_line(&format!("{} {}{}", style("✗").red().bold(), step, message));
    }
}

/// Print one configuration set, masking secrets unless asked not to
pub fn print_configuration_set(title: &str, set: &ConfigurationSet, show_secrets: bool) {
    let mut out = io::stdout().lock();
    let _ = writeln!(out, "{}", style(title).cyan().bold());
    if set.is_empty() {
        let _ = writeln!(out, "  {}", style("(empty)").dim());
        return;
    }
    for entry in set.iter() {
        let value = if show_secrets { entry.value.as_str() } else { entry.display_value() };
        let marker = if entry.secret { style(" (secret)").dim().to_string() } else { String::new() };
        let _ = writeln!(out, "  {} = {}{}", entry.key, style(value).yellow(), marker);
    }
}

/// Print global and component configuration
pub fn print_configurations(configurations: &Configurations, show_secrets: bool) {
    print_configuration_set("global", &configurations.global, show_secrets);
    for (component, set) in configurations.components() {
        println!();
        print_configuration_set(component, set, show_secrets);
    }
}

/// Print components as an aligned table
pub fn print_components(components: &[ComponentDescriptor], default_namespace: &str) {
    let width = components
        .iter()
        .map(|c| c.name.len())
        .max()
        .unwrap_or(0)
        .max("NAME".len());

    let header = format!("{:<width$}", "NAME", width = width);
    println!("{}  {}", style(header).bold(), style("NAMESPACE").bold());
    for component in components {
        let namespace = if component.namespace.is_empty() {
            style(component.namespace_or(default_namespace).to_string()).dim()
        } else {
            style(component.namespace.clone())
        };
        println!("{:<width$}  {}", component.name, namespace, width = width);
    }
}

/// Print the outcome of the version gate
pub fn print_decision(decision: &UpgradeDecision) {
    if decision.allowed {
        println!(
            "{} Upgrade from {} to {} is allowed",
            style("✓").green().bold(),
            style(&decision.installed).cyan(),
            style(&decision.target).cyan()
        );
    } else {
        println!(
            "{} Upgrade from {} to {} is not possible: {}",
            style("✗").red().bold(),
            style(&decision.installed).cyan(),
            style(&decision.target).cyan(),
            decision.reason_message()
        );
    }
}
