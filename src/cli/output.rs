//! Output formatting for azure-rm
//!
//! stdout carries results only; everything else goes through `tracing` to
//! stderr.

use super::OutputFormat;
use crate::error::Result;
use crate::modules::{ModuleOutput, ModuleStatus};
use colored::Colorize;
use serde::Serialize;

/// Output formatter for the selected output mode
pub struct OutputFormatter {
    use_color: bool,
    format: OutputFormat,
}

impl OutputFormatter {
    /// Create a new output formatter
    pub fn new(use_color: bool, format: OutputFormat) -> Self {
        // Respect NO_COLOR environment variable
        let use_color = use_color && std::env::var("NO_COLOR").is_err();
        colored::control::set_override(use_color);
        Self { use_color, format }
    }

    pub fn is_json(&self) -> bool {
        self.format == OutputFormat::Json
    }

    fn status_text(&self, status: ModuleStatus) -> String {
        let plain = status.to_string();
        if !self.use_color {
            return plain;
        }
        match status {
            ModuleStatus::Ok => plain.green().to_string(),
            ModuleStatus::Changed => plain.yellow().to_string(),
            ModuleStatus::Failed => plain.red().bold().to_string(),
        }
    }

    /// Render a module result.
    pub fn render_result(&self, module: &str, output: &ModuleOutput) -> Result<String> {
        if self.is_json() {
            return Ok(serde_json::to_string_pretty(output)?);
        }

        let mut text = format!("{}: [{}] => {}", self.status_text(output.status), module, output.msg);
        for warning in &output.warnings {
            let line = format!("[WARNING]: {}", warning);
            text.push('\n');
            text.push_str(&if self.use_color { line.magenta().to_string() } else { line });
        }
        if let Some(details) = output.diff.as_ref().and_then(|d| d.details.as_deref()) {
            text.push('\n');
            text.push_str(&self.colorize_diff(details));
        }
        Ok(text)
    }

    fn colorize_diff(&self, details: &str) -> String {
        details
            .lines()
            .map(|line| match line.chars().next() {
                Some('+') if self.use_color => line.green().to_string(),
                Some('-') if self.use_color => line.red().to_string(),
                _ => line.to_string(),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Print a module result to stdout
    pub fn result(&self, module: &str, output: &ModuleOutput) -> Result<()> {
        println!("{}", self.render_result(module, output)?);
        Ok(())
    }

    /// Print any serializable document, JSON or YAML depending on the mode
    pub fn document<T: Serialize>(&self, value: &T) -> Result<()> {
        if self.is_json() {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            print!("{}", serde_yaml::to_string(value)?);
        }
        Ok(())
    }

    /// Print a name/description table
    pub fn table(&self, rows: &[(String, String)]) {
        let width = rows.iter().map(|(name, _)| name.len()).max().unwrap_or(0);
        for (name, description) in rows {
            let padded = format!("{:<width$}", name, width = width);
            if self.use_color {
                println!("{}  {}", padded.bright_white().bold(), description);
            } else {
                println!("{}  {}", padded, description);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::Diff;

    #[test]
    fn test_human_result_line() {
        let formatter = OutputFormatter::new(false, OutputFormat::Human);
        let output = ModuleOutput::changed("Created resource group 'rg'")
            .with_warnings(vec!["careful".to_string()])
            .with_diff(Diff::new("", "{}").with_details("+{}\n"));
        let text = formatter.render_result("azure_rm_resourcegroup", &output).unwrap();
        assert_eq!(
            text,
            "changed: [azure_rm_resourcegroup] => Created resource group 'rg'\n[WARNING]: careful\n+{}"
        );
    }

    #[test]
    fn test_json_result() {
        let formatter = OutputFormatter::new(false, OutputFormat::Json);
        let text = formatter.render_result("m", &ModuleOutput::ok("fine")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["changed"], false);
        assert_eq!(value["msg"], "fine");
    }
}
