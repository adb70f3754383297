//! Printers command - show the PrintNode account and its printers.

use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use tabled::{Table, Tabled};

use mailprint_core::Config;
use mailprint_printnode::Printer;

use super::printnode_client;

#[derive(Tabled)]
struct PrinterRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Computer")]
    computer: String,
    #[tabled(rename = "Status")]
    state: String,
    #[tabled(rename = "Description")]
    description: String,
}

impl PrinterRow {
    fn new(printer: &Printer, configured: Option<u64>) -> Self {
        let marker = if configured == Some(printer.id) { " *" } else { "" };
        Self {
            id: format!("{}{marker}", printer.id),
            name: printer.name.clone(),
            computer: printer.computer.name.clone(),
            state: printer.state.clone().unwrap_or_else(|| "unknown".to_string()),
            description: printer
                .description
                .clone()
                .unwrap_or_else(|| "N/A".to_string()),
        }
    }
}

/// Execute the printers command.
///
/// # Errors
///
/// Returns an error if the API key is missing or rejected.
pub async fn execute(config: &Config) -> Result<()> {
    let client = printnode_client(config)?;

    println!("Connecting to PrintNode...");
    let account = client
        .whoami()
        .await
        .context("Authentication failed, check PRINTNODE_API_KEY")?;
    println!(
        "{} Connected as: {} {}",
        "✓".green(),
        account.firstname,
        account.lastname
    );
    println!("  Email: {}", account.email);
    println!();

    let printers = client.printers().await?;
    if printers.is_empty() {
        println!("No printers found.");
        println!();
        println!("Make sure:");
        println!("  1. PrintNode client is installed and running");
        println!("  2. Your printer is connected and turned on");
        println!("  3. The printer is visible in PrintNode dashboard");
        return Ok(());
    }

    println!("Found {} printer(s):", printers.len());
    let rows: Vec<PrinterRow> = printers
        .iter()
        .map(|p| PrinterRow::new(p, config.printnode_printer_id))
        .collect();
    println!("{}", Table::new(rows));
    println!();

    match config.printnode_printer_id {
        Some(id) if printers.iter().any(|p| p.id == id) => {
            println!("{} Configured printer {id} is marked with *", "✓".green());
        }
        Some(id) => {
            println!("{} Configured printer {id} was not found", "✗".red());
        }
        None => {
            println!("To use a printer, set its ID in the environment:");
            println!("  PRINTNODE_PRINTER_ID=<printer_id>");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mailprint_printnode::Computer;

    #[test]
    fn test_configured_printer_is_marked() {
        let printer = Printer {
            id: 73001,
            name: "Warehouse Laser".into(),
            description: None,
            state: Some("online".into()),
            default: None,
            computer: Computer {
                id: 1,
                name: "PACKING-PC".into(),
                state: None,
            },
        };

        assert_eq!(PrinterRow::new(&printer, Some(73001)).id, "73001 *");
        let row = PrinterRow::new(&printer, None);
        assert_eq!(row.id, "73001");
        assert_eq!(row.description, "N/A");
    }
}
