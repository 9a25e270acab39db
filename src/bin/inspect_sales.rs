use salesboard::{
    load::LoadOptions,
    load_sales_table,
    schema::{InvoiceDate, REQUIRED_COLUMNS},
};
use std::{env, path::Path, process::exit};

fn main() {
    // Expect one CLI argument: path to a workbook or CSV file, plus an optional sheet name.
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 || args.len() > 3 {
        eprintln!("Usage: {} <SOURCE> [SHEET]", args[0]);
        exit(1);
    }
    let opts = LoadOptions {
        sheet: args.get(2).cloned(),
        ..LoadOptions::default()
    };
    if let Err(e) = inspect_sales(Path::new(&args[1]), &opts) {
        eprintln!("Error: {}", e);
        exit(1);
    }
}

/// Load the source and print its columns, size and date range.
fn inspect_sales(path: &Path, opts: &LoadOptions) -> Result<(), Box<dyn std::error::Error>> {
    let table = load_sales_table(path, opts)?;
    let file_size_disk = std::fs::metadata(path)?.len();

    println!("=== Sales source: {} ===", path.display());
    println!("File-size on disk:    {} bytes", file_size_disk);
    println!("Total rows:           {}", table.len());
    match table.total_units() {
        Some(units) => println!("Total units sold:     {}", units),
        None => println!("Total units sold:     <overflows u64>"),
    }
    match table.total_sales() {
        Some(sales) => println!("Total sales:          {}", sales),
        None => println!("Total sales:          <overflows>"),
    }
    match (table.earliest_invoice_date(), table.latest_invoice_date()) {
        (Some(first), Some(last)) => println!("Invoice dates:        {} .. {}", first, last),
        _ => println!("Invoice dates:        <none parsable>"),
    }
    println!();

    println!("=== Columns ===");
    for name in REQUIRED_COLUMNS {
        println!("- {:<30} | required", name);
    }
    for name in table.extra_columns() {
        println!("- {:<30} | extra", name);
    }

    let unparsed = table
        .records()
        .iter()
        .filter(|r| matches!(r.invoice_date, Some(InvoiceDate::Unparsed(_))))
        .count();
    if unparsed > 0 {
        println!();
        println!("{} row(s) carry an unparsable InvoiceDate", unparsed);
    }
    Ok(())
}
