//! Output formatting for shop availability records (JSON, table, markdown, CSV).

use crate::bookoff::ShopAvailability;
use crate::config::OutputFormat;

/// Formats lookup results for output.
pub struct Formatter {
    format: OutputFormat,
}

impl Formatter {
    /// Creates a new formatter.
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats the records of one lookup.
    pub fn format_records(&self, records: &[ShopAvailability]) -> String {
        if records.is_empty() {
            return match self.format {
                OutputFormat::Json => "[]".to_string(),
                OutputFormat::Csv => self.csv_header(),
                _ => "No shops found.".to_string(),
            };
        }

        match self.format {
            OutputFormat::Json => self.json_records(records),
            OutputFormat::Table => self.table_records(records),
            OutputFormat::Markdown => self.markdown_records(records),
            OutputFormat::Csv => self.csv_records(records),
        }
    }

    // JSON formatting

    fn json_records(&self, records: &[ShopAvailability]) -> String {
        // serde_json leaves non-ASCII text unescaped
        serde_json::to_string_pretty(records).unwrap_or_else(|_| "[]".to_string())
    }

    // Table formatting

    fn table_records(&self, records: &[ShopAvailability]) -> String {
        let isbn_width = 13;
        let price_width = 8;

        let mut lines = Vec::new();

        lines.push(format!("{:<isbn_width$}  {:>price_width$}  {}", "ISBN", "Price", "Shop"));
        lines.push(format!("{:-<isbn_width$}  {:->price_width$}  {:-<30}", "", "", ""));

        for record in records {
            lines.push(format!(
                "{:<isbn_width$}  {:>price_width$}  {}",
                record.isbn,
                Self::price_str(record),
                record.shop
            ));
        }

        lines.push(String::new());
        lines.push(format!("Total: {} shops", records.len()));

        lines.join("\n")
    }

    // Markdown formatting

    fn markdown_records(&self, records: &[ShopAvailability]) -> String {
        let mut lines = Vec::new();

        lines.push("| Shop | Price | ISBN |".to_string());
        lines.push("|------|-------|------|".to_string());

        for record in records {
            lines.push(format!(
                "| {} | {} | {} |",
                record.shop.replace('|', "\\|"),
                Self::price_str(record),
                record.isbn
            ));
        }

        lines.push(String::new());
        lines.push(format!("*{} shops found*", records.len()));

        lines.join("\n")
    }

    // CSV formatting

    fn csv_header(&self) -> String {
        "isbn,shop,price".to_string()
    }

    fn csv_records(&self, records: &[ShopAvailability]) -> String {
        let mut lines = Vec::new();
        lines.push(self.csv_header());

        for record in records {
            let price = record.price.map(|p| p.to_string()).unwrap_or_default();
            lines.push(format!("{},{},{}", record.isbn, Self::csv_escape(&record.shop), price));
        }

        lines.join("\n")
    }

    fn price_str(record: &ShopAvailability) -> String {
        match record.price {
            Some(price) => format!("¥{}", price),
            None => "N/A".to_string(),
        }
    }

    fn csv_escape(s: &str) -> String {
        if s.contains(',') || s.contains('"') || s.contains('\n') {
            format!("\"{}\"", s.replace('"', "\"\""))
        } else {
            s.to_string()
        }
    }
}
