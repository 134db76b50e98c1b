//! Example: Create an xlsx file with a frozen header and an auto-filter

use tabula::prelude::*;

fn main() -> Result<()> {
    let mut workbook = Workbook::new();
    workbook.rename_sheet(0, "Sales")?;
    let sheet = workbook
        .sheet_mut(0)
        .ok_or_else(|| Error::other("missing first sheet"))?;

    // Add header row
    sheet.append(["Name", "Value", "Double"])?;

    // Add data rows
    sheet.set_value("A2", "Item 1")?;
    sheet.set_value("B2", 100.0)?;
    sheet.set_value("C2", CellValue::formula("=B2*2"))?;

    sheet.set_value("A3", "Item 2")?;
    sheet.set_value("B3", 200.0)?;
    sheet.set_value("C3", CellValue::formula("=B3*2"))?;

    // Add total row
    sheet.set_value("A4", "Total")?;
    sheet.set_value("B4", CellValue::formula("=SUM(B2:B3)"))?;
    sheet.set_value("C4", CellValue::formula("=SUM(C2:C3)"))?;

    sheet.freeze_panes_at("A2")?;
    sheet.set_auto_filter_str("A1:C3")?;

    // Save the file
    workbook.save("/tmp/test.xlsx")?;
    println!("Created /tmp/test.xlsx");

    // Read it back
    let loaded = Workbook::open("/tmp/test.xlsx")?;
    for sheet in loaded.sheets() {
        println!("{}: {}", sheet.title(), sheet.calculate_dimension());
    }

    Ok(())
}
