//! Worksheet parts (`xl/worksheets/sheetN.xml`)
//!
//! Worksheets are the only large parts of a package, so they are streamed on
//! read and built as strings on write.

use std::collections::BTreeMap;

use log::warn;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use tabula_core::worksheet::DEFAULT_ROW_HEIGHT;
use tabula_core::{
    Cell, CellError, CellReference, CellValue, ColumnProperties, PageOrientation, RangeReference,
    RowProperties, Worksheet, MAX_ROW,
};

use crate::constants::namespace;
use crate::error::{XlsxError, XlsxResult};
use crate::shared_strings::{decode_excel_escapes, encode_excel_escapes};
use crate::xml::{escape_xml, XML_DECLARATION};

fn is_true(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}

fn attributes(e: &BytesStart<'_>) -> XlsxResult<Vec<(Vec<u8>, String)>> {
    let mut out = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        out.push((attr.key.as_ref().to_vec(), attr.unescape_value()?.into_owned()));
    }
    Ok(out)
}

fn parse_cell_reference(text: &str) -> XlsxResult<CellReference> {
    CellReference::parse(text)
        .map_err(|e| XlsxError::Parse(format!("Invalid cell reference '{}': {}", text, e)))
}

fn parse_range(text: &str) -> XlsxResult<RangeReference> {
    RangeReference::parse(text)
        .map_err(|e| XlsxError::Parse(format!("Invalid range '{}': {}", text, e)))
}

/// Cell being assembled while its children are read
#[derive(Default)]
struct PendingCell {
    reference: Option<CellReference>,
    cell_type: Option<String>,
    style: Option<u32>,
    value: Option<String>,
    formula: Option<String>,
    inline_text: Option<String>,
}

/// Read a worksheet part into `worksheet`
pub fn read_worksheet(
    bytes: &[u8],
    worksheet: &mut Worksheet,
    shared_strings: &[String],
) -> XlsxResult<()> {
    let mut xml_reader = Reader::from_reader(bytes);
    xml_reader.trim_text(false);

    let mut buf = Vec::new();

    // Row and column cursors for cells and rows written without `r`
    let mut current_row = 0u32;
    let mut next_column = 1u32;

    let mut cell = PendingCell::default();
    let mut in_cell = false;
    let mut in_value = false;
    let mut in_formula = false;
    let mut in_inline_str = false;
    let mut in_inline_text = false;
    let mut in_phonetic = false;

    loop {
        match xml_reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"row" => {
                    current_row = read_row(&e, worksheet, current_row)?;
                    next_column = 1;
                }
                b"c" => {
                    cell = start_cell(&e, current_row, next_column)?;
                    in_cell = true;
                }
                b"v" if in_cell => in_value = true,
                b"f" if in_cell => in_formula = true,
                b"is" if in_cell => {
                    in_inline_str = true;
                    cell.inline_text = Some(String::new());
                }
                b"rPh" if in_inline_str => in_phonetic = true,
                b"t" if in_inline_str && !in_phonetic => in_inline_text = true,
                b"pageSetUpPr" | b"pane" | b"col" | b"mergeCell" | b"autoFilter"
                | b"pageMargins" | b"pageSetup" => read_empty_element(&e, worksheet)?,
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"row" => {
                    current_row = read_row(&e, worksheet, current_row)?;
                    next_column = 1;
                }
                b"c" => {
                    let pending = start_cell(&e, current_row, next_column)?;
                    next_column = finish_cell(pending, worksheet, shared_strings)?;
                }
                b"f" if in_cell => {
                    // Shared-formula children carry no text
                    cell.formula.get_or_insert_with(String::new);
                }
                _ => read_empty_element(&e, worksheet)?,
            },
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"c" => {
                    next_column =
                        finish_cell(std::mem::take(&mut cell), worksheet, shared_strings)?;
                    in_cell = false;
                }
                b"v" => in_value = false,
                b"f" => in_formula = false,
                b"is" => in_inline_str = false,
                b"rPh" => in_phonetic = false,
                b"t" => in_inline_text = false,
                _ => {}
            },
            Ok(Event::Text(e)) if in_value || in_formula || in_inline_text => {
                let text = e.unescape()?;
                let slot = if in_value {
                    &mut cell.value
                } else if in_formula {
                    &mut cell.formula
                } else {
                    &mut cell.inline_text
                };
                slot.get_or_insert_with(String::new).push_str(&text);
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(XlsxError::Xml(e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(())
}

/// Apply a `<row>` element's properties; returns the row number
fn read_row(e: &BytesStart<'_>, worksheet: &mut Worksheet, previous_row: u32) -> XlsxResult<u32> {
    let mut row = previous_row
        .checked_add(1)
        .ok_or_else(|| XlsxError::Parse(format!("Row after {} is out of range", previous_row)))?;
    let mut props = RowProperties::default();
    let mut height = None;
    let mut custom_height = false;
    let mut style = None;
    let mut custom_format = false;

    for (key, value) in attributes(e)? {
        match key.as_slice() {
            b"r" => {
                row = value
                    .parse()
                    .map_err(|_| XlsxError::Parse(format!("Invalid row number '{}'", value)))?;
            }
            b"ht" => height = value.parse::<f64>().ok(),
            b"customHeight" => custom_height = is_true(&value),
            b"hidden" => props.hidden = is_true(&value),
            b"outlineLevel" => props.outline_level = value.parse().unwrap_or(0),
            b"collapsed" => props.collapsed = is_true(&value),
            b"s" => style = value.parse::<u32>().ok(),
            b"customFormat" => custom_format = is_true(&value),
            _ => {}
        }
    }

    if !(1..=MAX_ROW).contains(&row) {
        return Err(XlsxError::Parse(format!(
            "Row number {} outside 1..={}",
            row, MAX_ROW
        )));
    }

    if custom_height {
        props.height = height;
    }
    if custom_format {
        props.style_index = style;
    }
    if props.has_custom_settings() {
        *worksheet.row_properties_mut(row) = props;
    }

    Ok(row)
}

fn start_cell(e: &BytesStart<'_>, row: u32, column: u32) -> XlsxResult<PendingCell> {
    let mut cell = PendingCell::default();

    for (key, value) in attributes(e)? {
        match key.as_slice() {
            b"r" => cell.reference = Some(parse_cell_reference(&value)?),
            b"t" => cell.cell_type = Some(value),
            b"s" => cell.style = value.parse::<u32>().ok(),
            _ => {}
        }
    }

    if cell.reference.is_none() {
        let reference = CellReference::new(column, row.max(1)).map_err(|e| {
            XlsxError::Parse(format!("Cell without reference out of range: {}", e))
        })?;
        cell.reference = Some(reference);
    }

    Ok(cell)
}

/// Store a finished cell; returns the column following it
fn finish_cell(
    cell: PendingCell,
    worksheet: &mut Worksheet,
    shared_strings: &[String],
) -> XlsxResult<u32> {
    let Some(reference) = cell.reference else {
        return Ok(1);
    };

    let value = match (&cell.formula, cell.cell_type.as_deref()) {
        (Some(formula), _) if !formula.is_empty() => Some(CellValue::formula(formula)),
        (_, Some("inlineStr")) => cell
            .inline_text
            .as_deref()
            .or(cell.value.as_deref())
            .map(|text| CellValue::String(decode_excel_escapes(text))),
        (_, cell_type) => match cell.value.as_deref() {
            Some(value) => Some(typed_value(value, cell_type, shared_strings)?),
            None => None,
        },
    };

    if value.is_some() || cell.style.map_or(false, |s| s != 0) {
        let target = worksheet.cell_at_mut(reference);
        if let Some(value) = value {
            target.set_value(value);
        }
        if let Some(style) = cell.style {
            target.set_style_index(style);
        }
    }

    Ok(reference.column() + 1)
}

fn typed_value(
    value: &str,
    cell_type: Option<&str>,
    shared_strings: &[String],
) -> XlsxResult<CellValue> {
    let cell_value = match cell_type {
        // Shared string
        Some("s") => {
            let idx: usize = value.trim().parse().map_err(|_| {
                XlsxError::Parse(format!("Invalid shared string index: {}", value))
            })?;
            let s = shared_strings.get(idx).ok_or_else(|| {
                XlsxError::Parse(format!("Shared string index {} out of bounds", idx))
            })?;
            CellValue::String(s.clone())
        }

        Some("b") => CellValue::Boolean(is_true(value.trim())),

        Some("e") => CellError::parse(value.trim())
            .map(CellValue::Error)
            .unwrap_or_else(|| CellValue::String(value.to_string())),

        Some("str") => CellValue::String(decode_excel_escapes(value)),

        // Number (default type or explicit "n")
        None | Some("n") => match value.trim().parse::<f64>() {
            Ok(n) => CellValue::Number(n),
            Err(_) => CellValue::String(value.to_string()),
        },

        // Unknown type - treat as string
        Some(_) => CellValue::String(value.to_string()),
    };

    Ok(cell_value)
}

/// Elements outside `sheetData` that carry everything in their attributes
fn read_empty_element(e: &BytesStart<'_>, worksheet: &mut Worksheet) -> XlsxResult<()> {
    match e.local_name().as_ref() {
        b"pageSetUpPr" => {
            for (key, value) in attributes(e)? {
                if key == b"fitToPage" {
                    worksheet.page_setup_mut().fit_to_page = is_true(&value);
                }
            }
        }
        b"pane" => read_pane(e, worksheet)?,
        b"col" => read_column(e, worksheet)?,
        b"mergeCell" => {
            for (key, value) in attributes(e)? {
                if key == b"ref" {
                    worksheet.merge(parse_range(&value)?)?;
                }
            }
        }
        b"autoFilter" => {
            for (key, value) in attributes(e)? {
                if key == b"ref" {
                    worksheet.set_auto_filter(parse_range(&value)?);
                }
            }
        }
        b"pageMargins" => {
            let margins = &mut worksheet.page_setup_mut().margins;
            for (key, value) in attributes(e)? {
                let Ok(inches) = value.parse::<f64>() else {
                    warn!("Ignoring page margin {}='{}'", String::from_utf8_lossy(&key), value);
                    continue;
                };
                match key.as_slice() {
                    b"left" => margins.left = inches,
                    b"right" => margins.right = inches,
                    b"top" => margins.top = inches,
                    b"bottom" => margins.bottom = inches,
                    b"header" => margins.header = inches,
                    b"footer" => margins.footer = inches,
                    _ => {}
                }
            }
        }
        b"pageSetup" => {
            let setup = worksheet.page_setup_mut();
            for (key, value) in attributes(e)? {
                match key.as_slice() {
                    b"orientation" => {
                        setup.orientation = match value.as_str() {
                            "portrait" => PageOrientation::Portrait,
                            "landscape" => PageOrientation::Landscape,
                            _ => PageOrientation::Default,
                        }
                    }
                    b"paperSize" => setup.paper_size = value.parse().ok(),
                    b"fitToWidth" => {
                        setup.fit_to_width = value.parse::<u32>().map_or(false, |n| n > 0)
                    }
                    b"fitToHeight" => {
                        setup.fit_to_height = value.parse::<u32>().map_or(false, |n| n > 0)
                    }
                    _ => {}
                }
            }
        }
        _ => {}
    }
    Ok(())
}

fn read_pane(e: &BytesStart<'_>, worksheet: &mut Worksheet) -> XlsxResult<()> {
    let mut frozen = false;
    let mut top_left = None;
    let mut x_split = 0u32;
    let mut y_split = 0u32;

    for (key, value) in attributes(e)? {
        match key.as_slice() {
            b"state" => frozen = value == "frozen" || value == "frozenSplit",
            b"topLeftCell" => top_left = Some(parse_cell_reference(&value)?),
            b"xSplit" => x_split = value.parse::<f64>().map_or(0, |n| n.max(0.0) as u32),
            b"ySplit" => y_split = value.parse::<f64>().map_or(0, |n| n.max(0.0) as u32),
            _ => {}
        }
    }

    if !frozen {
        return Ok(());
    }

    let top_left = match top_left {
        Some(reference) => reference,
        None => {
            let split_error = || {
                XlsxError::Parse(format!(
                    "Frozen pane split {}x{} is out of range",
                    x_split, y_split
                ))
            };
            let column = x_split.checked_add(1).ok_or_else(split_error)?;
            let row = y_split.checked_add(1).ok_or_else(split_error)?;
            CellReference::new(column, row)
                .map_err(|e| XlsxError::Parse(format!("Invalid frozen pane split: {}", e)))?
        }
    };
    worksheet.freeze_panes(top_left);
    Ok(())
}

fn read_column(e: &BytesStart<'_>, worksheet: &mut Worksheet) -> XlsxResult<()> {
    let mut min = None;
    let mut max = None;
    let mut props = ColumnProperties::default();
    let mut width = None;
    let mut custom_width = false;

    for (key, value) in attributes(e)? {
        match key.as_slice() {
            b"min" => min = value.parse::<u32>().ok(),
            b"max" => max = value.parse::<u32>().ok(),
            b"width" => width = value.parse::<f64>().ok(),
            b"customWidth" => custom_width = is_true(&value),
            b"hidden" => props.hidden = is_true(&value),
            b"bestFit" => props.best_fit = is_true(&value),
            b"style" => props.style_index = value.parse::<u32>().ok().filter(|&s| s != 0),
            b"outlineLevel" => props.outline_level = value.parse().unwrap_or(0),
            b"collapsed" => props.collapsed = is_true(&value),
            _ => {}
        }
    }

    let Some(min) = min.filter(|&m| (1..=tabula_core::MAX_COLUMN).contains(&m)) else {
        warn!("Skipping <col> without a valid min");
        return Ok(());
    };
    let max = max.unwrap_or(min).clamp(min, tabula_core::MAX_COLUMN);

    if custom_width || props.best_fit {
        props.width = width;
    }
    if !props.has_custom_settings() {
        return Ok(());
    }

    for column in min..=max {
        *worksheet.column_properties_mut(column) = props.clone();
    }
    Ok(())
}

/// Build a worksheet part
pub fn write_worksheet(worksheet: &Worksheet) -> String {
    let mut content = String::with_capacity(4096);
    content.push_str(XML_DECLARATION);
    content.push_str(&format!(
        "\n<worksheet xmlns=\"{}\" xmlns:r=\"{}\">",
        namespace::SPREADSHEETML,
        namespace::RELATIONSHIPS
    ));

    let setup = worksheet.page_setup();
    if setup.fit_to_page {
        content.push_str("\n    <sheetPr>\n        <pageSetUpPr fitToPage=\"1\"/>\n    </sheetPr>");
    }

    content.push_str(&format!(
        "\n    <dimension ref=\"{}\"/>",
        compact_range(worksheet.calculate_dimension())
    ));

    write_sheet_views(&mut content, worksheet);

    content.push_str(&format!(
        "\n    <sheetFormatPr baseColWidth=\"10\" defaultRowHeight=\"{}\"/>",
        DEFAULT_ROW_HEIGHT
    ));

    write_columns(&mut content, worksheet);
    write_sheet_data(&mut content, worksheet);

    if worksheet.has_auto_filter() {
        content.push_str(&format!(
            "\n    <autoFilter ref=\"{}\"/>",
            worksheet.auto_filter()
        ));
    }

    let merged = worksheet.merged_ranges();
    if !merged.is_empty() {
        content.push_str(&format!("\n    <mergeCells count=\"{}\">", merged.len()));
        for range in merged {
            content.push_str(&format!("\n        <mergeCell ref=\"{}\"/>", range));
        }
        content.push_str("\n    </mergeCells>");
    }

    let margins = &setup.margins;
    content.push_str(&format!(
        "\n    <pageMargins left=\"{}\" right=\"{}\" top=\"{}\" bottom=\"{}\" header=\"{}\" footer=\"{}\"/>",
        margins.left, margins.right, margins.top, margins.bottom, margins.header, margins.footer
    ));

    if !setup.is_default() {
        content.push_str("\n    <pageSetup");
        if let Some(paper_size) = setup.paper_size {
            content.push_str(&format!(" paperSize=\"{}\"", paper_size));
        }
        if let Some(orientation) = setup.orientation.as_str() {
            content.push_str(&format!(" orientation=\"{}\"", orientation));
        }
        if setup.fit_to_width {
            content.push_str(" fitToWidth=\"1\"");
        }
        if setup.fit_to_height {
            content.push_str(" fitToHeight=\"1\"");
        }
        content.push_str("/>");
    }

    content.push_str("\n</worksheet>");
    content
}

/// `A1` for a single cell, `A1:C3` otherwise
fn compact_range(range: RangeReference) -> String {
    if range.top_left().same_cell(&range.bottom_right()) {
        range.top_left().to_string()
    } else {
        range.to_string()
    }
}

fn write_sheet_views(content: &mut String, worksheet: &Worksheet) {
    content.push_str("\n    <sheetViews>\n        <sheetView workbookViewId=\"0\">");

    if worksheet.has_frozen_panes() {
        let top_left = worksheet.frozen_panes();
        let x_split = top_left.column() - 1;
        let y_split = top_left.row() - 1;
        let active_pane = match (x_split > 0, y_split > 0) {
            (true, true) => "bottomRight",
            (false, true) => "bottomLeft",
            _ => "topRight",
        };

        content.push_str("\n            <pane");
        if x_split > 0 {
            content.push_str(&format!(" xSplit=\"{}\"", x_split));
        }
        if y_split > 0 {
            content.push_str(&format!(" ySplit=\"{}\"", y_split));
        }
        content.push_str(&format!(
            " topLeftCell=\"{}\" activePane=\"{}\" state=\"frozen\"/>",
            top_left, active_pane
        ));
        content.push_str(&format!(
            "\n            <selection pane=\"{}\" activeCell=\"{}\" sqref=\"{}\"/>",
            active_pane, top_left, top_left
        ));
    } else {
        content.push_str("\n            <selection activeCell=\"A1\" sqref=\"A1\"/>");
    }

    content.push_str("\n        </sheetView>\n    </sheetViews>");
}

fn write_columns(content: &mut String, worksheet: &Worksheet) {
    // Runs of adjacent columns with identical properties share one <col>
    let mut runs: Vec<(u32, u32, &ColumnProperties)> = Vec::new();
    for (column, props) in worksheet.iter_column_properties() {
        if !props.has_custom_settings() {
            continue;
        }
        match runs.last_mut() {
            Some((_, max, last)) if *max + 1 == column && *last == props => *max = column,
            _ => runs.push((column, column, props)),
        }
    }

    if runs.is_empty() {
        return;
    }

    content.push_str("\n    <cols>");
    for (min, max, props) in runs {
        content.push_str(&format!("\n        <col min=\"{}\" max=\"{}\"", min, max));
        match props.width {
            Some(width) => content.push_str(&format!(" width=\"{}\" customWidth=\"1\"", width)),
            None => content.push_str(" width=\"10\""),
        }
        if let Some(style) = props.style_index {
            content.push_str(&format!(" style=\"{}\"", style));
        }
        if props.hidden {
            content.push_str(" hidden=\"1\"");
        }
        if props.best_fit {
            content.push_str(" bestFit=\"1\"");
        }
        if props.outline_level > 0 {
            content.push_str(&format!(" outlineLevel=\"{}\"", props.outline_level));
        }
        if props.collapsed {
            content.push_str(" collapsed=\"1\"");
        }
        content.push_str("/>");
    }
    content.push_str("\n    </cols>");
}

fn write_sheet_data(content: &mut String, worksheet: &Worksheet) {
    let mut rows: BTreeMap<u32, Vec<&Cell>> = BTreeMap::new();
    for cell in worksheet.iter_cells() {
        if cell.value().is_empty() && !cell.has_style() {
            continue;
        }
        rows.entry(cell.reference().row()).or_default().push(cell);
    }
    for (row, props) in worksheet.iter_row_properties() {
        if props.has_custom_settings() {
            rows.entry(row).or_default();
        }
    }

    if rows.is_empty() {
        content.push_str("\n    <sheetData/>");
        return;
    }

    content.push_str("\n    <sheetData>");
    for (row, cells) in rows {
        content.push_str(&format!("\n        <row r=\"{}\"", row));
        if let Some(props) = worksheet.row_properties(row) {
            write_row_attributes(content, props);
        }

        if cells.is_empty() {
            content.push_str("/>");
            continue;
        }

        content.push('>');
        for cell in cells {
            write_cell(content, cell);
        }
        content.push_str("\n        </row>");
    }
    content.push_str("\n    </sheetData>");
}

fn write_row_attributes(content: &mut String, props: &RowProperties) {
    if let Some(style) = props.style_index {
        content.push_str(&format!(" s=\"{}\" customFormat=\"1\"", style));
    }
    if let Some(height) = props.height {
        content.push_str(&format!(" ht=\"{}\" customHeight=\"1\"", height));
    }
    if props.hidden {
        content.push_str(" hidden=\"1\"");
    }
    if props.outline_level > 0 {
        content.push_str(&format!(" outlineLevel=\"{}\"", props.outline_level));
    }
    if props.collapsed {
        content.push_str(" collapsed=\"1\"");
    }
}

fn write_cell(content: &mut String, cell: &Cell) {
    let cell_ref = cell.reference();
    let style_attr = if cell.has_style() {
        format!(" s=\"{}\"", cell.style_index())
    } else {
        String::new()
    };

    match cell.value() {
        CellValue::Number(n) if n.is_finite() => {
            content.push_str(&format!(
                "\n            <c r=\"{}\"{}><v>{}</v></c>",
                cell_ref, style_attr, n
            ));
        }
        CellValue::Number(_) => {
            content.push_str(&format!(
                "\n            <c r=\"{}\"{} t=\"e\"><v>{}</v></c>",
                cell_ref,
                style_attr,
                CellError::Num.as_str()
            ));
        }
        CellValue::String(s) => {
            let space = if needs_preserve(s) {
                " xml:space=\"preserve\""
            } else {
                ""
            };
            content.push_str(&format!(
                "\n            <c r=\"{}\"{} t=\"inlineStr\"><is><t{}>{}</t></is></c>",
                cell_ref,
                style_attr,
                space,
                escape_xml(&encode_excel_escapes(s))
            ));
        }
        CellValue::Boolean(b) => {
            content.push_str(&format!(
                "\n            <c r=\"{}\"{} t=\"b\"><v>{}</v></c>",
                cell_ref,
                style_attr,
                if *b { 1 } else { 0 }
            ));
        }
        CellValue::Formula(text) => {
            content.push_str(&format!(
                "\n            <c r=\"{}\"{}><f>{}</f></c>",
                cell_ref,
                style_attr,
                escape_xml(text)
            ));
        }
        CellValue::Error(e) => {
            content.push_str(&format!(
                "\n            <c r=\"{}\"{} t=\"e\"><v>{}</v></c>",
                cell_ref,
                style_attr,
                escape_xml(e.as_str())
            ));
        }
        CellValue::Empty => {
            // Preserve style-only cells
            if cell.has_style() {
                content.push_str(&format!("\n            <c r=\"{}\"{}/>", cell_ref, style_attr));
            }
        }
    }
}

fn needs_preserve(s: &str) -> bool {
    s.starts_with(char::is_whitespace) || s.ends_with(char::is_whitespace) || s.contains('\n')
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tabula_core::{PageMargins, SheetState, Workbook};

    fn sheet() -> Worksheet {
        let mut wb = Workbook::new();
        wb.remove_sheet(0).unwrap()
    }

    fn at(s: &str) -> CellReference {
        CellReference::parse(s).unwrap()
    }

    fn reread(ws: &Worksheet) -> Worksheet {
        let xml = write_worksheet(ws);
        let mut decoded = sheet();
        read_worksheet(xml.as_bytes(), &mut decoded, &[]).unwrap();
        decoded
    }

    fn values(ws: &Worksheet) -> Vec<(String, CellValue)> {
        ws.iter_cells()
            .map(|c| (c.reference().to_string(), c.value().clone()))
            .collect()
    }

    #[test]
    fn test_read_cell_types() {
        let xml = br#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
    <sheetData>
        <row r="1">
            <c r="A1" t="s"><v>1</v></c>
            <c r="B1"><v>42.5</v></c>
            <c r="C1" t="b"><v>1</v></c>
            <c r="D1" t="e"><v>#DIV/0!</v></c>
            <c r="E1"><f>SUM(B1:B3)</f><v>42.5</v></c>
            <c r="F1" t="inlineStr"><is><t xml:space="preserve"> two  spaces </t></is></c>
            <c r="G1" t="str"><v>line_x000a_break</v></c>
            <c r="H1" s="4"/>
        </row>
    </sheetData>
</worksheet>"#;

        let mut ws = sheet();
        read_worksheet(xml, &mut ws, &["zero".to_string(), "one".to_string()]).unwrap();

        assert_eq!(
            values(&ws),
            vec![
                ("A1".to_string(), CellValue::String("one".to_string())),
                ("B1".to_string(), CellValue::Number(42.5)),
                ("C1".to_string(), CellValue::Boolean(true)),
                ("D1".to_string(), CellValue::Error(CellError::Div0)),
                ("E1".to_string(), CellValue::Formula("SUM(B1:B3)".to_string())),
                ("F1".to_string(), CellValue::String(" two  spaces ".to_string())),
                ("G1".to_string(), CellValue::String("line\nbreak".to_string())),
                ("H1".to_string(), CellValue::Empty),
            ]
        );
        assert_eq!(ws.cell("H1").unwrap().style_index(), 4);
    }

    #[test]
    fn test_shared_string_index_out_of_bounds() {
        let xml =
            br#"<worksheet><sheetData><row r="1"><c r="A1" t="s"><v>3</v></c></row></sheetData></worksheet>"#;
        let mut ws = sheet();
        assert!(matches!(
            read_worksheet(xml, &mut ws, &[]),
            Err(XlsxError::Parse(_))
        ));
    }

    #[test]
    fn test_cells_without_references() {
        let xml = br#"<worksheet><sheetData>
            <row><c><v>1</v></c><c><v>2</v></c></row>
            <row r="4"><c r="C4"><v>3</v></c><c><v>4</v></c></row>
        </sheetData></worksheet>"#;
        let mut ws = sheet();
        read_worksheet(xml, &mut ws, &[]).unwrap();

        let refs: Vec<_> = values(&ws).into_iter().map(|(r, _)| r).collect();
        assert_eq!(refs, ["A1", "B1", "C4", "D4"]);
    }

    #[test]
    fn test_values_roundtrip() {
        let mut ws = sheet();
        ws.set_value("A1", "text").unwrap();
        ws.set_value("B1", 0.1).unwrap();
        ws.set_value("C1", -12345678.9).unwrap();
        ws.set_value("A2", true).unwrap();
        ws.set_value("B2", CellError::Na).unwrap();
        ws.set_value("C2", CellValue::formula("=IF(A2,\"a<b\",\"\")")).unwrap();
        ws.set_value("A3", "  padded\r\nlines  ").unwrap();
        ws.set_value("B3", "_x0041_ literal").unwrap();
        ws.cell_mut("C3").unwrap().set_style_index(7);

        let decoded = reread(&ws);
        assert_eq!(values(&decoded), values(&ws));
        assert_eq!(decoded.cell("C3").unwrap().style_index(), 7);
    }

    #[test]
    fn test_non_finite_number_written_as_error() {
        let mut ws = sheet();
        ws.set_value("A1", f64::NAN).unwrap();
        let decoded = reread(&ws);
        assert_eq!(
            decoded.value("A1").unwrap(),
            &CellValue::Error(CellError::Num)
        );
    }

    #[test]
    fn test_layout_roundtrip() {
        let mut ws = sheet();
        ws.set_value("A1", 1).unwrap();
        ws.merge_cells("B2:C3").unwrap();
        ws.freeze_panes_at("B3").unwrap();
        ws.set_auto_filter_str("A1:D20").unwrap();
        ws.row_properties_mut(2).height = Some(30.0);
        ws.row_properties_mut(7).hidden = true;
        ws.column_properties_mut(2).width = Some(18.5);
        ws.column_properties_mut(3).width = Some(18.5);
        ws.column_properties_mut(5).hidden = true;
        {
            let setup = ws.page_setup_mut();
            setup.orientation = PageOrientation::Landscape;
            setup.paper_size = Some(9);
            setup.fit_to_page = true;
            setup.fit_to_width = true;
            setup.margins = PageMargins {
                left: 0.5,
                ..PageMargins::default()
            };
        }

        let xml = write_worksheet(&ws);
        assert!(xml.contains("<col min=\"2\" max=\"3\" width=\"18.5\" customWidth=\"1\"/>"));
        assert!(xml.contains(
            "<pane xSplit=\"1\" ySplit=\"2\" topLeftCell=\"B3\" activePane=\"bottomRight\" state=\"frozen\"/>"
        ));
        assert!(xml.contains("<row r=\"7\" hidden=\"1\"/>"));

        let decoded = reread(&ws);
        assert_eq!(decoded.merged_ranges(), ws.merged_ranges());
        assert_eq!(decoded.frozen_panes(), ws.frozen_panes());
        assert_eq!(decoded.auto_filter(), ws.auto_filter());
        assert_eq!(decoded.row_properties(2), ws.row_properties(2));
        assert_eq!(decoded.row_properties(7), ws.row_properties(7));
        assert_eq!(decoded.column_properties(3), ws.column_properties(3));
        assert_eq!(decoded.column_properties(5), ws.column_properties(5));
        assert_eq!(decoded.page_setup(), ws.page_setup());
        assert_eq!(decoded.sheet_state(), SheetState::Visible);
    }

    #[test]
    fn test_pane_from_splits() {
        let xml = br#"<worksheet><sheetViews><sheetView workbookViewId="0">
            <pane ySplit="1" activePane="bottomLeft" state="frozen"/>
        </sheetView></sheetViews><sheetData/></worksheet>"#;
        let mut ws = sheet();
        read_worksheet(xml, &mut ws, &[]).unwrap();
        assert_eq!(ws.frozen_panes().to_string(), "A2");
    }

    fn read_err(xml: &[u8]) -> XlsxError {
        let mut ws = sheet();
        read_worksheet(xml, &mut ws, &[]).unwrap_err()
    }

    #[test]
    fn test_row_numbers_out_of_range() {
        let cases: [&[u8]; 4] = [
            br#"<worksheet><sheetData><row r="0"/></sheetData></worksheet>"#,
            br#"<worksheet><sheetData><row r="1048577"/></sheetData></worksheet>"#,
            br#"<worksheet><sheetData><row r="4294967295"/><row/></sheetData></worksheet>"#,
            br#"<worksheet><sheetData><row r="99999999999"/></sheetData></worksheet>"#,
        ];
        for xml in cases {
            assert!(matches!(read_err(xml), XlsxError::Parse(_)));
        }
    }

    #[test]
    fn test_row_without_reference_after_last_row() {
        let xml = br#"<worksheet><sheetData>
            <row r="1048576"><c><v>1</v></c></row>
            <row><c><v>2</v></c></row>
        </sheetData></worksheet>"#;
        assert!(matches!(read_err(xml), XlsxError::Parse(_)));
    }

    #[test]
    fn test_last_row_is_accepted() {
        let xml = br#"<worksheet><sheetData>
            <row r="1048576" ht="30" customHeight="1"><c><v>1</v></c></row>
        </sheetData></worksheet>"#;
        let mut ws = sheet();
        read_worksheet(xml, &mut ws, &[]).unwrap();
        assert_eq!(ws.row_height(MAX_ROW), 30.0);
        assert_eq!(ws.value("A1048576").unwrap(), &CellValue::Number(1.0));
    }

    #[test]
    fn test_oversized_pane_split() {
        let cases: [&[u8]; 3] = [
            br#"<worksheet><sheetViews><sheetView><pane xSplit="5000000000" state="frozen"/></sheetView></sheetViews></worksheet>"#,
            br#"<worksheet><sheetViews><sheetView><pane ySplit="1048576" state="frozen"/></sheetView></sheetViews></worksheet>"#,
            br#"<worksheet><sheetViews><sheetView><pane xSplit="18278" state="frozen"/></sheetView></sheetViews></worksheet>"#,
        ];
        for xml in cases {
            assert!(matches!(read_err(xml), XlsxError::Parse(_)));
        }
    }

    #[test]
    fn test_oversized_merge_is_rejected() {
        let xml = br#"<worksheet><sheetData/><mergeCells count="1">
            <mergeCell ref="A1:XFD1048576"/>
        </mergeCells></worksheet>"#;
        let mut ws = sheet();
        let err = read_worksheet(xml, &mut ws, &[]).unwrap_err();
        assert!(matches!(err, XlsxError::Core(tabula_core::Error::OutOfRange(_))));
        assert_eq!(ws.cell_count(), 0);
        assert!(ws.merged_ranges().is_empty());
    }

    #[test]
    fn test_element_order() {
        let mut ws = sheet();
        ws.set_value("A1", 1).unwrap();
        ws.merge_cells("A1:B1").unwrap();
        ws.set_auto_filter_str("A1:B5").unwrap();
        ws.column_properties_mut(1).width = Some(12.0);
        ws.page_setup_mut().fit_to_page = true;

        let xml = write_worksheet(&ws);
        let position = |tag: &str| xml.find(tag).unwrap();
        let order = [
            "<sheetPr>",
            "<dimension ",
            "<sheetViews>",
            "<sheetFormatPr ",
            "<cols>",
            "<sheetData>",
            "<autoFilter ",
            "<mergeCells ",
            "<pageMargins ",
            "<pageSetup",
        ];
        for pair in order.windows(2) {
            assert!(position(pair[0]) < position(pair[1]), "{} before {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_empty_sheet() {
        let xml = write_worksheet(&sheet());
        assert!(xml.contains("<dimension ref=\"A1\"/>"));
        assert!(xml.contains("<sheetData/>"));
        assert!(!xml.contains("<pageSetup"));
    }
}
