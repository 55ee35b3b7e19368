//! Minimal SpreadsheetML (`.xlsx`) writer and reader for the report model.
//!
//! Cells are written as inline strings, so the package needs no shared
//! string table. Row styles map to three cell formats: plain, header (bold,
//! grey fill) and flagged (rose fill). The reader understands exactly what
//! the writer produces plus the usual `<v>` value cells.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read, Seek, Write};
use std::path::Path;

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::{ReportError, ReportResult};
use crate::report::model::{Row, RowStyle, Sheet, Workbook};

const XML_DECL: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;
const NS_MAIN: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const NS_REL: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const NS_PKG_REL: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const CT_WORKSHEET: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml";

const WORKBOOK_PART: &str = "xl/workbook.xml";
const WORKBOOK_RELS_PART: &str = "xl/_rels/workbook.xml.rels";

/// Worksheet limits of the xlsx format (column XFD, row 1048576)
pub const MAX_COLUMNS: usize = 16_384;
pub const MAX_ROWS: usize = 1_048_576;

const STYLES_XML: &str = concat!(
    r#"<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">"#,
    r#"<fonts count="2">"#,
    r#"<font><sz val="11"/><name val="Calibri"/></font>"#,
    r#"<font><b/><sz val="11"/><name val="Calibri"/></font>"#,
    r#"</fonts>"#,
    r#"<fills count="4">"#,
    r#"<fill><patternFill patternType="none"/></fill>"#,
    r#"<fill><patternFill patternType="gray125"/></fill>"#,
    r#"<fill><patternFill patternType="solid"><fgColor rgb="FFD9D9D9"/><bgColor indexed="64"/></patternFill></fill>"#,
    r#"<fill><patternFill patternType="solid"><fgColor rgb="FFFFC7CE"/><bgColor indexed="64"/></patternFill></fill>"#,
    r#"</fills>"#,
    r#"<borders count="1"><border><left/><right/><top/><bottom/><diagonal/></border></borders>"#,
    r#"<cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs>"#,
    r#"<cellXfs count="3">"#,
    r#"<xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/>"#,
    r#"<xf numFmtId="0" fontId="1" fillId="2" borderId="0" xfId="0" applyFont="1" applyFill="1"/>"#,
    r#"<xf numFmtId="0" fontId="0" fillId="3" borderId="0" xfId="0" applyFill="1"/>"#,
    r#"</cellXfs>"#,
    r#"<cellStyles count="1"><cellStyle name="Normal" xfId="0" builtinId="0"/></cellStyles>"#,
    r#"</styleSheet>"#,
);

fn style_index(style: RowStyle) -> u8 {
    match style {
        RowStyle::Plain => 0,
        RowStyle::Header => 1,
        RowStyle::Flagged => 2,
    }
}

fn style_from_index(index: &str) -> RowStyle {
    match index {
        "1" => RowStyle::Header,
        "2" => RowStyle::Flagged,
        _ => RowStyle::Plain,
    }
}

// ============================================================================
// Writing
// ============================================================================

/// Serialize `workbook` as an xlsx package into `out`
pub fn write_xlsx<W: Write + Seek>(workbook: &Workbook, out: W) -> ReportResult<W> {
    let mut zip = ZipWriter::new(out);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    zip.start_file("[Content_Types].xml", options)?;
    zip.write_all(content_types_xml(workbook.sheets.len()).as_bytes())?;

    zip.start_file("_rels/.rels", options)?;
    zip.write_all(root_rels_xml().as_bytes())?;

    zip.start_file(WORKBOOK_PART, options)?;
    zip.write_all(workbook_xml(workbook).as_bytes())?;

    zip.start_file(WORKBOOK_RELS_PART, options)?;
    zip.write_all(workbook_rels_xml(workbook.sheets.len()).as_bytes())?;

    zip.start_file("xl/styles.xml", options)?;
    zip.write_all(XML_DECL.as_bytes())?;
    zip.write_all(STYLES_XML.as_bytes())?;

    for (i, sheet) in workbook.sheets.iter().enumerate() {
        zip.start_file(format!("xl/worksheets/sheet{}.xml", i + 1), options)?;
        zip.write_all(worksheet_xml(sheet).as_bytes())?;
    }

    Ok(zip.finish()?)
}

fn content_types_xml(sheet_count: usize) -> String {
    let mut xml = String::from(XML_DECL);
    xml.push_str(r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#);
    xml.push_str(r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#);
    xml.push_str(r#"<Default Extension="xml" ContentType="application/xml"/>"#);
    xml.push_str(r#"<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>"#);
    xml.push_str(r#"<Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/>"#);
    for i in 1..=sheet_count {
        xml.push_str(&format!(
            r#"<Override PartName="/xl/worksheets/sheet{}.xml" ContentType="{}"/>"#,
            i, CT_WORKSHEET
        ));
    }
    xml.push_str("</Types>");
    xml
}

fn root_rels_xml() -> String {
    format!(
        r#"{}<Relationships xmlns="{}"><Relationship Id="rId1" Type="{}/officeDocument" Target="xl/workbook.xml"/></Relationships>"#,
        XML_DECL, NS_PKG_REL, NS_REL
    )
}

fn workbook_xml(workbook: &Workbook) -> String {
    let mut xml = format!(
        r#"{}<workbook xmlns="{}" xmlns:r="{}"><sheets>"#,
        XML_DECL, NS_MAIN, NS_REL
    );
    for (i, sheet) in workbook.sheets.iter().enumerate() {
        xml.push_str(&format!(
            r#"<sheet name="{}" sheetId="{}" r:id="rId{}"/>"#,
            escape(&sheet_title(&sheet.name)),
            i + 1,
            i + 1
        ));
    }
    xml.push_str("</sheets></workbook>");
    xml
}

fn workbook_rels_xml(sheet_count: usize) -> String {
    let mut xml = format!(r#"{}<Relationships xmlns="{}">"#, XML_DECL, NS_PKG_REL);
    for i in 1..=sheet_count {
        xml.push_str(&format!(
            r#"<Relationship Id="rId{}" Type="{}/worksheet" Target="worksheets/sheet{}.xml"/>"#,
            i, NS_REL, i
        ));
    }
    xml.push_str(&format!(
        r#"<Relationship Id="rId{}" Type="{}/styles" Target="styles.xml"/>"#,
        sheet_count + 1,
        NS_REL
    ));
    xml.push_str("</Relationships>");
    xml
}

fn worksheet_xml(sheet: &Sheet) -> String {
    let mut xml = format!(r#"{}<worksheet xmlns="{}">"#, XML_DECL, NS_MAIN);

    if !sheet.column_widths.is_empty() {
        xml.push_str("<cols>");
        for (i, width) in sheet.column_widths.iter().enumerate() {
            xml.push_str(&format!(
                r#"<col min="{0}" max="{0}" width="{1}" customWidth="1"/>"#,
                i + 1,
                width
            ));
        }
        xml.push_str("</cols>");
    }

    xml.push_str("<sheetData>");
    for (r, row) in sheet.rows.iter().enumerate() {
        let row_number = r + 1;
        if row.cells.is_empty() {
            xml.push_str(&format!(r#"<row r="{}"/>"#, row_number));
            continue;
        }
        xml.push_str(&format!(r#"<row r="{}">"#, row_number));
        let style = style_index(row.style);
        for (c, value) in row.cells.iter().enumerate() {
            let reference = format!("{}{}", column_name(c), row_number);
            match (value.is_empty(), style) {
                (true, 0) => {}
                (true, s) => xml.push_str(&format!(r#"<c r="{}" s="{}"/>"#, reference, s)),
                (false, s) => {
                    xml.push_str(&format!(r#"<c r="{}""#, reference));
                    if s != 0 {
                        xml.push_str(&format!(r#" s="{}""#, s));
                    }
                    xml.push_str(&format!(
                        r#" t="inlineStr"><is><t xml:space="preserve">{}</t></is></c>"#,
                        escape(value)
                    ));
                }
            }
        }
        xml.push_str("</row>");
    }
    xml.push_str("</sheetData></worksheet>");
    xml
}

/// Spreadsheet column letters for a zero-based index (0 -> A, 26 -> AA)
pub fn column_name(index: usize) -> String {
    let mut n = index + 1;
    let mut name = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        name.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    name.reverse();
    String::from_utf8(name).unwrap_or_default()
}

/// Zero-based column index from a cell reference such as `AB12`.
///
/// `None` when the reference has no letters or lies past [`MAX_COLUMNS`].
fn column_index(reference: &str) -> Option<usize> {
    let mut n = 0usize;
    let mut letters = 0;
    for c in reference.bytes().take_while(u8::is_ascii_alphabetic) {
        let digit = (c.to_ascii_uppercase() - b'A' + 1) as usize;
        n = n.checked_mul(26)?.checked_add(digit)?;
        if n > MAX_COLUMNS {
            return None;
        }
        letters += 1;
    }
    if letters == 0 { None } else { Some(n - 1) }
}

/// Sheet titles are limited to 31 characters and may not contain `[]:*?/\`
fn sheet_title(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '[' | ']' | ':' | '*' | '?' | '/' | '\\' => '_',
            _ => c,
        })
        .take(31)
        .collect()
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            // control characters other than tab/newline are not allowed in XML 1.0
            c if (c as u32) < 0x20 && !matches!(c, '\t' | '\n' | '\r') => {}
            c => out.push(c),
        }
    }
    out
}

// ============================================================================
// Reading
// ============================================================================

/// Reopen a report written by [`write_xlsx`]
pub fn read_workbook(path: &Path) -> ReportResult<Workbook> {
    let file = File::open(path)?;
    read_xlsx(BufReader::new(file))
}

/// Parse an xlsx package from any seekable reader
pub fn read_xlsx<R: Read + Seek>(reader: R) -> ReportResult<Workbook> {
    let mut archive = ZipArchive::new(reader)?;

    let workbook_xml = read_part(&mut archive, WORKBOOK_PART)?;
    let rels_xml = read_part(&mut archive, WORKBOOK_RELS_PART)?;

    let targets: HashMap<String, String> = tags(&rels_xml, "Relationship")
        .filter_map(|tag| Some((attr(tag, "Id")?, attr(tag, "Target")?)))
        .collect();

    let mut sheets = Vec::new();
    for tag in tags(&workbook_xml, "sheet") {
        let name = attr(tag, "name")
            .ok_or_else(|| ReportError::InvalidReport("sheet without a name".to_string()))?;
        let rel_id = attr(tag, "r:id")
            .ok_or_else(|| ReportError::InvalidReport(format!("sheet '{}' has no r:id", name)))?;
        let target = targets.get(&rel_id).ok_or_else(|| {
            ReportError::InvalidReport(format!("no relationship '{}' for sheet '{}'", rel_id, name))
        })?;
        let part = match target.strip_prefix('/') {
            Some(absolute) => absolute.to_string(),
            None => format!("xl/{}", target),
        };
        let xml = read_part(&mut archive, &part)?;
        let rows = parse_rows(&xml)
            .map_err(|e| ReportError::InvalidReport(format!("sheet '{}': {}", name, e)))?;
        sheets.push(Sheet {
            name,
            rows,
            column_widths: Vec::new(),
        });
    }

    if sheets.is_empty() {
        return Err(ReportError::InvalidReport("workbook has no sheets".to_string()));
    }
    Ok(Workbook { sheets })
}

fn read_part<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> ReportResult<String> {
    let mut part = archive
        .by_name(name)
        .map_err(|e| ReportError::InvalidReport(format!("missing part {}: {}", name, e)))?;
    let mut xml = String::new();
    part.read_to_string(&mut xml)?;
    Ok(xml)
}

/// Inner text of every start tag named `name` (attributes only)
fn tags<'a>(xml: &'a str, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
    let open = format!("<{} ", name);
    let mut pos = 0;
    std::iter::from_fn(move || {
        let start = pos + xml[pos..].find(&open)?;
        let end = start + xml[start..].find('>')?;
        pos = end + 1;
        Some(xml[start + 1..end].trim_end_matches('/'))
    })
}

/// Unescaped value of attribute `name` inside a start tag
fn attr(tag: &str, name: &str) -> Option<String> {
    let needle = format!(" {}=\"", name);
    let start = tag.find(&needle)? + needle.len();
    let len = tag[start..].find('"')?;
    Some(unescape(&tag[start..start + len]))
}

fn parse_rows(xml: &str) -> Result<Vec<Row>, String> {
    let mut rows: Vec<Row> = Vec::new();
    let mut pos = 0;

    while let Some(found) = xml[pos..].find("<row") {
        let start = pos + found;
        let Some(tag_len) = xml[start..].find('>') else { break };
        let tag_end = start + tag_len;
        let tag = &xml[start + 1..tag_end];
        let number = match attr(tag, "r") {
            Some(r) => r
                .parse::<usize>()
                .ok()
                .filter(|n| (1..=MAX_ROWS).contains(n))
                .ok_or_else(|| format!("row reference '{}' out of range", r))?,
            None => rows.len() + 1,
        };
        if number > MAX_ROWS {
            return Err(format!("more than {} rows", MAX_ROWS));
        }
        while rows.len() + 1 < number {
            rows.push(Row::blank());
        }

        if tag.ends_with('/') {
            rows.push(Row::blank());
            pos = tag_end + 1;
            continue;
        }
        let Some(close) = xml[tag_end..].find("</row>") else { break };
        let inner = &xml[tag_end + 1..tag_end + close];
        rows.push(parse_cells(inner)?);
        pos = tag_end + close + "</row>".len();
    }
    Ok(rows)
}

fn parse_cells(inner: &str) -> Result<Row, String> {
    let mut row = Row::blank();
    let mut pos = 0;

    while let Some(found) = inner[pos..].find("<c ") {
        let start = pos + found;
        let Some(tag_len) = inner[start..].find('>') else { break };
        let tag_end = start + tag_len;
        let tag = &inner[start + 1..tag_end];

        let column = match attr(tag, "r") {
            Some(r) => column_index(&r)
                .ok_or_else(|| format!("cell reference '{}' out of range", r))?,
            None => row.cells.len(),
        };
        if column >= MAX_COLUMNS {
            return Err(format!("more than {} columns", MAX_COLUMNS));
        }
        if let Some(s) = attr(tag, "s") {
            let style = style_from_index(&s);
            if style != RowStyle::Plain {
                row.style = style;
            }
        }

        let value = if tag.ends_with('/') {
            pos = tag_end + 1;
            String::new()
        } else {
            let Some(close) = inner[tag_end..].find("</c>") else { break };
            let body = &inner[tag_end + 1..tag_end + close];
            pos = tag_end + close + "</c>".len();
            cell_text(body)
        };

        if row.cells.len() <= column {
            row.cells.resize(column + 1, String::new());
        }
        row.cells[column] = value;
    }
    Ok(row)
}

fn cell_text(body: &str) -> String {
    for open in ["<t", "<v"] {
        let Some(start) = body.find(open) else { continue };
        let Some(tag_len) = body[start..].find('>') else { continue };
        let tag_end = start + tag_len;
        if body[..tag_end].ends_with('/') {
            return String::new();
        }
        let close = if open == "<t" { "</t>" } else { "</v>" };
        if let Some(end) = body[tag_end..].find(close) {
            return unescape(&body[tag_end + 1..tag_end + end]);
        }
    }
    String::new()
}

fn unescape(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let Some(semi) = tail.find(';') else {
            out.push_str(tail);
            return out;
        };
        let entity = &tail[1..semi];
        let decoded = match entity {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            _ => entity
                .strip_prefix("#x")
                .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                .or_else(|| entity.strip_prefix('#').and_then(|dec| dec.parse().ok()))
                .and_then(char::from_u32),
        };
        match decoded {
            Some(c) => out.push(c),
            None => out.push_str(&tail[..=semi]),
        }
        rest = &tail[semi + 1..];
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    fn sample() -> Workbook {
        let mut results = Sheet::new("Results").widths(&[20.0, 20.0, 20.0]);
        results.push(Row::new(["Scenario", "Step", "Status"]).styled(RowStyle::Header));
        results.push(Row::new(["S", "Open <home> & \"play\"", "PASSED"]));
        results.push(Row::new(["S", "", "FAILED"]).styled(RowStyle::Flagged));
        let mut notes = Sheet::new("Analysis");
        notes.push(Row::new(["line one\nline two"]));
        notes.push(Row::blank());
        notes.push(Row::new(["after blank"]));
        Workbook { sheets: vec![results, notes] }
    }

    #[test]
    fn test_column_names() {
        assert_eq!(column_name(0), "A");
        assert_eq!(column_name(8), "I");
        assert_eq!(column_name(25), "Z");
        assert_eq!(column_name(26), "AA");
        assert_eq!(column_name(701), "ZZ");
        assert_eq!(column_index("AA12"), Some(26));
        assert_eq!(column_index("i3"), Some(8));
    }

    #[test]
    fn test_write_then_read_preserves_cells_and_styles() {
        let workbook = sample();
        let bytes = write_xlsx(&workbook, Cursor::new(Vec::new())).unwrap().into_inner();
        let read = read_xlsx(Cursor::new(bytes)).unwrap();

        assert_eq!(read.sheet_names(), vec!["Results", "Analysis"]);
        let results = read.sheet("Results").unwrap();
        assert_eq!(results.rows, workbook.sheets[0].rows);
        let analysis = read.sheet("Analysis").unwrap();
        assert_eq!(analysis.rows, workbook.sheets[1].rows);
    }

    #[test]
    fn test_escape_strips_control_characters() {
        assert_eq!(escape("a\u{1}b\tc"), "ab\tc");
        assert_eq!(unescape("&lt;x&gt; &amp;&#65;&#x42; &bogus;"), "<x> &AB &bogus;");
    }

    #[test]
    fn test_read_rejects_foreign_zip() {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        zip.start_file("hello.txt", SimpleFileOptions::default()).unwrap();
        zip.write_all(b"hi").unwrap();
        let bytes = zip.finish().unwrap().into_inner();
        assert!(matches!(
            read_xlsx(Cursor::new(bytes)),
            Err(ReportError::InvalidReport(_))
        ));
    }

    fn package_with_sheet(sheet_data: &str) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();
        zip.start_file(WORKBOOK_PART, options).unwrap();
        zip.write_all(workbook_xml(&Workbook { sheets: vec![Sheet::new("Results")] }).as_bytes())
            .unwrap();
        zip.start_file(WORKBOOK_RELS_PART, options).unwrap();
        zip.write_all(workbook_rels_xml(1).as_bytes()).unwrap();
        zip.start_file("xl/worksheets/sheet1.xml", options).unwrap();
        let xml = format!(r#"<worksheet xmlns="{}"><sheetData>{}</sheetData></worksheet>"#, NS_MAIN, sheet_data);
        zip.write_all(xml.as_bytes()).unwrap();
        zip.finish().unwrap().into_inner()
    }

    #[test]
    fn test_column_index_bounded() {
        assert_eq!(column_index("XFD1"), Some(MAX_COLUMNS - 1));
        assert_eq!(column_index("XFE1"), None);
        assert_eq!(column_index("ZZZZZZZZZZZZZZZZ1"), None);
        assert_eq!(column_index("12"), None);
    }

    #[test]
    fn test_value_cells_are_read() {
        let bytes = package_with_sheet(r#"<row r="2"><c r="B2"><v>42</v></c></row>"#);
        let read = read_xlsx(Cursor::new(bytes)).unwrap();
        let rows = &read.sheets[0].rows;
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].cells, vec!["", "42"]);
    }

    #[test]
    fn test_huge_row_reference_rejected() {
        let bytes = package_with_sheet(r#"<row r="4000000000"><c r="A4000000000"><v>1</v></c></row>"#);
        assert!(matches!(
            read_xlsx(Cursor::new(bytes)),
            Err(ReportError::InvalidReport(_))
        ));

        let bytes = package_with_sheet(r#"<row r="0"/>"#);
        assert!(read_xlsx(Cursor::new(bytes)).is_err());
    }

    #[test]
    fn test_huge_column_reference_rejected() {
        let bytes = package_with_sheet(r#"<row r="1"><c r="ZZZZZZZZZZZZZZZZ1"><v>1</v></c></row>"#);
        assert!(matches!(
            read_xlsx(Cursor::new(bytes)),
            Err(ReportError::InvalidReport(_))
        ));
    }

    #[test]
    fn test_sheet_title_sanitized() {
        assert_eq!(sheet_title("a/b:c"), "a_b_c");
        assert_eq!(sheet_title(&"x".repeat(40)).len(), 31);
    }
}
