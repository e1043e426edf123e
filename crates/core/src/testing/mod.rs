//! Testing utilities and mock implementations.
//!
//! This module provides a mock image origin so discovery, batch and
//! renaming flows can be exercised without network access.
//!
//! # Example
//!
//! ```rust,ignore
//! use photofinder_core::testing::{fixtures, MockOrigin};
//!
//! let origin = MockOrigin::new("https://origin.test/img");
//! origin.add_file("24369.jpg").await;
//!
//! let upload = fixtures::codes_csv(&["24369", "TEST123"]);
//! ```

mod mock_origin;

pub use mock_origin::MockOrigin;

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::archive::{ArchiveError, ZipBuilder};

    /// Placeholder image bytes, distinct per filename.
    pub fn image_bytes(filename: &str) -> Vec<u8> {
        let mut bytes = vec![0xFF, 0xD8, 0xFF, 0xE0];
        bytes.extend_from_slice(filename.as_bytes());
        bytes
    }

    /// A CSV export with a `CODICE` header followed by `codes`.
    pub fn codes_csv(codes: &[&str]) -> Vec<u8> {
        codes_csv_with_header("CODICE", codes)
    }

    pub fn codes_csv_with_header(header: &str, codes: &[&str]) -> Vec<u8> {
        let mut out = format!("{}\n", header);
        for code in codes {
            out.push_str(code);
            out.push('\n');
        }
        out.into_bytes()
    }

    /// A two-column mapping sheet: code, new name.
    pub fn mapping_csv(rows: &[(&str, &str)]) -> Vec<u8> {
        let mut out = String::from("Codice,Nome\n");
        for (code, name) in rows {
            out.push_str(&format!("{},{}\n", code, name));
        }
        out.into_bytes()
    }

    /// One cell of a generated workbook.
    #[derive(Debug, Clone, Copy)]
    pub enum Cell<'a> {
        Text(&'a str),
        Number(f64),
        Blank,
    }

    /// A minimal single-sheet `.xlsx` workbook holding `rows` from A1.
    ///
    /// Strings are written inline, so no shared strings part is needed.
    pub fn xlsx(rows: &[&[Cell<'_>]]) -> Result<Vec<u8>, ArchiveError> {
        let mut sheet = String::from(concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
            r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>"#,
        ));
        for (r, row) in rows.iter().enumerate() {
            sheet.push_str(&format!(r#"<row r="{}">"#, r + 1));
            for (c, cell) in row.iter().enumerate() {
                let reference = format!("{}{}", column_name(c), r + 1);
                match cell {
                    Cell::Text(text) => sheet.push_str(&format!(
                        r#"<c r="{}" t="inlineStr"><is><t xml:space="preserve">{}</t></is></c>"#,
                        reference,
                        escape_xml(text)
                    )),
                    Cell::Number(value) => {
                        sheet.push_str(&format!(r#"<c r="{}"><v>{}</v></c>"#, reference, value))
                    }
                    Cell::Blank => {}
                }
            }
            sheet.push_str("</row>");
        }
        sheet.push_str("</sheetData></worksheet>");

        let mut zip = ZipBuilder::new();
        let parts: [(&str, &str); 4] = [
            ("[Content_Types].xml", XLSX_CONTENT_TYPES),
            ("_rels/.rels", XLSX_ROOT_RELS),
            ("xl/workbook.xml", XLSX_WORKBOOK),
            ("xl/_rels/workbook.xml.rels", XLSX_WORKBOOK_RELS),
        ];
        for (name, content) in parts {
            zip.add(name, content.as_bytes())?;
        }
        zip.add("xl/worksheets/sheet1.xml", sheet.as_bytes())?;
        zip.finish()
    }

    fn column_name(index: usize) -> char {
        (b'A' + index as u8) as char
    }

    fn escape_xml(text: &str) -> String {
        text.replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('>', "&gt;")
    }

    const XLSX_CONTENT_TYPES: &str = concat!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
        r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#,
        r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#,
        r#"<Default Extension="xml" ContentType="application/xml"/>"#,
        r#"<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>"#,
        r#"<Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#,
        r#"</Types>"#,
    );

    const XLSX_ROOT_RELS: &str = concat!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
        r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
        r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>"#,
        r#"</Relationships>"#,
    );

    const XLSX_WORKBOOK: &str = concat!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
        r#"<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" "#,
        r#"xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">"#,
        r#"<sheets><sheet name="Foglio1" sheetId="1" r:id="rId1"/></sheets>"#,
        r#"</workbook>"#,
    );

    const XLSX_WORKBOOK_RELS: &str = concat!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
        r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
        r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>"#,
        r#"</Relationships>"#,
    );
}
