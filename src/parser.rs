use anyhow::{anyhow, bail, Result};
use scraper::{ElementRef, Html, Selector};
use tracing::warn;

use crate::record::Record;

/// Extract every product record from one listing page.
///
/// Knows both table layouts the site has used: the newer `table.views-table`
/// and the legacy `div.view-content` wrapper. A page matching neither yields
/// zero records. A malformed row is skipped with a warning; it never takes
/// the rest of the page down with it.
pub fn extract(html: &str) -> Vec<Record> {
    let doc = Html::parse_document(html);
    let new_layout = Selector::parse("table.views-table tbody").unwrap();
    let legacy_layout = Selector::parse("div.view-content tbody").unwrap();

    let Some(tbody) = doc
        .select(&new_layout)
        .next()
        .or_else(|| doc.select(&legacy_layout).next())
    else {
        return Vec::new();
    };

    let row_sel = Selector::parse("tr").unwrap();
    let mut records = Vec::new();
    for row in tbody.select(&row_sel) {
        match extract_row(&row) {
            Ok(record) => records.push(record),
            Err(e) => warn!("skipping row: {}", e),
        }
    }
    records
}

fn extract_row(row: &ElementRef) -> Result<Record> {
    let name = first_text(row, "td.views-field-title a")
        .ok_or_else(|| anyhow!("row has no product name cell"))?;
    if name.is_empty() {
        bail!("row has an empty product name");
    }

    // Blank or missing macro cells default to zero. A missing kcal cell is
    // the legacy layout's dropped column: absent, not zero.
    let protein = numeric_cell(row, "td.views-field-field-protein-value")?.unwrap_or(0.0);
    let fat = numeric_cell(row, "td.views-field-field-fat-value")?.unwrap_or(0.0);
    let carbohydrates =
        numeric_cell(row, "td.views-field-field-carbohydrate-value")?.unwrap_or(0.0);
    let kcal = numeric_cell(row, "td.views-field-field-kcal-value")?;

    Ok(Record {
        name,
        protein,
        fat,
        carbohydrates,
        kcal,
    })
}

/// First text node of the first element matching `selector`, trimmed.
/// `None` when no element matches at all.
fn first_text(el: &ElementRef, selector: &str) -> Option<String> {
    let sel = Selector::parse(selector).unwrap();
    el.select(&sel)
        .next()
        .map(|e| e.text().next().unwrap_or("").trim().to_string())
}

/// `None` = cell absent, `Some(0.0)` = cell blank, otherwise the parsed
/// value. Malformed text is a row-level error.
fn numeric_cell(row: &ElementRef, selector: &str) -> Result<Option<f64>> {
    match first_text(row, selector) {
        None => Ok(None),
        Some(text) if text.is_empty() => Ok(Some(0.0)),
        Some(text) => text
            .parse::<f64>()
            .map(Some)
            .map_err(|_| anyhow!("bad numeric cell {:?}", text)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(rows: &str) -> String {
        format!(
            "<html><body><table class=\"views-table\"><tbody>{}</tbody></table></body></html>",
            rows
        )
    }

    fn row(name: &str, protein: &str, fat: &str, carbs: &str, kcal: &str) -> String {
        format!(
            r#"<tr>
              <td class="views-field views-field-title"><a href="/product/x">{}</a></td>
              <td class="views-field views-field-field-protein-value">{}</td>
              <td class="views-field views-field-field-fat-value">{}</td>
              <td class="views-field views-field-field-carbohydrate-value">{}</td>
              <td class="views-field views-field-field-kcal-value">{}</td>
            </tr>"#,
            name, protein, fat, carbs, kcal
        )
    }

    #[test]
    fn blank_protein_defaults_to_zero() {
        let html = table(&row("Apple", "", "0.2", "10", "52"));
        let records = extract(&html);
        assert_eq!(records.len(), 1);
        assert_eq!(
            records[0],
            Record {
                name: "Apple".into(),
                protein: 0.0,
                fat: 0.2,
                carbohydrates: 10.0,
                kcal: Some(52.0),
            }
        );
    }

    #[test]
    fn all_blank_numeric_cells_are_zero() {
        let html = table(&row("Вода", "", "", "", ""));
        let records = extract(&html);
        assert_eq!(records[0].protein, 0.0);
        assert_eq!(records[0].fat, 0.0);
        assert_eq!(records[0].carbohydrates, 0.0);
        assert_eq!(records[0].kcal, Some(0.0));
    }

    #[test]
    fn legacy_layout_without_kcal_column() {
        let html = r#"<html><body><div class="view-content"><table><tbody><tr>
              <td class="views-field-title"><a href="/product/x">Сахар</a></td>
              <td class="views-field-field-protein-value">0</td>
              <td class="views-field-field-fat-value">0</td>
              <td class="views-field-field-carbohydrate-value">99.7</td>
            </tr></tbody></table></div></body></html>"#;
        let records = extract(html);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].carbohydrates, 99.7);
        assert_eq!(records[0].kcal, None);
    }

    #[test]
    fn neither_layout_yields_empty() {
        assert!(extract("<html><body><p>maintenance</p></body></html>").is_empty());
    }

    #[test]
    fn malformed_numeric_skips_only_that_row() {
        let rows = format!(
            "{}{}{}",
            row("Good", "1", "2", "3", "4"),
            row("Bad", "n/a", "2", "3", "4"),
            row("AlsoGood", "5", "6", "7", "8"),
        );
        let records = extract(&table(&rows));
        let names: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Good", "AlsoGood"]);
    }

    #[test]
    fn empty_name_row_is_skipped() {
        let rows = format!("{}{}", row("", "1", "2", "3", "4"), row("Ok", "1", "2", "3", "4"));
        let records = extract(&table(&rows));
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "Ok");
    }

    #[test]
    fn surrounding_whitespace_is_trimmed() {
        let html = table(&row("Каша", "\n  12.5  ", " 1 ", "2", " 330 "));
        let records = extract(&html);
        assert_eq!(records[0].protein, 12.5);
        assert_eq!(records[0].kcal, Some(330.0));
    }

    #[test]
    fn extraction_is_deterministic() {
        let html = std::fs::read_to_string("tests/fixtures/listing_page.html").unwrap();
        let first = extract(&html);
        let second = extract(&html);
        assert!(!first.is_empty());
        assert_eq!(first, second);
    }

    #[test]
    fn fixture_rows_in_document_order() {
        let html = std::fs::read_to_string("tests/fixtures/listing_page.html").unwrap();
        let names: Vec<String> = extract(&html).into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["Абрикос", "Авокадо", "Арбуз"]);
    }
}
