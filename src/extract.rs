// src/extract.rs

use scraper::{ElementRef, Html, Selector};

use crate::error::ScrapeError;
use crate::table::Table;

/// Pull one table out of an HTML document by element id.
///
/// The source site injects a decorative spanner row above the real column
/// headers; the first row matching `header_row_selector` is dropped. Its
/// absence is fine (the site has removed it from some pages over the years),
/// but a missing table is [`ScrapeError::TableNotFound`].
///
/// The first remaining row names the columns; everything after it is data.
/// Rows whose cell count disagrees with the header are kept as-is so the
/// aggregation step can flag schema drift instead of this layer guessing.
pub fn extract(
    document: &str,
    table_id: &str,
    header_row_selector: &str,
) -> Result<Table, ScrapeError> {
    let doc = Html::parse_document(document);

    let table_sel = parse_selector(&format!(r#"table[id="{table_id}"]"#))?;
    let header_sel = parse_selector(header_row_selector)?;
    let row_sel = Selector::parse("tr").expect("tr selector should be valid");
    let cell_sel = Selector::parse("th, td").expect("cell selector should be valid");

    let table = doc
        .select(&table_sel)
        .next()
        .ok_or_else(|| ScrapeError::TableNotFound {
            table_id: table_id.to_string(),
        })?;

    // Exactly one decorative row is removed, matching what the source site
    // injects; further matches would be data we have no business dropping.
    let skip = table.select(&header_sel).next().map(|el| el.id());

    let mut rows = table.select(&row_sel).filter(|tr| Some(tr.id()) != skip);

    let columns = rows.next().map(|tr| cell_texts(&tr, &cell_sel)).unwrap_or_default();
    let mut out = Table::new(columns);
    for tr in rows {
        out.rows.push(cell_texts(&tr, &cell_sel));
    }

    Ok(out)
}

fn parse_selector(selector: &str) -> Result<Selector, ScrapeError> {
    Selector::parse(selector).map_err(|_| ScrapeError::InvalidSelector {
        selector: selector.to_string(),
    })
}

fn cell_texts(tr: &ElementRef, cell_sel: &Selector) -> Vec<String> {
    tr.select(cell_sel)
        .map(|cell| cell.text().collect::<String>().trim().to_string())
        .collect()
}
