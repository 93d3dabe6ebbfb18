use regex::Regex;
use scraper::{Html, Selector};
use tracing::debug;

/// Compute the remaining page urls from the seed page's pagination control.
///
/// The control is a `div.item-list` whose `li.pager-last` link encodes the
/// last page number in its `page=` query parameter. `None` means no control
/// or no parseable page number: single page only, not an error.
///
/// Page 0 is the seed page and is fetched out of band, so the list starts at
/// page 1. The site serves the same listing for page 0 and page 1; that
/// overlap is reproduced as-is pending calibration against live output.
pub fn discover(first_page_html: &str, base_url: &str) -> Option<Vec<String>> {
    let doc = Html::parse_document(first_page_html);
    let control = Selector::parse("div.item-list").unwrap();
    let last_link = Selector::parse("li.pager-last a").unwrap();

    let href = doc
        .select(&control)
        .next()?
        .select(&last_link)
        .next()?
        .value()
        .attr("href")?;

    let re = Regex::new(r"page=(\d+)").unwrap();
    let last: u32 = re.captures(href)?.get(1)?.as_str().parse().ok()?;
    debug!(last, "pagination control found");

    Some((1..=last).map(|i| format!("{}?page={}", base_url, i)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://calorizator.ru/product/all";

    fn page_with_pager(href: &str) -> String {
        format!(
            r#"<html><body>
            <div class="view-content"><table><tbody></tbody></table></div>
            <div class="item-list"><ul class="pager">
              <li class="pager-current">1</li>
              <li class="pager-last last"><a href="{}" title="На последнюю страницу">последняя »</a></li>
            </ul></div>
            </body></html>"#,
            href
        )
    }

    #[test]
    fn last_page_link_yields_inclusive_range() {
        let html = page_with_pager("/product/all?page=3");
        let links = discover(&html, BASE).unwrap();
        assert_eq!(
            links,
            vec![
                format!("{}?page=1", BASE),
                format!("{}?page=2", BASE),
                format!("{}?page=3", BASE),
            ]
        );
    }

    #[test]
    fn page_param_found_among_other_params() {
        let html = page_with_pager("/product/all?sort=asc&page=7");
        let links = discover(&html, BASE).unwrap();
        assert_eq!(links.len(), 7);
        assert_eq!(links[6], format!("{}?page=7", BASE));
    }

    #[test]
    fn no_pagination_control_is_none() {
        let html = "<html><body><div class=\"view-content\"></div></body></html>";
        assert!(discover(html, BASE).is_none());
    }

    #[test]
    fn pager_without_page_param_is_none() {
        let html = page_with_pager("/product/all");
        assert!(discover(&html, BASE).is_none());
    }

    #[test]
    fn fixture_page_discovers_all_pages() {
        let html = std::fs::read_to_string("tests/fixtures/listing_page.html").unwrap();
        let links = discover(&html, BASE).unwrap();
        assert_eq!(links.len(), 4);
        assert_eq!(links[0], format!("{}?page=1", BASE));
    }
}
