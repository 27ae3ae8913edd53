//! HTML shape of the consultation site.
//!
//! Parsing never fails: a missing table, pagination block or heading yields
//! empty values and the caller decides what an empty page means.
use std::collections::BTreeMap;

use consult_core::ListingPage;
use scraper::{ElementRef, Html, Selector};
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://www.internetconsultatie.nl";

/// Joins the blockquotes of one response.
pub const SECTION_SEPARATOR: &str = "\n###\n";

const UNAVAILABLE_MARKER: &str = "De website is tijdelijk niet beschikbaar";
const REPORT_ANCHOR_ID: &str = "mainContentPlaceHolder_consultatierapportDocumentDownloadLink_typeAnchor";
const RESPONSE_COUNT_PREFIX: &str = "Reacties op consultatie [";

/// Everything read from a single response page.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResponsePage {
    pub fields: BTreeMap<String, String>,
    pub inline_text: Option<String>,
    /// Absolute download urls, in page order.
    pub attachments: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsultationPage {
    /// The site answered with its maintenance page.
    Unavailable,
    Available { fields: BTreeMap<String, String> },
}

/// Result links and the page bound of a listing page.
pub fn parse_listing(html: &str, base: &Url) -> ListingPage {
    let doc = Html::parse_document(html);

    let item_ids = select(&doc, "div.result--list li")
        .into_iter()
        .filter_map(|li| first_in(li, "a"))
        .filter_map(|a| a.value().attr("href"))
        .filter_map(|href| base.join(href).ok())
        .map(String::from)
        .collect();

    let last_page = select(&doc, "div.pagination a[href]")
        .into_iter()
        .filter_map(|a| text_of(a).parse::<u32>().ok())
        .max();

    ListingPage {
        item_ids,
        last_page,
    }
}

pub fn parse_response(html: &str, base: &Url) -> ResponsePage {
    let doc = Html::parse_document(html);

    let quotes: Vec<String> = select(&doc, "blockquote").into_iter().map(text_of).collect();
    let inline_text = Some(quotes.join(SECTION_SEPARATOR)).filter(|t| !t.trim().is_empty());

    let attachments = select(&doc, "a.icon--download")
        .into_iter()
        .filter_map(|a| a.value().attr("href"))
        .filter_map(|href| base.join(href).ok())
        .map(String::from)
        .collect();

    ResponsePage {
        fields: data_overview(&doc),
        inline_text,
        attachments,
    }
}

/// Metadata of one consultation: the overview table plus `title`,
/// `nr_responses` (when advertised) and `report`.
pub fn parse_consultation(html: &str) -> ConsultationPage {
    if html.contains(UNAVAILABLE_MARKER) {
        return ConsultationPage::Unavailable;
    }
    let doc = Html::parse_document(html);
    let mut fields = data_overview(&doc);

    if let Some(h1) = select(&doc, "h1").into_iter().next() {
        fields.insert("title".to_string(), text_of(h1));
    }

    let sublabel_count = select(&doc, "span.reacties__sublabel")
        .into_iter()
        .next()
        .and_then(|span| text_of(span).split_whitespace().next().map(str::to_string))
        .filter(|token| token.chars().all(|c| c.is_ascii_digit()));
    if let Some(count) = sublabel_count.or_else(|| response_count_in(html)) {
        fields.insert("nr_responses".to_string(), count);
    }

    fields.insert(
        "report".to_string(),
        html.contains(REPORT_ANCHOR_ID).to_string(),
    );

    ConsultationPage::Available { fields }
}

/// First `Reacties op consultatie [N]` occurrence in the raw page.
fn response_count_in(html: &str) -> Option<String> {
    html.match_indices(RESPONSE_COUNT_PREFIX).find_map(|(start, _)| {
        let rest = &html[start + RESPONSE_COUNT_PREFIX.len()..];
        let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
        let closed = rest[digits.len()..].starts_with(']');
        (!digits.is_empty() && closed).then_some(digits)
    })
}

fn data_overview(doc: &Html) -> BTreeMap<String, String> {
    let Some(table) = select(doc, "table.table__data-overview").into_iter().next() else {
        return BTreeMap::new();
    };
    let Ok(rows) = Selector::parse("tr") else {
        return BTreeMap::new();
    };
    table
        .select(&rows)
        .filter_map(|row| {
            let key = first_in(row, "th").map(text_of).filter(|k| !k.is_empty())?;
            let value = first_in(row, "td").map(text_of).unwrap_or_default();
            Some((key, value))
        })
        .collect()
}

fn select<'a>(doc: &'a Html, css: &str) -> Vec<ElementRef<'a>> {
    match Selector::parse(css) {
        Ok(selector) => doc.select(&selector).collect(),
        Err(_) => Vec::new(),
    }
}

fn first_in<'a>(element: ElementRef<'a>, css: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse(css).ok()?;
    element.select(&selector).next()
}

fn text_of(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}
