//! Base page field extraction
//!
//! Computes the built-in `result.*` fields from a rendered page, then merges
//! in the values of the catalog's custom field expressions.

use crate::fields::{CustomField, FieldMap, FieldValue, CUSTOM_FIELD_PREFIX};
use crate::render::{ExtractError, RenderedPage};
use crate::url::{decode_url, second_level_domain};
use scraper::{ElementRef, Html, Selector};

fn selector(css: &str) -> Result<Selector, ExtractError> {
    Selector::parse(css).map_err(|_| ExtractError::Selector(css.to_string()))
}

fn count(document: &Html, css: &str) -> Result<usize, ExtractError> {
    Ok(document.select(&selector(css)?).count())
}

fn first<'a>(document: &'a Html, css: &str) -> Result<Option<ElementRef<'a>>, ExtractError> {
    Ok(document.select(&selector(css)?).next())
}

fn text_of(document: &Html, css: &str) -> Result<String, ExtractError> {
    Ok(document
        .select(&selector(css)?)
        .flat_map(|e| e.text())
        .collect::<String>()
        .trim()
        .to_string())
}

fn attr_of(document: &Html, css: &str, attr: &str) -> Result<Option<String>, ExtractError> {
    Ok(first(document, css)?.and_then(|e| e.value().attr(attr).map(str::to_string)))
}

fn count_attr(
    document: &Html,
    css: &str,
    attr: &str,
    pred: impl Fn(&str) -> bool,
) -> Result<usize, ExtractError> {
    Ok(document
        .select(&selector(css)?)
        .filter(|e| e.value().attr(attr).map(&pred).unwrap_or(false))
        .count())
}

fn result_key(name: &str) -> String {
    format!("{}{}", CUSTOM_FIELD_PREFIX, name)
}

/// Evaluates the base extraction contract plus custom fields for one page
///
/// Values that the page does not have (no canonical, no keywords, a custom
/// selector matching nothing) are left out of the map.
///
/// # Errors
///
/// * `ExtractError::NotHtml` - The response is not an HTML document
/// * `ExtractError::Selector` - A selector could not be compiled
pub fn evaluate_page(page: &RenderedPage, custom: &[CustomField]) -> Result<FieldMap, ExtractError> {
    if let Some(content_type) = &page.content_type {
        if !content_type.to_ascii_lowercase().contains("html") {
            return Err(ExtractError::NotHtml(content_type.clone()));
        }
    }

    let document = Html::parse_document(&page.html);
    let host = page.final_url.host_str().unwrap_or_default();
    let domain2level = second_level_domain(host);
    let mut fields = FieldMap::new();
    let mut put = |name: &str, value: FieldValue| {
        fields.insert(result_key(name), value);
    };

    put("request_time", FieldValue::from(page.request_time_ms as i64));
    put("title", FieldValue::Text(text_of(&document, "title")?));
    put("h1", FieldValue::Text(text_of(&document, "h1")?));
    for level in 1..=4 {
        let name = format!("h{}_count", level);
        put(&name, FieldValue::from(count(&document, &format!("h{}", level))?));
    }
    put(
        "canonical_count",
        FieldValue::from(count(&document, "link[rel='canonical']")?),
    );
    put(
        "google_amp",
        FieldValue::from(count(&document, "link[rel='amphtml']")?),
    );
    put("dom_size", FieldValue::from(count(&document, "*")?));

    let head_size = first(&document, "head")?.map(|e| e.inner_html().len()).unwrap_or(0);
    let (body_size, body_text) = match first(&document, "body")? {
        Some(body) => (body.inner_html().len(), body.text().collect::<String>().trim().len()),
        None => (0, 0),
    };
    put("head_size", FieldValue::from(head_size));
    put("body_size", FieldValue::from(body_size));
    put("html_size", FieldValue::from(head_size + body_size));
    let ratio = if body_size == 0 {
        0
    } else {
        (body_text as f64 / body_size as f64 * 100.0).round() as i64
    };
    put("text_ratio_percent", FieldValue::Integer(ratio));

    let is_outer = |value: &str| value.starts_with("http") && !value.contains(domain2level.as_str());
    put("images", FieldValue::from(count(&document, "img")?));
    put(
        "images_without_alt",
        FieldValue::from(count(&document, "img:not([alt])")?),
    );
    put(
        "images_alt_empty",
        FieldValue::from(count(&document, "img[alt='']")?),
    );
    put(
        "images_outer",
        FieldValue::from(count_attr(&document, "img[src]", "src", is_outer)?),
    );
    put(
        "links",
        FieldValue::from(count_attr(&document, "a[href]", "href", |href| {
            !href.starts_with("javascript") && !href.starts_with('#')
        })?),
    );
    put(
        "links_inner",
        FieldValue::from(count_attr(&document, "a[href]", "href", |href| {
            href.starts_with('/') || href.contains(domain2level.as_str())
        })?),
    );
    put(
        "links_outer",
        FieldValue::from(count_attr(&document, "a[href]", "href", is_outer)?),
    );

    let description = attr_of(&document, "meta[name='description']", "content")?
        .map(|d| d.lines().collect::<Vec<_>>().join(" "))
        .unwrap_or_default();
    put("description", FieldValue::Text(description));

    if let Some(keywords) = attr_of(&document, "meta[name='keywords']", "content")? {
        put("keywords", FieldValue::Text(keywords));
    }
    if let Some(og_title) = attr_of(&document, "meta[property='og:title']", "content")? {
        put("og_title", FieldValue::Text(og_title));
    }
    if let Some(og_image) = attr_of(&document, "meta[property='og:image']", "content")? {
        put("og_image", FieldValue::Text(og_image));
    }

    if let Some(canonical) = attr_of(&document, "link[rel='canonical']", "href")? {
        let absolute = decode_url(page.final_url.as_str());
        let relative = decode_url(&relative_url(page));
        let is_canonical = canonical == absolute || canonical == relative;
        put("is_canonical", FieldValue::Integer(is_canonical as i64));
        put("canonical", FieldValue::Text(canonical));
    }

    let mut schema_types: Vec<String> = Vec::new();
    for element in document.select(&selector("[itemtype]")?) {
        if let Some(item_type) = element.value().attr("itemtype") {
            let name = strip_schema_prefix(item_type);
            if !schema_types.iter().any(|t| t == name) {
                schema_types.push(name.to_string());
            }
        }
    }
    put("schema_types", FieldValue::Text(schema_types.join(", ")));

    for field in custom {
        if let Some(value) = field.expression.evaluate(&document) {
            fields.insert(field.id(), value);
        }
    }

    Ok(fields)
}

/// Page URL without scheme and host (`/path?query`)
fn relative_url(page: &RenderedPage) -> String {
    let url = &page.final_url;
    match url.query() {
        Some(query) => format!("{}?{}", url.path(), query),
        None => url.path().to_string(),
    }
}

fn strip_schema_prefix(item_type: &str) -> &str {
    for prefix in ["https://schema.org/", "http://schema.org/"] {
        if let Some(rest) = item_type.strip_prefix(prefix) {
            return rest;
        }
    }
    item_type
}
