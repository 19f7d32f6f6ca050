//! Restricted extraction expressions for user-declared fields
//!
//! Custom fields are declared as `name=expression` where the expression is a
//! small DOM query in jQuery-like syntax. Only a fixed set of accessors is
//! understood; nothing is ever executed.
//!
//! # Grammar
//!
//! ```text
//! expr     := "$(" quoted ")" accessor
//! accessor := ".text()" | ".html()" | ".length" | ".first().text()"
//!           | ".attr(" quoted ")"
//! quoted   := '"' chars '"' | "'" chars "'" | '`' chars '`'
//! ```

use crate::fields::{FieldError, FieldValue};
use scraper::{Html, Selector};

/// What to read from the elements matched by the selector
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Accessor {
    /// Text of every match, concatenated and trimmed
    Text,
    /// Text of the first match, trimmed
    FirstText,
    /// Inner HTML of the first match
    Html,
    /// Number of matches
    Length,
    /// Attribute of the first match
    Attr(String),
}

/// A parsed, validated extraction expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expr {
    selector: String,
    accessor: Accessor,
}

impl Expr {
    /// Parses an expression, validating the CSS selector up front
    pub fn parse(source: &str) -> Result<Self, FieldError> {
        let invalid = |reason: &str| FieldError::InvalidExpression {
            expression: source.to_string(),
            reason: reason.to_string(),
        };

        let mut cursor = Cursor::new(source.trim());
        if !cursor.eat("$(") {
            return Err(invalid("expected `$(`"));
        }
        let selector = cursor.quoted().ok_or_else(|| invalid("expected a quoted selector"))?;
        if !cursor.eat(")") {
            return Err(invalid("expected `)` after selector"));
        }

        let accessor = if cursor.eat(".text()") {
            Accessor::Text
        } else if cursor.eat(".first().text()") {
            Accessor::FirstText
        } else if cursor.eat(".html()") {
            Accessor::Html
        } else if cursor.eat(".length") {
            Accessor::Length
        } else if cursor.eat(".attr(") {
            let name = cursor
                .quoted()
                .ok_or_else(|| invalid("expected a quoted attribute name"))?;
            if !cursor.eat(")") {
                return Err(invalid("expected `)` after attribute name"));
            }
            Accessor::Attr(name)
        } else {
            return Err(invalid(
                "unsupported accessor, use .text(), .first().text(), .html(), .length or .attr(name)",
            ));
        };

        if !cursor.is_done() {
            return Err(invalid("unexpected trailing input"));
        }

        Selector::parse(&selector).map_err(|_| invalid("invalid CSS selector"))?;

        Ok(Self { selector, accessor })
    }

    pub fn selector(&self) -> &str {
        &self.selector
    }

    pub fn accessor(&self) -> &Accessor {
        &self.accessor
    }

    /// Evaluates the expression against a parsed document
    ///
    /// Returns `None` when nothing matched (or the attribute is missing).
    pub fn evaluate(&self, document: &Html) -> Option<FieldValue> {
        let selector = Selector::parse(&self.selector).ok()?;
        let mut matches = document.select(&selector);

        match &self.accessor {
            Accessor::Length => Some(FieldValue::from(matches.count())),
            Accessor::Text => {
                let mut any = false;
                let mut text = String::new();
                for element in matches {
                    any = true;
                    text.extend(element.text());
                }
                any.then(|| FieldValue::Text(text.trim().to_string()))
            }
            Accessor::FirstText => matches
                .next()
                .map(|element| FieldValue::Text(element.text().collect::<String>().trim().to_string())),
            Accessor::Html => matches
                .next()
                .map(|element| FieldValue::Text(element.inner_html())),
            Accessor::Attr(name) => matches
                .next()
                .and_then(|element| element.value().attr(name))
                .map(|value| FieldValue::Text(value.to_string())),
        }
    }
}

/// Minimal cursor over the expression source
struct Cursor<'a> {
    rest: &'a str,
}

impl<'a> Cursor<'a> {
    fn new(source: &'a str) -> Self {
        Self { rest: source }
    }

    fn eat(&mut self, token: &str) -> bool {
        let trimmed = self.rest.trim_start();
        match trimmed.strip_prefix(token) {
            Some(rest) => {
                self.rest = rest;
                true
            }
            None => false,
        }
    }

    fn quoted(&mut self) -> Option<String> {
        let trimmed = self.rest.trim_start();
        let quote = trimmed.chars().next().filter(|c| matches!(c, '"' | '\'' | '`'))?;
        let body = &trimmed[quote.len_utf8()..];
        let end = body.find(quote)?;
        self.rest = &body[end + quote.len_utf8()..];
        Some(body[..end].to_string())
    }

    fn is_done(&self) -> bool {
        self.rest.trim().is_empty()
    }
}
