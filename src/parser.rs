//! Parse schema document source into an [`Element`] tree using PEST.

use crate::document::Element;
use crate::error::ParseError;
use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser as PestParser;

#[derive(PestParser)]
#[grammar = "schema.pest"]
struct SchemaParser;

/// Parse document source and return its root element.
pub fn parse(source: &str) -> Result<Element, ParseError> {
    let pairs = SchemaParser::parse(Rule::document, source)
        .map_err(|e| ParseError::Syntax(e.to_string()))?;
    let document = pairs
        .into_iter()
        .next()
        .ok_or_else(|| ParseError::Syntax("empty document".to_string()))?;
    let root = document
        .into_inner()
        .find(|p| p.as_rule() == Rule::element)
        .ok_or_else(|| ParseError::Syntax("document has no root element".to_string()))?;
    build_element(root)
}

fn line_of(pair: &Pair<Rule>) -> usize {
    pair.as_span().start_pos().line_col().0
}

fn build_element(pair: Pair<Rule>) -> Result<Element, ParseError> {
    let mut element = Element {
        line: line_of(&pair),
        ..Element::default()
    };
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::tag_name => element.name = inner.as_str().to_string(),
            Rule::attribute => element.attributes.push(build_attribute(inner)?),
            Rule::element => element.children.push(build_element(inner)?),
            Rule::text => {
                let line = line_of(&inner);
                element.text.push_str(&unescape(inner.as_str(), line)?);
            }
            Rule::cdata => {
                let raw = inner.as_str();
                let body = raw
                    .strip_prefix("<![CDATA[")
                    .and_then(|s| s.strip_suffix("]]>"))
                    .unwrap_or_default();
                element.text.push_str(body);
            }
            Rule::end_name => {
                if inner.as_str() != element.name {
                    return Err(ParseError::MismatchedTag {
                        open: element.name,
                        close: inner.as_str().to_string(),
                        line: line_of(&inner),
                    });
                }
            }
            _ => {}
        }
    }
    Ok(element)
}

fn build_attribute(pair: Pair<Rule>) -> Result<(String, String), ParseError> {
    let line = line_of(&pair);
    let mut name = String::new();
    let mut value = String::new();
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::attr_name => name = inner.as_str().to_string(),
            Rule::dq_value | Rule::sq_value => value = unescape(inner.as_str(), line)?,
            _ => {}
        }
    }
    Ok((name, value))
}

/// Resolve the predefined entities and numeric character references.
fn unescape(raw: &str, line: usize) -> Result<String, ParseError> {
    if !raw.contains('&') {
        return Ok(raw.to_string());
    }
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp + 1..];
        let semi = after.find(';').ok_or_else(|| ParseError::UnknownEntity {
            entity: after.chars().take(8).collect(),
            line,
        })?;
        let entity = &after[..semi];
        out.push(resolve_entity(entity).ok_or_else(|| ParseError::UnknownEntity {
            entity: entity.to_string(),
            line,
        })?);
        rest = &after[semi + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

fn resolve_entity(entity: &str) -> Option<char> {
    match entity {
        "lt" => Some('<'),
        "gt" => Some('>'),
        "amp" => Some('&'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => {
            let code = if let Some(hex) = entity.strip_prefix("#x").or_else(|| entity.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok()?
            } else {
                entity.strip_prefix('#')?.parse().ok()?
            };
            char::from_u32(code)
        }
    }
}
