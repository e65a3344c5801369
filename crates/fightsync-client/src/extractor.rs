//! Generic interpreter for [`ExtractionSchema`] over parsed HTML.

use fightsync_core::error::AppError;
use fightsync_core::models::Record;
use fightsync_core::schema::{
    ExtractionSchema, FieldDescriptor, FieldKind, Transform, collapse_whitespace,
};
use fightsync_core::traits::Extractor;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;

/// Schema extractor built on `scraper` CSS selectors and `regex`.
///
/// Field lookups are forgiving: a selector that matches nothing yields the
/// field's default (or `null`). Only a base selector with no match fails
/// the page.
#[derive(Debug, Clone, Default)]
pub struct CssExtractor;

impl CssExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Extractor for CssExtractor {
    fn extract(&self, html: &str, schema: &ExtractionSchema) -> Result<Vec<Record>, AppError> {
        let base = parse_selector(&schema.base_selector)?;
        let fields = compile(&schema.fields)?;

        let document = Html::parse_document(html);
        let roots: Vec<ElementRef<'_>> = document.select(&base).collect();
        if roots.is_empty() {
            return Err(AppError::ExtractionError(format!(
                "Base selector '{}' of schema {} matched nothing",
                schema.base_selector, schema.name
            )));
        }

        let records: Vec<Record> = roots
            .into_iter()
            .map(|root| extract_record(root, &fields))
            .collect();
        tracing::debug!(schema = %schema.name, records = records.len(), "Extracted records");
        Ok(records)
    }
}

struct CompiledField {
    name: String,
    selector: Option<Selector>,
    kind: CompiledKind,
    transform: Option<Transform>,
    default: Option<Value>,
}

enum CompiledKind {
    Text,
    Attribute(String),
    Regex(Regex, usize),
    NestedList(Vec<CompiledField>),
    Nested(Vec<CompiledField>),
}

fn parse_selector(css: &str) -> Result<Selector, AppError> {
    Selector::parse(css)
        .map_err(|e| AppError::SchemaError(format!("Invalid selector '{css}': {e}")))
}

fn compile(fields: &[FieldDescriptor]) -> Result<Vec<CompiledField>, AppError> {
    fields
        .iter()
        .map(|field| {
            let selector = field.selector.as_deref().map(parse_selector).transpose()?;
            let kind = match &field.kind {
                FieldKind::Text => CompiledKind::Text,
                FieldKind::Attribute { attribute } => CompiledKind::Attribute(attribute.clone()),
                FieldKind::Regex { pattern, group } => {
                    let re = Regex::new(pattern).map_err(|e| {
                        AppError::SchemaError(format!("Invalid pattern for {}: {e}", field.name))
                    })?;
                    CompiledKind::Regex(re, *group)
                }
                FieldKind::NestedList { fields } => CompiledKind::NestedList(compile(fields)?),
                FieldKind::Nested { fields } => CompiledKind::Nested(compile(fields)?),
            };
            Ok(CompiledField {
                name: field.name.clone(),
                selector,
                kind,
                transform: field.transform,
                default: field.default.clone(),
            })
        })
        .collect()
}

fn extract_record(scope: ElementRef<'_>, fields: &[CompiledField]) -> Record {
    let mut record = Record::new();
    for field in fields {
        record.insert(field.name.clone(), extract_field(scope, field));
    }
    record
}

fn extract_field(scope: ElementRef<'_>, field: &CompiledField) -> Value {
    let value = match &field.kind {
        CompiledKind::NestedList(sub) => {
            let items = all_matches(scope, field)
                .into_iter()
                .map(|el| Value::Object(extract_record(el, sub)))
                .collect();
            return Value::Array(items);
        }
        CompiledKind::Nested(sub) => {
            first_match(scope, field).map(|el| Value::Object(extract_record(el, sub)))
        }
        kind => first_match(scope, field)
            .and_then(|el| scalar(el, kind))
            .map(|s| match field.transform {
                Some(t) => t.apply(&s),
                None => s,
            })
            .filter(|s| !s.is_empty())
            .map(Value::String),
    };
    value
        .or_else(|| field.default.clone())
        .unwrap_or(Value::Null)
}

fn first_match<'a>(scope: ElementRef<'a>, field: &CompiledField) -> Option<ElementRef<'a>> {
    match &field.selector {
        Some(selector) => scope.select(selector).next(),
        None => Some(scope),
    }
}

fn all_matches<'a>(scope: ElementRef<'a>, field: &CompiledField) -> Vec<ElementRef<'a>> {
    match &field.selector {
        Some(selector) => scope.select(selector).collect(),
        None => vec![scope],
    }
}

fn scalar(el: ElementRef<'_>, kind: &CompiledKind) -> Option<String> {
    let raw = match kind {
        CompiledKind::Text => collapse_whitespace(&el.text().collect::<Vec<_>>().join(" ")),
        CompiledKind::Attribute(name) => el.value().attr(name)?.trim().to_string(),
        CompiledKind::Regex(re, group) => {
            let lines = text_lines(el);
            re.captures(&lines)?.get(*group)?.as_str().trim().to_string()
        }
        CompiledKind::NestedList(_) | CompiledKind::Nested(_) => return None,
    };
    (!raw.is_empty()).then_some(raw)
}

/// Text nodes under `el`, trimmed, blanks dropped, one per line.
fn text_lines(el: ElementRef<'_>) -> String {
    el.text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
