use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// A declarative extraction schema for one page type.
///
/// `base_selector` scopes the whole page: if it matches nothing the page
/// is treated as structurally broken. Each match yields one record built
/// from the top-level fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionSchema {
    pub name: String,
    #[serde(alias = "baseSelector")]
    pub base_selector: String,
    pub fields: Vec<FieldDescriptor>,
}

/// One named field of a schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    /// CSS selector relative to the current scope. Absent means the scope itself.
    #[serde(default)]
    pub selector: Option<String>,
    #[serde(flatten)]
    pub kind: FieldKind,
    #[serde(default)]
    pub transform: Option<Transform>,
    /// Value used when the field is absent on the page.
    #[serde(default)]
    pub default: Option<serde_json::Value>,
}

/// How a field's value is pulled out of the matched element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldKind {
    /// Text nodes joined, whitespace collapsed.
    Text,
    /// Value of an HTML attribute.
    Attribute { attribute: String },
    /// A capture group of a pattern run over the element's text nodes,
    /// each trimmed and joined with `\n`.
    Regex {
        pattern: String,
        #[serde(default = "default_group")]
        group: usize,
    },
    /// Sub-schema applied under every match, producing an ordered list.
    NestedList { fields: Vec<FieldDescriptor> },
    /// Sub-schema applied under the first match, producing one object.
    Nested { fields: Vec<FieldDescriptor> },
}

fn default_group() -> usize {
    1
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transform {
    Trim,
    Lowercase,
    Uppercase,
    CollapseWhitespace,
}

impl Transform {
    pub fn apply(self, value: &str) -> String {
        match self {
            Transform::Trim => value.trim().to_string(),
            Transform::Lowercase => value.to_lowercase(),
            Transform::Uppercase => value.to_uppercase(),
            Transform::CollapseWhitespace => collapse_whitespace(value),
        }
    }
}

/// Trim and squeeze every run of whitespace into a single space.
pub fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

impl ExtractionSchema {
    /// Parse a schema from JSON text and check its patterns compile.
    pub fn from_json(json: &str) -> Result<Self, AppError> {
        let schema: ExtractionSchema = serde_json::from_str(json)
            .map_err(|e| AppError::SchemaError(format!("Invalid schema JSON: {e}")))?;
        schema.validate()?;
        Ok(schema)
    }

    /// Reject empty names and regex patterns that do not compile.
    ///
    /// Selectors are checked by the extractor, which owns the CSS engine.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.name.trim().is_empty() {
            return Err(AppError::SchemaError("Schema name is empty".into()));
        }
        if self.base_selector.trim().is_empty() {
            return Err(AppError::SchemaError(format!(
                "Schema {} has an empty base_selector",
                self.name
            )));
        }
        validate_fields(&self.name, &self.fields)
    }
}

fn validate_fields(schema: &str, fields: &[FieldDescriptor]) -> Result<(), AppError> {
    for field in fields {
        match &field.kind {
            FieldKind::Regex { pattern, group } => {
                let re = regex::Regex::new(pattern).map_err(|e| {
                    AppError::SchemaError(format!(
                        "Invalid pattern for {schema}.{}: {e}",
                        field.name
                    ))
                })?;
                if *group >= re.captures_len() {
                    return Err(AppError::SchemaError(format!(
                        "Pattern for {schema}.{} has no capture group {group}",
                        field.name
                    )));
                }
            }
            FieldKind::NestedList { fields } | FieldKind::Nested { fields } => {
                if field.selector.is_none() {
                    return Err(AppError::SchemaError(format!(
                        "Nested field {schema}.{} needs a selector",
                        field.name
                    )));
                }
                validate_fields(schema, fields)?;
            }
            FieldKind::Text | FieldKind::Attribute { .. } => {}
        }
    }
    Ok(())
}

/// The page types fightsync knows how to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    EventListing,
    EventDetail,
    FighterDetail,
}

impl PageKind {
    pub fn schema_name(self) -> &'static str {
        match self {
            PageKind::EventListing => "event_listing",
            PageKind::EventDetail => "event_detail",
            PageKind::FighterDetail => "fighter_detail",
        }
    }
}

/// Resolves schema references (file paths or page-kind names) to loaded schemas.
pub struct SchemaResolver {
    schemas_dir: PathBuf,
}

impl SchemaResolver {
    pub fn new(schemas_dir: impl Into<PathBuf>) -> Self {
        Self {
            schemas_dir: schemas_dir.into(),
        }
    }

    /// Resolve a schema reference.
    ///
    /// Accepts a direct file path (`schemas/event_detail.json`) or a bare
    /// name looked up as `{schemas_dir}/{name}.json`.
    pub fn resolve(&self, schema_ref: &str) -> Result<ExtractionSchema, AppError> {
        let path = self.resolve_path(schema_ref)?;

        let raw = std::fs::read_to_string(&path).map_err(|e| {
            AppError::SchemaError(format!(
                "Failed to read schema file {}: {e}",
                path.display()
            ))
        })?;

        ExtractionSchema::from_json(&raw).map_err(|e| match e {
            AppError::SchemaError(msg) => {
                AppError::SchemaError(format!("{}: {msg}", path.display()))
            }
            other => other,
        })
    }

    pub fn resolve_kind(&self, kind: PageKind) -> Result<ExtractionSchema, AppError> {
        self.resolve(kind.schema_name())
    }

    fn resolve_path(&self, schema_ref: &str) -> Result<PathBuf, AppError> {
        let direct = PathBuf::from(schema_ref);
        if direct.is_file() {
            return Ok(direct);
        }

        let name = schema_ref.trim_end_matches(".json");
        if name.is_empty() || name.contains(['/', '\\']) {
            return Err(AppError::SchemaError(format!(
                "Schema not found: {schema_ref}"
            )));
        }

        let candidate = self.schemas_dir.join(format!("{name}.json"));
        if !candidate.is_file() {
            return Err(AppError::SchemaError(format!(
                "Schema file not found: {}",
                candidate.display()
            )));
        }
        Ok(candidate)
    }
}

/// The three schemas a sync run needs, loaded once up front.
#[derive(Debug, Clone)]
pub struct SchemaSet {
    pub listing: ExtractionSchema,
    pub event: ExtractionSchema,
    pub fighter: ExtractionSchema,
}

impl SchemaSet {
    pub fn load(schemas_dir: &Path) -> Result<Self, AppError> {
        let resolver = SchemaResolver::new(schemas_dir);
        Ok(Self {
            listing: resolver.resolve_kind(PageKind::EventListing)?,
            event: resolver.resolve_kind(PageKind::EventDetail)?,
            fighter: resolver.resolve_kind(PageKind::FighterDetail)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SAMPLE: &str = r##"{
        "name": "event_detail",
        "baseSelector": "body",
        "fields": [
            {"name": "title", "selector": "h2", "type": "text", "transform": "collapse_whitespace"},
            {"name": "img", "selector": "img.poster", "type": "attribute", "attribute": "src"},
            {"name": "venue", "selector": "#details", "type": "regex", "pattern": "Venue:\\n(.+)"},
            {"name": "bouts", "selector": "#card li", "type": "nested_list", "fields": [
                {"name": "left", "selector": ".left a", "type": "text", "default": "TBA"}
            ]}
        ]
    }"##;

    #[test]
    fn test_parse_descriptor_kinds() {
        let schema = ExtractionSchema::from_json(SAMPLE).unwrap();
        assert_eq!(schema.base_selector, "body");
        assert_eq!(schema.fields.len(), 4);
        assert_eq!(schema.fields[0].kind, FieldKind::Text);
        assert_eq!(schema.fields[0].transform, Some(Transform::CollapseWhitespace));
        assert_eq!(
            schema.fields[1].kind,
            FieldKind::Attribute {
                attribute: "src".into()
            }
        );
        assert!(matches!(
            schema.fields[2].kind,
            FieldKind::Regex { group: 1, .. }
        ));
        match &schema.fields[3].kind {
            FieldKind::NestedList { fields } => {
                assert_eq!(fields[0].default, Some(serde_json::json!("TBA")));
            }
            other => panic!("unexpected kind {other:?}"),
        }
    }

    #[test]
    fn test_invalid_regex_is_schema_error() {
        let json = r#"{"name": "x", "base_selector": "body", "fields": [
            {"name": "bad", "selector": "p", "type": "regex", "pattern": "(unclosed"}
        ]}"#;
        let err = ExtractionSchema::from_json(json).unwrap_err();
        assert!(matches!(err, AppError::SchemaError(_)));
    }

    #[test]
    fn test_missing_capture_group_is_schema_error() {
        let json = r#"{"name": "x", "base_selector": "body", "fields": [
            {"name": "bad", "selector": "p", "type": "regex", "pattern": "no groups", "group": 1}
        ]}"#;
        assert!(ExtractionSchema::from_json(json).is_err());
    }

    #[test]
    fn test_nested_without_selector_rejected() {
        let json = r#"{"name": "x", "base_selector": "body", "fields": [
            {"name": "rows", "type": "nested_list", "fields": []}
        ]}"#;
        assert!(ExtractionSchema::from_json(json).is_err());
    }

    #[test]
    fn test_transforms() {
        assert_eq!(Transform::Trim.apply("  a b  "), "a b");
        assert_eq!(Transform::Lowercase.apply("KO/TKO"), "ko/tko");
        assert_eq!(Transform::Uppercase.apply("win"), "WIN");
        assert_eq!(
            Transform::CollapseWhitespace.apply("  UFC \n\t 300  "),
            "UFC 300"
        );
    }

    #[test]
    fn test_resolve_direct_path() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("custom.json");
        std::fs::write(&file, SAMPLE).unwrap();

        let resolver = SchemaResolver::new("does-not-exist");
        let schema = resolver.resolve(file.to_str().unwrap()).unwrap();
        assert_eq!(schema.name, "event_detail");
    }

    #[test]
    fn test_resolve_by_page_kind() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("event_detail.json"), SAMPLE).unwrap();

        let resolver = SchemaResolver::new(tmp.path());
        let schema = resolver.resolve_kind(PageKind::EventDetail).unwrap();
        assert_eq!(schema.fields.len(), 4);
    }

    #[test]
    fn test_resolve_missing_schema() {
        let tmp = TempDir::new().unwrap();
        let resolver = SchemaResolver::new(tmp.path());
        let err = resolver.resolve("fighter_detail").unwrap_err();
        assert!(matches!(err, AppError::SchemaError(_)));
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_resolve_reports_path_on_bad_json() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("event_listing.json"), "{not json").unwrap();

        let resolver = SchemaResolver::new(tmp.path());
        let err = resolver.resolve("event_listing").unwrap_err();
        assert!(err.to_string().contains("event_listing.json"));
    }

    #[test]
    fn test_shipped_schemas_parse() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../schemas");
        let set = SchemaSet::load(&dir).unwrap();
        assert_eq!(set.listing.name, "event_listing");
        assert_eq!(set.event.name, "event_detail");
        assert_eq!(set.fighter.name, "fighter_detail");
    }
}
