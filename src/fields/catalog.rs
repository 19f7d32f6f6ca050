use crate::fields::presets::{self, AUDIT_FULL_PRESET, DEFAULT_PRESET};
use crate::fields::{Expr, FieldError};
use std::collections::HashSet;

/// Namespace prefix for user-declared custom fields
pub const CUSTOM_FIELD_PREFIX: &str = "result.";

/// A user-declared field: a name plus the expression producing its value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomField {
    pub name: String,
    pub expression: Expr,
}

impl CustomField {
    /// Parses a `name=expression` declaration
    pub fn from_declaration(declaration: &str) -> Result<Self, FieldError> {
        let (name, expression) = declaration
            .split_once('=')
            .ok_or_else(|| FieldError::InvalidDeclaration(declaration.to_string()))?;
        Self::new(name, expression)
    }

    pub fn new(name: &str, expression: &str) -> Result<Self, FieldError> {
        let name = name.trim();
        if name.is_empty() || name.contains('.') || name.contains(char::is_whitespace) {
            return Err(FieldError::InvalidFieldName(name.to_string()));
        }
        Ok(Self {
            name: name.to_string(),
            expression: Expr::parse(expression)?,
        })
    }

    /// Full field identifier, e.g. `result.section`
    pub fn id(&self) -> String {
        format!("{}{}", CUSTOM_FIELD_PREFIX, self.name)
    }
}

/// The resolved, ordered set of fields collected for a session
///
/// Built once by [`FieldCatalogBuilder`] and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldCatalog {
    preset: String,
    requested_preset: String,
    fields: Vec<String>,
    custom: Vec<CustomField>,
}

impl FieldCatalog {
    /// Name of the preset actually used
    pub fn preset(&self) -> &str {
        &self.preset
    }

    /// Returns the requested preset name if it was replaced by the default
    pub fn substituted_preset(&self) -> Option<&str> {
        (self.preset != self.requested_preset).then_some(self.requested_preset.as_str())
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn custom_fields(&self) -> &[CustomField] {
        &self.custom
    }

    pub fn contains(&self, id: &str) -> bool {
        self.fields.iter().any(|f| f == id)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Terminal segment of a dotted identifier (`lighthouse.scores.seo` -> `seo`)
pub fn terminal_name(id: &str) -> &str {
    id.rsplit('.').next().unwrap_or(id)
}

/// Builds a [`FieldCatalog`] from a preset, exclusions, custom fields and the
/// audit flag
///
/// # Resolution order
///
/// 1. Start from the preset's ordered list (unknown presets are replaced by
///    the default preset with a warning)
/// 2. Remove fields whose terminal name is excluded
/// 3. Append custom fields (`result.<name>`) not already present
/// 4. Append every field of the full audit preset not already present and not
///    excluded, when auditing is enabled
///
/// # Example
///
/// ```
/// use site_audit::fields::FieldCatalogBuilder;
///
/// let catalog = FieldCatalogBuilder::new("minimal")
///     .exclude(["request_time"])
///     .build()
///     .unwrap();
/// assert!(!catalog.contains("result.request_time"));
/// assert!(catalog.contains("result.title"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct FieldCatalogBuilder {
    preset: String,
    excluded: Vec<String>,
    custom: Vec<CustomField>,
    audit: bool,
}

impl FieldCatalogBuilder {
    pub fn new(preset: impl Into<String>) -> Self {
        Self {
            preset: preset.into(),
            ..Default::default()
        }
    }

    pub fn exclude<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn custom_field(mut self, field: CustomField) -> Self {
        self.custom.push(field);
        self
    }

    pub fn custom_fields(mut self, fields: impl IntoIterator<Item = CustomField>) -> Self {
        self.custom.extend(fields);
        self
    }

    pub fn audit(mut self, enabled: bool) -> Self {
        self.audit = enabled;
        self
    }

    pub fn build(self) -> Result<FieldCatalog, FieldError> {
        let (preset, base) = match presets::lookup(&self.preset) {
            Ok(fields) => (self.preset.clone(), fields),
            Err(e) => {
                tracing::warn!("{}, using the '{}' preset instead", e, DEFAULT_PRESET);
                (DEFAULT_PRESET.to_string(), presets::lookup(DEFAULT_PRESET)?)
            }
        };

        let excluded: HashSet<&str> = self.excluded.iter().map(|s| s.trim()).collect();
        let mut seen = HashSet::new();
        let mut fields = Vec::new();

        let mut push = |id: String, fields: &mut Vec<String>| {
            if seen.insert(id.clone()) {
                fields.push(id);
            }
        };

        for id in base {
            if !excluded.contains(terminal_name(id)) {
                push(id.to_string(), &mut fields);
            }
        }

        let mut custom: Vec<CustomField> = Vec::new();
        for field in self.custom {
            if custom.iter().any(|c| c.name == field.name) {
                continue;
            }
            push(field.id(), &mut fields);
            custom.push(field);
        }

        if self.audit {
            for id in presets::lookup(AUDIT_FULL_PRESET)? {
                if !excluded.contains(terminal_name(id)) {
                    push(id.to_string(), &mut fields);
                }
            }
        }

        Ok(FieldCatalog {
            preset,
            requested_preset: self.preset,
            fields,
            custom,
        })
    }
}

/// Resolves the field catalog for a session
///
/// Convenience wrapper around [`FieldCatalogBuilder`].
pub fn resolve(
    preset: &str,
    excluded: &[String],
    custom: &[CustomField],
    audit_enabled: bool,
) -> Result<FieldCatalog, FieldError> {
    FieldCatalogBuilder::new(preset)
        .exclude(excluded.iter().cloned())
        .custom_fields(custom.iter().cloned())
        .audit(audit_enabled)
        .build()
}
