//! Attribute schemas of resource types and data sources
//!
//! A schema types every attribute and flags it required, optional, computed,
//! force_new or sensitive. Declarations are validated against it before any
//! API call, and it decides which changes need a replacement.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use crate::resource::Value;

/// Validation function attached to a custom attribute type
#[derive(Clone)]
pub struct Validator(Arc<dyn Fn(&Value) -> Result<(), String> + Send + Sync>);

impl Validator {
    pub fn new(f: impl Fn(&Value) -> Result<(), String> + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub fn check(&self, value: &Value) -> Result<(), String> {
        (self.0)(value)
    }
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Validator")
    }
}

/// Attribute type
#[derive(Debug, Clone)]
pub enum AttributeType {
    /// String
    String,
    /// Integer
    Int,
    /// Floating point number (integers are accepted)
    Float,
    /// Boolean
    Bool,
    /// Enum (list of allowed values)
    Enum(Vec<String>),
    /// Custom type (with validation function)
    Custom {
        name: String,
        base: Box<AttributeType>,
        validate: Validator,
    },
    /// List
    List(Box<AttributeType>),
    /// Map
    Map(Box<AttributeType>),
}

impl AttributeType {
    /// Check if a value conforms to this type
    pub fn validate(&self, value: &Value) -> Result<(), TypeError> {
        match (self, value) {
            (AttributeType::String, Value::String(_)) => Ok(()),
            (AttributeType::Int, Value::Int(_)) => Ok(()),
            (AttributeType::Float, Value::Float(_) | Value::Int(_)) => Ok(()),
            (AttributeType::Bool, Value::Bool(_)) => Ok(()),

            (AttributeType::Enum(variants), Value::String(s)) => {
                if variants.iter().any(|v| v == s) {
                    Ok(())
                } else {
                    Err(TypeError::InvalidEnumVariant {
                        value: s.clone(),
                        expected: variants.clone(),
                    })
                }
            }

            (AttributeType::Custom { base, validate, .. }, v) => {
                base.validate(v)?;
                validate
                    .check(v)
                    .map_err(|msg| TypeError::ValidationFailed { message: msg })
            }

            (AttributeType::List(inner), Value::List(items)) => {
                for (i, item) in items.iter().enumerate() {
                    inner.validate(item).map_err(|e| TypeError::ListItemError {
                        index: i,
                        inner: Box::new(e),
                    })?;
                }
                Ok(())
            }

            (AttributeType::Map(inner), Value::Map(map)) => {
                for (k, v) in map {
                    inner.validate(v).map_err(|e| TypeError::MapValueError {
                        key: k.clone(),
                        inner: Box::new(e),
                    })?;
                }
                Ok(())
            }

            _ => Err(TypeError::TypeMismatch {
                expected: self.type_name(),
                got: value.type_name().to_string(),
            }),
        }
    }

    fn type_name(&self) -> String {
        match self {
            AttributeType::String => "String".to_string(),
            AttributeType::Int => "Int".to_string(),
            AttributeType::Float => "Float".to_string(),
            AttributeType::Bool => "Bool".to_string(),
            AttributeType::Enum(variants) => format!("Enum({})", variants.join(" | ")),
            AttributeType::Custom { name, .. } => name.clone(),
            AttributeType::List(inner) => format!("List<{}>", inner.type_name()),
            AttributeType::Map(inner) => format!("Map<{}>", inner.type_name()),
        }
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.type_name())
    }
}

/// Type error
#[derive(Debug, Clone, thiserror::Error)]
pub enum TypeError {
    #[error("Type mismatch: expected {expected}, got {got}")]
    TypeMismatch { expected: String, got: String },

    #[error("Invalid enum variant '{value}', expected one of: {}", expected.join(", "))]
    InvalidEnumVariant {
        value: String,
        expected: Vec<String>,
    },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    #[error("Required attribute '{name}' is missing")]
    MissingRequired { name: String },

    #[error("Attribute '{name}' is computed and cannot be set")]
    ComputedOnly { name: String },

    #[error("Attribute '{name}': {inner}")]
    InvalidAttribute { name: String, inner: Box<TypeError> },

    #[error("List item at index {index}: {inner}")]
    ListItemError { index: usize, inner: Box<TypeError> },

    #[error("Map value for key '{key}': {inner}")]
    MapValueError { key: String, inner: Box<TypeError> },
}

/// Attribute schema
///
/// A fresh attribute is optional. `required()` and `computed()` narrow it;
/// `computed().optional()` describes a value the caller may set and the
/// vendor fills in otherwise.
#[derive(Debug, Clone)]
pub struct AttributeSchema {
    pub name: String,
    pub attr_type: AttributeType,
    pub required: bool,
    pub optional: bool,
    pub computed: bool,
    /// Changing this attribute requires replacing the resource
    pub force_new: bool,
    /// Value is redacted when states are displayed
    pub sensitive: bool,
    /// Input the vendor never reports back; reads leave it unset
    pub write_only: bool,
    pub default: Option<Value>,
    pub description: Option<String>,
}

impl AttributeSchema {
    pub fn new(name: impl Into<String>, attr_type: AttributeType) -> Self {
        Self {
            name: name.into(),
            attr_type,
            required: false,
            optional: true,
            computed: false,
            force_new: false,
            sensitive: false,
            write_only: false,
            default: None,
            description: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self.optional = false;
        self
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self.optional = true;
        self
    }

    pub fn computed(mut self) -> Self {
        self.computed = true;
        self.optional = false;
        self
    }

    pub fn force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    pub fn write_only(mut self) -> Self {
        self.write_only = true;
        self
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    /// Computed and not settable by the caller
    pub fn is_computed_only(&self) -> bool {
        self.computed && !self.required && !self.optional
    }
}

/// Whether a schema describes a managed resource or a read-only query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaKind {
    Resource,
    DataSource,
}

/// Resource schema
#[derive(Debug, Clone)]
pub struct ResourceSchema {
    pub resource_type: String,
    pub kind: SchemaKind,
    pub attributes: HashMap<String, AttributeSchema>,
    pub description: Option<String>,
}

impl ResourceSchema {
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            kind: SchemaKind::Resource,
            attributes: HashMap::new(),
            description: None,
        }
    }

    /// Schema for a data source; every data source accepts `result_output_file`
    pub fn data_source(resource_type: impl Into<String>) -> Self {
        Self {
            kind: SchemaKind::DataSource,
            ..Self::new(resource_type)
        }
        .attribute(
            AttributeSchema::new("result_output_file", AttributeType::String)
                .with_description("Path to save the query results as JSON"),
        )
    }

    pub fn attribute(mut self, schema: AttributeSchema) -> Self {
        self.attributes.insert(schema.name.clone(), schema);
        self
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    /// Validate attributes supplied by the caller
    pub fn validate(&self, attributes: &HashMap<String, Value>) -> Result<(), Vec<TypeError>> {
        let mut errors = Vec::new();

        // Check required attributes
        for (name, schema) in &self.attributes {
            if schema.required && !attributes.contains_key(name) && schema.default.is_none() {
                errors.push(TypeError::MissingRequired { name: name.clone() });
            }
        }

        // Type check each attribute
        for (name, value) in attributes {
            let Some(schema) = self.attributes.get(name) else {
                // Unknown attributes are allowed (for flexibility)
                continue;
            };
            if schema.is_computed_only() {
                errors.push(TypeError::ComputedOnly { name: name.clone() });
            } else if let Err(e) = schema.attr_type.validate(value) {
                errors.push(TypeError::InvalidAttribute {
                    name: name.clone(),
                    inner: Box::new(e),
                });
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Fill declared defaults for attributes the caller did not set
    pub fn apply_defaults(&self, attributes: &mut HashMap<String, Value>) {
        for (name, schema) in &self.attributes {
            if let Some(default) = &schema.default
                && !attributes.contains_key(name)
            {
                attributes.insert(name.clone(), default.clone());
            }
        }
    }

    /// Settable attributes whose desired value differs from the prior one.
    ///
    /// An optional+computed attribute left unset keeps whatever the vendor
    /// reported and is not considered changed. Neither is a write-only
    /// attribute the prior state does not carry.
    pub fn changed_attributes(
        &self,
        prior: &HashMap<String, Value>,
        desired: &HashMap<String, Value>,
    ) -> BTreeSet<String> {
        self.attributes
            .values()
            .filter(|schema| !schema.is_computed_only())
            .filter(|schema| !schema.write_only || prior.contains_key(&schema.name))
            .filter(|schema| {
                let desired_value = desired.get(&schema.name).or(schema.default.as_ref());
                match desired_value {
                    Some(v) => prior.get(&schema.name) != Some(v),
                    None => !schema.computed && prior.contains_key(&schema.name),
                }
            })
            .map(|schema| schema.name.clone())
            .collect()
    }

    /// Changed attributes that cannot be updated in place
    pub fn replacement_attributes(
        &self,
        prior: &HashMap<String, Value>,
        desired: &HashMap<String, Value>,
    ) -> Vec<String> {
        self.changed_attributes(prior, desired)
            .into_iter()
            .filter(|name| self.attributes.get(name).is_some_and(|s| s.force_new))
            .collect()
    }

    /// Names of the write-only attributes
    pub fn write_only_attributes(&self) -> impl Iterator<Item = &str> {
        self.attributes
            .values()
            .filter(|s| s.write_only)
            .map(|s| s.name.as_str())
    }

    /// Fill write-only attributes missing from `prior` with their desired value
    pub fn carry_write_only(
        &self,
        prior: &mut HashMap<String, Value>,
        desired: &HashMap<String, Value>,
    ) {
        for name in self.write_only_attributes() {
            if let Some(value) = desired.get(name)
                && !prior.contains_key(name)
            {
                prior.insert(name.to_string(), value.clone());
            }
        }
    }

    /// Copy of `attributes` with sensitive values masked
    pub fn redact(&self, attributes: &HashMap<String, Value>) -> HashMap<String, Value> {
        attributes
            .iter()
            .map(|(k, v)| {
                if self.attributes.get(k).is_some_and(|s| s.sensitive) {
                    (k.clone(), Value::String("(sensitive)".to_string()))
                } else {
                    (k.clone(), v.clone())
                }
            })
            .collect()
    }
}

/// Helper functions for common types
pub mod types {
    use super::*;

    fn custom(
        name: &str,
        base: AttributeType,
        f: impl Fn(&Value) -> Result<(), String> + Send + Sync + 'static,
    ) -> AttributeType {
        AttributeType::Custom {
            name: name.to_string(),
            base: Box::new(base),
            validate: Validator::new(f),
        }
    }

    /// Enum over string values
    pub fn allowed_strings(values: &[&str]) -> AttributeType {
        AttributeType::Enum(values.iter().map(|v| v.to_string()).collect())
    }

    /// Positive integer type
    pub fn positive_int() -> AttributeType {
        custom("PositiveInt", AttributeType::Int, |value| match value {
            Value::Int(n) if *n > 0 => Ok(()),
            _ => Err("Value must be positive".to_string()),
        })
    }

    /// Integer within `[min, max]`
    pub fn int_in_range(min: i64, max: i64) -> AttributeType {
        custom(
            &format!("Int({}..={})", min, max),
            AttributeType::Int,
            move |value| match value {
                Value::Int(n) if (min..=max).contains(n) => Ok(()),
                Value::Int(n) => Err(format!("{} is not between {} and {}", n, min, max)),
                _ => Err("Expected integer".to_string()),
            },
        )
    }

    /// Integer from a fixed set
    pub fn allowed_ints(values: &[i64]) -> AttributeType {
        let allowed = values.to_vec();
        let name = format!(
            "Int({})",
            allowed
                .iter()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join(" | ")
        );
        custom(&name, AttributeType::Int, move |value| match value {
            Value::Int(n) if allowed.contains(n) => Ok(()),
            Value::Int(n) => Err(format!("{} is not an allowed value", n)),
            _ => Err("Expected integer".to_string()),
        })
    }

    /// String whose length (in characters) is within `[min, max]`
    pub fn string_length_in_range(min: usize, max: usize) -> AttributeType {
        custom(
            &format!("String({}..={})", min, max),
            AttributeType::String,
            move |value| match value {
                Value::String(s) => {
                    let len = s.chars().count();
                    if (min..=max).contains(&len) {
                        Ok(())
                    } else {
                        Err(format!(
                            "length {} is not between {} and {}",
                            len, min, max
                        ))
                    }
                }
                _ => Err("Expected string".to_string()),
            },
        )
    }

    /// CIDR block type (e.g., "10.0.0.0/16")
    pub fn cidr() -> AttributeType {
        custom("Cidr", AttributeType::String, |value| match value {
            Value::String(s) => validate_cidr(s),
            _ => Err("Expected string".to_string()),
        })
    }

    /// IPv4 address type
    pub fn ipv4() -> AttributeType {
        custom("Ipv4", AttributeType::String, |value| match value {
            Value::String(s) => validate_ipv4(s),
            _ => Err("Expected string".to_string()),
        })
    }
}

/// Validate a dotted-quad IPv4 address
pub fn validate_ipv4(ip: &str) -> Result<(), String> {
    let octets: Vec<&str> = ip.split('.').collect();
    if octets.len() != 4 {
        return Err(format!("Invalid IP address '{}': expected 4 octets", ip));
    }

    for octet in &octets {
        if octet.parse::<u8>().is_err() {
            return Err(format!(
                "Invalid octet '{}' in IP address: must be 0-255",
                octet
            ));
        }
    }
    Ok(())
}

/// Validate CIDR block format (e.g., "10.0.0.0/16")
pub fn validate_cidr(cidr: &str) -> Result<(), String> {
    let Some((ip, prefix)) = cidr.split_once('/') else {
        return Err(format!(
            "Invalid CIDR format '{}': expected IP/prefix",
            cidr
        ));
    };

    validate_ipv4(ip)?;

    match prefix.parse::<u8>() {
        Ok(p) if p <= 32 => Ok(()),
        Ok(p) => Err(format!("Invalid prefix length '{}': must be 0-32", p)),
        Err(_) => Err(format!(
            "Invalid prefix length '{}': must be a number",
            prefix
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &str) -> Value {
        Value::String(v.to_string())
    }

    fn storage_schema() -> ResourceSchema {
        ResourceSchema::new("cbs_storage")
            .attribute(
                AttributeSchema::new("storage_type", types::allowed_strings(&["CLOUD_SSD", "CLOUD_PREMIUM"]))
                    .required()
                    .force_new(),
            )
            .attribute(AttributeSchema::new("storage_name", types::string_length_in_range(2, 60)).required())
            .attribute(AttributeSchema::new("project_id", AttributeType::Int).with_default(0i64))
            .attribute(AttributeSchema::new("snapshot_id", AttributeType::String).computed().optional())
            .attribute(AttributeSchema::new("storage_status", AttributeType::String).computed())
            .attribute(AttributeSchema::new("password", AttributeType::String).sensitive().write_only())
            .attribute(AttributeSchema::new("hostname", AttributeType::String).force_new().write_only())
    }

    #[test]
    fn validate_string_type() {
        let t = AttributeType::String;
        assert!(t.validate(&s("hello")).is_ok());
        assert!(t.validate(&Value::Int(42)).is_err());
    }

    #[test]
    fn validate_enum_type() {
        let t = AttributeType::Enum(vec!["a".to_string(), "b".to_string()]);
        assert!(t.validate(&s("a")).is_ok());
        assert!(t.validate(&s("c")).is_err());
    }

    #[test]
    fn validate_float_accepts_int() {
        assert!(AttributeType::Float.validate(&Value::Int(1)).is_ok());
        assert!(AttributeType::Float.validate(&Value::Float(1.5)).is_ok());
        assert!(AttributeType::Float.validate(&s("1.5")).is_err());
    }

    #[test]
    fn validate_positive_int() {
        let t = types::positive_int();
        assert!(t.validate(&Value::Int(1)).is_ok());
        assert!(t.validate(&Value::Int(100)).is_ok());
        assert!(t.validate(&Value::Int(0)).is_err());
        assert!(t.validate(&Value::Int(-1)).is_err());
    }

    #[test]
    fn validate_int_range_and_set() {
        let range = types::int_in_range(10, 32000);
        assert!(range.validate(&Value::Int(10)).is_ok());
        assert!(range.validate(&Value::Int(9)).is_err());
        assert!(range.validate(&s("10")).is_err());

        let periods = types::allowed_ints(&[1, 2, 3, 12, 24, 36]);
        assert!(periods.validate(&Value::Int(24)).is_ok());
        assert!(periods.validate(&Value::Int(13)).is_err());
    }

    #[test]
    fn validate_string_length() {
        let t = types::string_length_in_range(2, 60);
        assert!(t.validate(&s("ab")).is_ok());
        assert!(t.validate(&s("a")).is_err());
        assert!(t.validate(&s(&"x".repeat(61))).is_err());
    }

    #[test]
    fn validate_cidr_type() {
        let t = types::cidr();

        assert!(t.validate(&s("10.0.0.0/16")).is_ok());
        assert!(t.validate(&s("192.168.1.0/24")).is_ok());
        assert!(t.validate(&s("0.0.0.0/0")).is_ok());
        assert!(t.validate(&s("255.255.255.255/32")).is_ok());

        assert!(t.validate(&s("10.0.0.0")).is_err()); // no prefix
        assert!(t.validate(&s("10.0.0.0/33")).is_err()); // prefix too large
        assert!(t.validate(&s("10.0.0.256/16")).is_err()); // octet > 255
        assert!(t.validate(&s("10.0.0/16")).is_err()); // only 3 octets
        assert!(t.validate(&s("invalid")).is_err());
        assert!(t.validate(&Value::Int(42)).is_err()); // wrong type
    }

    #[test]
    fn validate_resource_schema() {
        let mut attrs = HashMap::new();
        attrs.insert("storage_type".to_string(), s("CLOUD_SSD"));
        attrs.insert("storage_name".to_string(), s("data-disk"));
        attrs.insert("snapshot_id".to_string(), s("snap-1"));

        assert!(storage_schema().validate(&attrs).is_ok());
    }

    #[test]
    fn missing_required_attribute() {
        let mut attrs = HashMap::new();
        attrs.insert("storage_type".to_string(), s("CLOUD_SSD"));

        let errors = storage_schema().validate(&attrs).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(matches!(&errors[0], TypeError::MissingRequired { name } if name == "storage_name"));
    }

    #[test]
    fn computed_only_attribute_is_rejected() {
        let mut attrs = HashMap::new();
        attrs.insert("storage_type".to_string(), s("CLOUD_SSD"));
        attrs.insert("storage_name".to_string(), s("data-disk"));
        attrs.insert("storage_status".to_string(), s("ATTACHED"));

        let errors = storage_schema().validate(&attrs).unwrap_err();
        assert!(matches!(&errors[0], TypeError::ComputedOnly { name } if name == "storage_status"));
    }

    #[test]
    fn invalid_attribute_names_the_attribute() {
        let mut attrs = HashMap::new();
        attrs.insert("storage_type".to_string(), s("FLOPPY"));
        attrs.insert("storage_name".to_string(), s("data-disk"));

        let errors = storage_schema().validate(&attrs).unwrap_err();
        assert!(errors[0].to_string().starts_with("Attribute 'storage_type'"));
    }

    #[test]
    fn apply_defaults_keeps_explicit_values() {
        let schema = storage_schema();
        let mut attrs = HashMap::new();
        schema.apply_defaults(&mut attrs);
        assert_eq!(attrs.get("project_id"), Some(&Value::Int(0)));

        let mut attrs = HashMap::new();
        attrs.insert("project_id".to_string(), Value::Int(7));
        schema.apply_defaults(&mut attrs);
        assert_eq!(attrs.get("project_id"), Some(&Value::Int(7)));
    }

    #[test]
    fn replacement_only_for_force_new_changes() {
        let schema = storage_schema();
        let mut prior = HashMap::new();
        prior.insert("storage_type".to_string(), s("CLOUD_SSD"));
        prior.insert("storage_name".to_string(), s("old"));
        prior.insert("snapshot_id".to_string(), s("snap-1"));
        prior.insert("storage_status".to_string(), s("UNATTACHED"));
        prior.insert("project_id".to_string(), Value::Int(0));

        let mut desired = prior.clone();
        desired.remove("snapshot_id");
        desired.remove("storage_status");
        desired.insert("storage_name".to_string(), s("new"));

        let changed = schema.changed_attributes(&prior, &desired);
        assert_eq!(changed.into_iter().collect::<Vec<_>>(), vec!["storage_name"]);
        assert!(schema.replacement_attributes(&prior, &desired).is_empty());

        desired.insert("storage_type".to_string(), s("CLOUD_PREMIUM"));
        assert_eq!(
            schema.replacement_attributes(&prior, &desired),
            vec!["storage_type".to_string()]
        );
    }

    #[test]
    fn write_only_missing_from_prior_is_unchanged() {
        let schema = storage_schema();
        let mut prior = HashMap::new();
        prior.insert("storage_type".to_string(), s("CLOUD_SSD"));
        prior.insert("storage_name".to_string(), s("data-disk"));
        prior.insert("project_id".to_string(), Value::Int(0));

        let mut desired = prior.clone();
        desired.insert("password".to_string(), s("hunter2"));
        desired.insert("hostname".to_string(), s("web-1"));

        assert!(schema.changed_attributes(&prior, &desired).is_empty());
        assert!(schema.replacement_attributes(&prior, &desired).is_empty());

        prior.insert("hostname".to_string(), s("web-0"));
        assert_eq!(
            schema.replacement_attributes(&prior, &desired),
            vec!["hostname".to_string()]
        );
    }

    #[test]
    fn carry_write_only_fills_only_missing_values() {
        let schema = storage_schema();
        let mut prior = HashMap::new();
        prior.insert("hostname".to_string(), s("web-0"));

        let mut desired = HashMap::new();
        desired.insert("password".to_string(), s("hunter2"));
        desired.insert("hostname".to_string(), s("web-1"));
        desired.insert("storage_name".to_string(), s("data-disk"));

        schema.carry_write_only(&mut prior, &desired);
        assert_eq!(prior.get("password"), Some(&s("hunter2")));
        assert_eq!(prior.get("hostname"), Some(&s("web-0")));
        assert!(!prior.contains_key("storage_name"));
    }

    #[test]
    fn redact_masks_sensitive_values() {
        let mut attrs = HashMap::new();
        attrs.insert("password".to_string(), s("hunter2"));
        attrs.insert("storage_name".to_string(), s("data-disk"));

        let redacted = storage_schema().redact(&attrs);
        assert_eq!(redacted.get("password"), Some(&s("(sensitive)")));
        assert_eq!(redacted.get("storage_name"), Some(&s("data-disk")));
    }
}
