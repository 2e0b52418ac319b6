//! Canonical index types
//!
//! Desired state ([`IndexConfiguration`]) comes from the declaration after
//! boundary normalization. Observed state ([`IndexInfo`]) comes fresh from the
//! store on every reconciliation step and is never cached across calls.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Scalar type of a key attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttributeType {
    #[serde(rename = "S", alias = "STRING")]
    String,
    #[serde(rename = "N", alias = "NUMBER")]
    Number,
    #[serde(rename = "B", alias = "BINARY")]
    Binary,
}

impl AttributeType {
    /// Parse a declared attribute type. Accepts the short store form (`S`)
    /// and the long form (`STRING`).
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "S" | "STRING" => Some(Self::String),
            "N" | "NUMBER" => Some(Self::Number),
            "B" | "BINARY" => Some(Self::Binary),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "S",
            Self::Number => "N",
            Self::Binary => "B",
        }
    }
}

/// One key attribute of an index
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttributeDefinition {
    pub name: String,
    #[serde(rename = "type")]
    pub attribute_type: AttributeType,
}

impl AttributeDefinition {
    pub fn new(name: impl Into<String>, attribute_type: AttributeType) -> Self {
        Self {
            name: name.into(),
            attribute_type,
        }
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, AttributeType::String)
    }

    pub fn number(name: impl Into<String>) -> Self {
        Self::new(name, AttributeType::Number)
    }
}

/// Which attributes an index copies from the base table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProjectionType {
    #[default]
    All,
    KeysOnly,
    Include,
}

impl ProjectionType {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "ALL" => Some(Self::All),
            "KEYS_ONLY" => Some(Self::KeysOnly),
            "INCLUDE" => Some(Self::Include),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "ALL",
            Self::KeysOnly => "KEYS_ONLY",
            Self::Include => "INCLUDE",
        }
    }
}

/// Provisioned read/write capacity of an index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvisionedThroughput {
    pub read_capacity_units: i64,
    pub write_capacity_units: i64,
}

impl ProvisionedThroughput {
    pub fn new(read_capacity_units: i64, write_capacity_units: i64) -> Self {
        Self {
            read_capacity_units,
            write_capacity_units,
        }
    }
}

/// Desired configuration of one index, as declared
///
/// `provisioned_throughput: None` means the table bills on demand and the
/// index throughput is not managed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexConfiguration {
    pub index_name: String,
    pub partition_key: AttributeDefinition,
    pub sort_key: Option<AttributeDefinition>,
    pub projection_type: ProjectionType,
    /// Only meaningful when `projection_type` is `Include`
    pub non_key_attributes: Vec<String>,
    pub provisioned_throughput: Option<ProvisionedThroughput>,
}

impl IndexConfiguration {
    /// Index projecting all attributes with no sort key and on-demand billing
    pub fn new(index_name: impl Into<String>, partition_key: AttributeDefinition) -> Self {
        Self {
            index_name: index_name.into(),
            partition_key,
            sort_key: None,
            projection_type: ProjectionType::All,
            non_key_attributes: Vec::new(),
            provisioned_throughput: None,
        }
    }

    pub fn with_sort_key(mut self, sort_key: AttributeDefinition) -> Self {
        self.sort_key = Some(sort_key);
        self
    }

    pub fn with_projection(
        mut self,
        projection_type: ProjectionType,
        non_key_attributes: Vec<String>,
    ) -> Self {
        self.projection_type = projection_type;
        self.non_key_attributes = non_key_attributes;
        self
    }

    pub fn with_throughput(mut self, read: i64, write: i64) -> Self {
        self.provisioned_throughput = Some(ProvisionedThroughput::new(read, write));
        self
    }
}

/// Role of an attribute in a key schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum KeyRole {
    Hash,
    Range,
}

impl KeyRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hash => "HASH",
            Self::Range => "RANGE",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyElement {
    pub attribute_name: String,
    pub role: KeyRole,
}

impl KeyElement {
    pub fn hash(attribute_name: impl Into<String>) -> Self {
        Self {
            attribute_name: attribute_name.into(),
            role: KeyRole::Hash,
        }
    }

    pub fn range(attribute_name: impl Into<String>) -> Self {
        Self {
            attribute_name: attribute_name.into(),
            role: KeyRole::Range,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Projection {
    #[serde(default)]
    pub projection_type: ProjectionType,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub non_key_attributes: Vec<String>,
}

/// Lifecycle status of an index as reported by the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum IndexStatus {
    Creating,
    Updating,
    Deleting,
    Active,
    Other(String),
}

impl IndexStatus {
    pub fn parse(value: &str) -> Self {
        match value {
            "CREATING" => Self::Creating,
            "UPDATING" => Self::Updating,
            "DELETING" => Self::Deleting,
            "ACTIVE" => Self::Active,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Creating => "CREATING",
            Self::Updating => "UPDATING",
            Self::Deleting => "DELETING",
            Self::Active => "ACTIVE",
            Self::Other(s) => s,
        }
    }

    /// True while a create/update/delete mutation is running at the store
    pub fn is_in_flight(&self) -> bool {
        matches!(self, Self::Creating | Self::Updating | Self::Deleting)
    }
}

impl From<String> for IndexStatus {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<IndexStatus> for String {
    fn from(value: IndexStatus) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for IndexStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Table-level status as reported by the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TableStatus {
    Active,
    Creating,
    Updating,
    Deleting,
    Other(String),
}

impl TableStatus {
    pub fn parse(value: &str) -> Self {
        match value {
            "ACTIVE" => Self::Active,
            "CREATING" => Self::Creating,
            "UPDATING" => Self::Updating,
            "DELETING" => Self::Deleting,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Active => "ACTIVE",
            Self::Creating => "CREATING",
            Self::Updating => "UPDATING",
            Self::Deleting => "DELETING",
            Self::Other(s) => s,
        }
    }

    /// No structural mutation is running on the table
    pub fn is_stable(&self) -> bool {
        matches!(self, Self::Active)
    }
}

impl From<String> for TableStatus {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<TableStatus> for String {
    fn from(value: TableStatus) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for TableStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Observed state of one index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexInfo {
    pub index_name: String,
    pub key_schema: Vec<KeyElement>,
    #[serde(default)]
    pub projection: Projection,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<IndexStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provisioned_throughput: Option<ProvisionedThroughput>,
}

impl IndexInfo {
    /// Attribute bound as the HASH element, if any
    pub fn hash_key(&self) -> Option<&str> {
        self.key_of(KeyRole::Hash)
    }

    /// Attribute bound as the RANGE element, if any
    pub fn range_key(&self) -> Option<&str> {
        self.key_of(KeyRole::Range)
    }

    fn key_of(&self, role: KeyRole) -> Option<&str> {
        self.key_schema
            .iter()
            .find(|k| k.role == role)
            .map(|k| k.attribute_name.as_str())
    }

    pub fn is_in_flight(&self) -> bool {
        self.status.as_ref().is_some_and(IndexStatus::is_in_flight)
    }

    /// The status this index is moving towards while in flight
    pub fn pending_target(&self) -> IndexTarget {
        match self.status {
            Some(IndexStatus::Deleting) => IndexTarget::Deleted,
            _ => IndexTarget::Active,
        }
    }

    /// Observed view of an index that would result from `config`
    pub fn from_configuration(config: &IndexConfiguration, status: Option<IndexStatus>) -> Self {
        let mut key_schema = vec![KeyElement::hash(&config.partition_key.name)];
        if let Some(sort_key) = &config.sort_key {
            key_schema.push(KeyElement::range(&sort_key.name));
        }
        let non_key_attributes = if config.projection_type == ProjectionType::Include {
            config.non_key_attributes.clone()
        } else {
            Vec::new()
        };
        Self {
            index_name: config.index_name.clone(),
            key_schema,
            projection: Projection {
                projection_type: config.projection_type,
                non_key_attributes,
            },
            status,
            provisioned_throughput: config.provisioned_throughput,
        }
    }
}

/// Terminal status a waiter or probe checks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexTarget {
    Active,
    /// The index is absent from the table listing
    Deleted,
}

impl fmt::Display for IndexTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => f.write_str("ACTIVE"),
            Self::Deleted => f.write_str("DELETED"),
        }
    }
}

/// Lifecycle transition requested by the driving framework
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestKind {
    #[serde(alias = "CREATE", alias = "create")]
    Create,
    #[serde(alias = "UPDATE", alias = "update")]
    Update,
    #[serde(alias = "DELETE", alias = "delete")]
    Delete,
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => f.write_str("Create"),
            Self::Update => f.write_str("Update"),
            Self::Delete => f.write_str("Delete"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OperationKind {
    Create,
    Update,
    Delete,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => f.write_str("CREATE"),
            Self::Update => f.write_str("UPDATE"),
            Self::Delete => f.write_str("DELETE"),
        }
    }
}

/// One index mutation computed by the planner
///
/// Produced fresh on every reconciliation step and never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    pub kind: OperationKind,
    pub index_name: String,
    /// Required for CREATE and UPDATE
    pub desired: Option<IndexConfiguration>,
    /// Required for DELETE and UPDATE
    pub current: Option<IndexInfo>,
}

impl Operation {
    pub fn create(desired: IndexConfiguration) -> Self {
        Self {
            kind: OperationKind::Create,
            index_name: desired.index_name.clone(),
            desired: Some(desired),
            current: None,
        }
    }

    pub fn update(desired: IndexConfiguration, current: IndexInfo) -> Self {
        Self {
            kind: OperationKind::Update,
            index_name: desired.index_name.clone(),
            desired: Some(desired),
            current: Some(current),
        }
    }

    pub fn delete(current: IndexInfo) -> Self {
        Self {
            kind: OperationKind::Delete,
            index_name: current.index_name.clone(),
            desired: None,
            current: Some(current),
        }
    }

    /// Terminal status the index reaches once this operation completes
    pub fn target(&self) -> IndexTarget {
        match self.kind {
            OperationKind::Delete => IndexTarget::Deleted,
            OperationKind::Create | OperationKind::Update => IndexTarget::Active,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.index_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_type_accepts_both_forms() {
        assert_eq!(AttributeType::parse("S"), Some(AttributeType::String));
        assert_eq!(AttributeType::parse("NUMBER"), Some(AttributeType::Number));
        assert_eq!(AttributeType::parse("B"), Some(AttributeType::Binary));
        assert_eq!(AttributeType::parse("string"), None);
        assert_eq!(AttributeType::parse("BOOL"), None);
    }

    #[test]
    fn test_index_status_in_flight() {
        assert!(IndexStatus::Creating.is_in_flight());
        assert!(IndexStatus::Updating.is_in_flight());
        assert!(IndexStatus::Deleting.is_in_flight());
        assert!(!IndexStatus::Active.is_in_flight());
        assert!(!IndexStatus::parse("ARCHIVED").is_in_flight());
    }

    #[test]
    fn test_index_info_key_lookup() {
        let info = IndexInfo {
            index_name: "GSI1".to_string(),
            key_schema: vec![KeyElement::range("SK1"), KeyElement::hash("PK1")],
            projection: Projection::default(),
            status: Some(IndexStatus::Deleting),
            provisioned_throughput: None,
        };
        assert_eq!(info.hash_key(), Some("PK1"));
        assert_eq!(info.range_key(), Some("SK1"));
        assert!(info.is_in_flight());
        assert_eq!(info.pending_target(), IndexTarget::Deleted);
    }

    #[test]
    fn test_index_info_serde_uses_store_strings() {
        let json = serde_json::json!({
            "indexName": "GSI1",
            "keySchema": [{"attributeName": "PK1", "role": "HASH"}],
            "projection": {"projectionType": "KEYS_ONLY"},
            "status": "CREATING",
            "provisionedThroughput": {"readCapacityUnits": 5, "writeCapacityUnits": 5}
        });
        let info: IndexInfo = serde_json::from_value(json).unwrap();
        assert_eq!(info.status, Some(IndexStatus::Creating));
        assert_eq!(info.projection.projection_type, ProjectionType::KeysOnly);
        assert_eq!(
            info.provisioned_throughput,
            Some(ProvisionedThroughput::new(5, 5))
        );
    }

    #[test]
    fn test_operation_display_and_target() {
        let config = IndexConfiguration::new("GSI1", AttributeDefinition::string("PK1"));
        let op = Operation::create(config.clone());
        assert_eq!(op.to_string(), "CREATE GSI1");
        assert_eq!(op.target(), IndexTarget::Active);

        let current = IndexInfo::from_configuration(&config, Some(IndexStatus::Active));
        let op = Operation::delete(current);
        assert_eq!(op.to_string(), "DELETE GSI1");
        assert_eq!(op.target(), IndexTarget::Deleted);
    }
}
