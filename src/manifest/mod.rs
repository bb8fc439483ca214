//! Component manifest data model.
//!
//! A [`ComponentManifestMap`] is the machine-readable description of a UI
//! component library: one [`ComponentManifest`] per component, each carrying
//! its documentation tags and the stories (usage examples) that exercise it.
//!
//! Values of these types are only ever produced by [`crate::schema::validate`]
//! or by deserializing data that has already passed it.

pub mod docs;
pub mod source;

use std::collections::BTreeMap;

use serde::{de, Deserialize, Deserializer, Serialize};

pub use source::{FetchError, HttpFetcher, ManifestContext, ManifestFetcher, ManifestResolver, ResolveError};

/// Manifest format version this server understands.
pub const SUPPORTED_MANIFEST_VERSION: u64 = 1;

/// Value of a documentation tag. Tags are extracted from source comments, so
/// only scalar values are representable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JsDocTagValue {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    Text(String),
}

impl std::fmt::Display for JsDocTagValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// One structured documentation annotation, e.g. `@summary`.
///
/// Keys are not unique within a tag list; duplicates keep their order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsDocTag {
    pub key: String,
    pub value: JsDocTagValue,
}

/// Fields shared by anything describable: components and stories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaseManifest {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub import: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub js_doc_tags: Option<Vec<JsDocTag>>,
}

/// A documented usage example of a component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Story {
    #[serde(flatten)]
    pub base: BaseManifest,
    /// Literal source text of the example.
    pub snippet: String,
}

/// Prop-table data as produced by the docgen tool.
///
/// Never traversed or validated here; it is carried through as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OpaqueProps(pub serde_json::Value);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentManifest {
    pub id: String,
    #[serde(flatten)]
    pub base: BaseManifest,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Display order is significant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stories: Option<Vec<Story>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub props: Option<OpaqueProps>,
}

impl ComponentManifest {
    pub fn name(&self) -> &str {
        &self.base.name
    }

    pub fn stories(&self) -> &[Story] {
        self.stories.as_deref().unwrap_or_default()
    }

    /// Tags in source order, empty if none were extracted.
    pub fn js_doc_tags(&self) -> &[JsDocTag] {
        self.base.js_doc_tags.as_deref().unwrap_or_default()
    }
}

/// Every component in a library, keyed by component id.
///
/// Keys always equal the nested `id` once validated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentManifestMap {
    #[serde(deserialize_with = "integral_version")]
    pub v: u64,
    pub components: BTreeMap<String, ComponentManifest>,
}

impl ComponentManifestMap {
    pub fn get(&self, id: &str) -> Option<&ComponentManifest> {
        self.components.get(id)
    }
}

/// JSON Schema `integer` admits `1.0`, so the version field does too.
fn integral_version<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let number = serde_json::Number::deserialize(deserializer)?;
    number
        .as_u64()
        .or_else(|| {
            number
                .as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= 0.0 && *f <= u64::MAX as f64)
                .map(|f| f as u64)
        })
        .ok_or_else(|| de::Error::custom(format!("expected a non-negative integer version, found {number}")))
}
