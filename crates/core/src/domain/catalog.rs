use serde::{Deserialize, Serialize};

use crate::domain::claim::ItemKind;

/// One result row from a catalog search collaborator. The item kind is
/// implied by which fetcher produced the hit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogHit {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// A catalog item placed into the cart, with its kind made explicit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub kind: ItemKind,
    pub id: String,
    pub title: String,
    pub subtitle: Option<String>,
    pub image_url: Option<String>,
}

impl CatalogItem {
    pub fn from_hit(kind: ItemKind, hit: CatalogHit) -> Self {
        Self { kind, id: hit.id, title: hit.title, subtitle: hit.subtitle, image_url: hit.image_url }
    }
}
