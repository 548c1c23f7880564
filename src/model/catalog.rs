//! Catalog products: the write-side description and the read-side similarity
//! candidate.

use serde::{Deserialize, Serialize};

/// Allergen tag for products whose allergen content is unknown. Such products
/// are never excluded by the allergen predicate.
pub const NOT_KNOWN_ALLERGEN: &str = "Not-Known";
/// Gender tag for products suitable for every user.
pub const UNISEX: &str = "Unisex";

/// A product to be written into the graph, with its eligibility tags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductSpec {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default = "default_allergen")]
    pub allergen: String,
    #[serde(default = "default_gender")]
    pub gender: String,
    #[serde(default)]
    pub affiliation: Option<String>,
    /// Precomputed embedding; when absent the catalog seeder embeds
    /// `name` and `description`.
    #[serde(default)]
    pub embedding: Option<Vec<f32>>,
}

fn default_allergen() -> String { NOT_KNOWN_ALLERGEN.to_string() }
fn default_gender() -> String { UNISEX.to_string() }

impl ProductSpec {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            price: 0.0,
            allergen: default_allergen(),
            gender: default_gender(),
            affiliation: None,
            embedding: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_price(mut self, price: f64) -> Self {
        self.price = price;
        self
    }

    pub fn with_allergen(mut self, allergen: impl Into<String>) -> Self {
        self.allergen = allergen.into();
        self
    }

    pub fn with_gender(mut self, gender: impl Into<String>) -> Self {
        self.gender = gender.into();
        self
    }

    pub fn with_affiliation(mut self, affiliation: impl Into<String>) -> Self {
        self.affiliation = Some(affiliation.into());
        self
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    /// Text the seeder embeds when no vector is supplied.
    pub fn embedding_text(&self) -> String {
        if self.description.is_empty() {
            self.name.clone()
        } else {
            format!("{} {}", self.name, self.description)
        }
    }
}

/// One row of the similarity search, joined with the product's eligibility
/// tags. A tag is `None` when the product has no such edge.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub product_id: String,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub score: f64,
    pub allergen: Option<String>,
    pub gender: Option<String>,
    pub affiliation: Option<String>,
}
