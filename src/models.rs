use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Number;

/// Demonstration CRUD entity held by [`crate::store::ResourceStore`].
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Resource {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Kept as the JSON number that was sent, so `1` echoes as `1`, not `1.0`.
    pub price: Number,
    pub tax: Option<Number>,
}

/// Body of `POST /items`. Required fields stay optional here so that a
/// missing one is reported as a validation error rather than a decode error.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct NewResource {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Number>,
    pub tax: Option<Number>,
}

/// Body of `PUT /items/{id}`.
///
/// `tax` distinguishes an omitted field (`None`) from an explicit `null`
/// (`Some(None)`).
#[derive(Deserialize, Clone, Debug, Default)]
pub struct ResourcePatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Number>,
    #[serde(default, deserialize_with = "present")]
    pub tax: Option<Option<Number>>,
}

impl Resource {
    pub fn apply(&mut self, patch: ResourcePatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(price) = patch.price {
            self.price = price;
        }
        if let Some(tax) = patch.tax {
            self.tax = tax;
        }
    }
}

fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
