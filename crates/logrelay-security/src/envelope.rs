//! Shapes credentials travel in
//!
//! Decoding is an explicit chain over the parsed JSON value: an object is a
//! single [`Envelope`], an array is a list of envelopes, an object with a
//! string `mapping` field wraps another payload, and an array of objects may
//! be a bare list of [`CredentialHolder`] records. Every step yields an empty
//! candidate list instead of an error when the shape does not match.
//!
//! Fields are decoded leniently: a field of the wrong JSON type is treated as
//! absent rather than failing the whole record.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Credential categories, in the order they are redacted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Password,
    Token,
    Secret,
    SubscriptionId,
    ClientId,
    ClientSecret,
    TenantId,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::Password,
        Category::Token,
        Category::Secret,
        Category::SubscriptionId,
        Category::ClientId,
        Category::ClientSecret,
        Category::TenantId,
    ];
}

/// A directory record holding credentials (a datacenter).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialHolder {
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub aws_access_key_id: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub aws_secret_access_key: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub azure_subscription_id: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub azure_client_id: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub azure_client_secret: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub azure_tenant_id: Option<String>,
}

impl CredentialHolder {
    fn field(&self, category: Category) -> Option<&String> {
        match category {
            Category::Password => self.password.as_ref(),
            Category::Token => self.aws_access_key_id.as_ref(),
            Category::Secret => self.aws_secret_access_key.as_ref(),
            Category::SubscriptionId => self.azure_subscription_id.as_ref(),
            Category::ClientId => self.azure_client_id.as_ref(),
            Category::ClientSecret => self.azure_client_secret.as_ref(),
            Category::TenantId => self.azure_tenant_id.as_ref(),
        }
    }

    /// Every non-empty credential value of this record.
    pub fn literals(&self) -> Vec<String> {
        Category::ALL
            .iter()
            .filter_map(|category| self.field(*category))
            .filter(|value| !value.is_empty())
            .cloned()
            .collect()
    }
}

/// Component entries embed the datacenter credentials under prefixed names.
#[derive(Debug, Clone, Default, Deserialize)]
struct Component {
    #[serde(default, deserialize_with = "lenient")]
    datacenter_password: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    aws_access_key_id: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    aws_secret_access_key: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    azure_subscription_id: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    azure_client_id: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    azure_client_secret: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    azure_tenant_id: Option<String>,
}

impl Component {
    fn field(&self, category: Category) -> Option<&String> {
        match category {
            Category::Password => self.datacenter_password.as_ref(),
            Category::Token => self.aws_access_key_id.as_ref(),
            Category::Secret => self.aws_secret_access_key.as_ref(),
            Category::SubscriptionId => self.azure_subscription_id.as_ref(),
            Category::ClientId => self.azure_client_id.as_ref(),
            Category::ClientSecret => self.azure_client_secret.as_ref(),
            Category::TenantId => self.azure_tenant_id.as_ref(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct Items {
    #[serde(default, deserialize_with = "lenient_list")]
    items: Vec<CredentialHolder>,
}

/// The general structure of a message that may carry credentials.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Envelope {
    #[serde(default, deserialize_with = "lenient")]
    datacenter: Option<CredentialHolder>,
    #[serde(default, deserialize_with = "lenient")]
    datacenters: Option<Items>,
    #[serde(default, deserialize_with = "lenient_list")]
    components: Vec<Component>,
    #[serde(default, deserialize_with = "lenient")]
    datacenter_password: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    aws_access_key_id: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    aws_secret_access_key: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    password: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    datacenter_access_token: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    datacenter_access_key: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    token: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    secret: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    azure_subscription_id: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    azure_client_id: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    azure_client_secret: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    azure_tenant_id: Option<String>,
}

impl Envelope {
    /// Top-level fields holding a value of `category`, including legacy aliases.
    fn direct(&self, category: Category) -> Vec<&Option<String>> {
        match category {
            Category::Password => vec![&self.datacenter_password, &self.password],
            Category::Token => vec![
                &self.aws_access_key_id,
                &self.datacenter_access_token,
                &self.token,
            ],
            Category::Secret => vec![
                &self.aws_secret_access_key,
                &self.datacenter_access_key,
                &self.secret,
            ],
            Category::SubscriptionId => vec![&self.azure_subscription_id],
            Category::ClientId => vec![&self.azure_client_id],
            Category::ClientSecret => vec![&self.azure_client_secret],
            Category::TenantId => vec![&self.azure_tenant_id],
        }
    }

    /// Values of `category` found in components, datacenter items, direct
    /// fields and the nested datacenter, in that order.
    pub fn candidates(&self, category: Category) -> Vec<String> {
        let components = self.components.iter().filter_map(|c| c.field(category));
        let items = self
            .datacenters
            .iter()
            .flat_map(|d| d.items.iter())
            .filter_map(|d| d.field(category));
        let direct = self.direct(category).into_iter().filter_map(Option::as_ref);
        let nested = self.datacenter.iter().filter_map(|d| d.field(category));

        components
            .chain(items)
            .chain(direct)
            .chain(nested)
            .filter(|value| !value.is_empty())
            .cloned()
            .collect()
    }
}

/// Values of `category` when `raw` is a single envelope or a list of envelopes.
pub fn envelope_candidates(raw: &str, category: Category) -> Vec<String> {
    match serde_json::from_str::<Value>(raw) {
        Ok(value @ Value::Object(_)) => from_value::<Envelope>(value)
            .map(|envelope| envelope.candidates(category))
            .unwrap_or_default(),
        Ok(Value::Array(elements)) => elements
            .into_iter()
            .filter(Value::is_object)
            .filter_map(from_value::<Envelope>)
            .flat_map(|envelope| envelope.candidates(category))
            .collect(),
        _ => Vec::new(),
    }
}

/// Values of `category` inside a `{"mapping": "<escaped json>"}` wrapper.
pub fn mapping_candidates(raw: &str, category: Category) -> Vec<String> {
    let inner = match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(mut map)) => match map.remove("mapping") {
            Some(Value::String(inner)) => inner,
            _ => return Vec::new(),
        },
        _ => return Vec::new(),
    };
    envelope_candidates(&inner.replace("\\\"", "\""), category)
}

/// Values of `category` when `raw` is a bare list of credential records.
/// Only the first record is considered.
pub fn record_list_candidates(raw: &str, category: Category) -> Vec<String> {
    let first = match serde_json::from_str::<Value>(raw) {
        Ok(Value::Array(elements)) => elements.into_iter().next(),
        _ => None,
    };
    let Some(record) = first.and_then(from_value::<CredentialHolder>) else {
        return Vec::new();
    };
    match serde_json::to_string(&record) {
        Ok(encoded) => envelope_candidates(&encoded, category),
        Err(_) => Vec::new(),
    }
}

fn from_value<T: DeserializeOwned>(value: Value) -> Option<T> {
    if !value.is_object() {
        return None;
    }
    serde_json::from_value(value).ok()
}

fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

fn lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    match Value::deserialize(deserializer)? {
        Value::Array(elements) => Ok(elements
            .into_iter()
            .filter_map(from_value::<T>)
            .collect()),
        _ => Ok(Vec::new()),
    }
}
