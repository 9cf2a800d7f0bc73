//! `/items` endpoints, covering every registered verb

use super::NoContent;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
}

/// Item without its id, for create and replace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemForm {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
}

/// Partial update; only the fields that are set are sent
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
}

/// Listing filter; every `ids` and `tags` entry becomes its own query pair
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemQuery {
    #[serde(default)]
    pub ids: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub q: Option<String>,
    pub skip: Option<u32>,
    pub limit: Option<u32>,
}

path_params! {
    pub struct ItemId { id: String }
}

impl ItemId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

endpoint! {
    pub struct ItemList => "itemList" {
        method: Get,
        path: "/items/",
        request: ItemQuery,
        response: Vec<Item>,
    }
}

endpoint! {
    pub struct ItemCreate => "itemCreate" {
        method: Post,
        path: "/items/",
        request: ItemForm,
        response: Item,
    }
}

endpoint! {
    pub struct ItemGet => "itemGet" {
        method: Get,
        path: "/items/{id}",
        params: ItemId,
        response: Item,
    }
}

endpoint! {
    pub struct ItemReplace => "itemReplace" {
        method: Put,
        path: "/items/{id}",
        params: ItemId,
        request: ItemForm,
        response: Item,
    }
}

endpoint! {
    pub struct ItemPatchMany => "itemPatchMany" {
        method: Patch,
        path: "/items/",
        request: Vec<ItemPatch>,
        response: Vec<Item>,
    }
}

endpoint! {
    pub struct ItemDelete => "itemDelete" {
        method: Delete,
        path: "/items/{id}",
        params: ItemId,
        response: bool,
    }
}

endpoint! {
    /// Answers with headers only
    pub struct ItemOptions => "itemOptions" {
        method: Options,
        path: "/items/",
        response: NoContent,
    }
}

endpoint! {
    /// Echo of the request as the server saw it, if it sends one
    pub struct ItemTrace => "itemTrace" {
        method: Trace,
        path: "/items/{id}",
        params: ItemId,
        response: Option<serde_json::Value>,
    }
}
