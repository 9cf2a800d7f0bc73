//! `/todo` endpoints

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Todo {
    pub id: i64,
    pub item: String,
}

/// Body of create and update
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoForm {
    pub item: String,
}

impl TodoForm {
    #[must_use]
    pub fn new(item: impl Into<String>) -> Self {
        Self { item: item.into() }
    }
}

path_params! {
    pub struct TodoId { todo_id: i64 }
}

endpoint! {
    pub struct TodoGetAll => "todoGetAll" {
        method: Get,
        path: "/todo/",
        response: Vec<Todo>,
    }
}

endpoint! {
    pub struct TodoGetOne => "todoGetOne" {
        method: Get,
        path: "/todo/{todo_id}",
        params: TodoId,
        response: Todo,
    }
}

endpoint! {
    pub struct TodoCreate => "todoCreate" {
        method: Post,
        path: "/todo/",
        request: TodoForm,
        response: Todo,
    }
}

endpoint! {
    pub struct TodoUpdate => "todoUpdate" {
        method: Patch,
        path: "/todo/{todo_id}",
        params: TodoId,
        request: TodoForm,
        response: Todo,
    }
}

endpoint! {
    /// Answers `true` once the row is gone
    pub struct TodoDelete => "todoDelete" {
        method: Delete,
        path: "/todo/{todo_id}",
        params: TodoId,
        response: bool,
    }
}
