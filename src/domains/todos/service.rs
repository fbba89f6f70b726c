//! Todo provider trait and the in-memory reference implementation.
//!
//! The transport and dispatch layers are agnostic to todo semantics; they
//! only ever see a [`TodoProvider`] injected into tool handler closures.
//! The in-memory [`TodoService`] is the demo collaborator - swap it for a
//! database-backed implementation without touching the protocol core.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use super::error::TodoError;

/// A todo record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    pub id: u64,
    pub title: String,
    pub description: String,
    pub completed: bool,
    /// Creation timestamp, serialized as RFC 3339.
    pub created_at: DateTime<Utc>,
}

/// Fields for creating a todo.
#[derive(Debug, Clone, Default)]
pub struct NewTodo {
    pub title: String,
    pub description: Option<String>,
}

/// Partial update: absent fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct TodoPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub completed: Option<bool>,
}

/// Result of a delete operation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeletedTodo {
    pub success: bool,
    pub id: u64,
}

/// Domain collaborator behind the tool handlers.
#[async_trait]
pub trait TodoProvider: Send + Sync {
    /// Create a todo; a fresh id is assigned and `completed` starts false.
    async fn create(&self, new: NewTodo) -> Todo;

    /// List all todos in creation order.
    async fn list(&self) -> Vec<Todo>;

    /// Apply a partial update to an existing todo.
    async fn update(&self, id: u64, patch: TodoPatch) -> Result<Todo, TodoError>;

    /// Delete a todo by id.
    async fn delete(&self, id: u64) -> Result<DeletedTodo, TodoError>;
}

#[derive(Debug, Default)]
struct TodoStore {
    todos: Vec<Todo>,
    next_id: u64,
}

/// In-memory todo provider.
///
/// Owns its store exclusively; construct one instance and share it via
/// `Arc` so tests get isolated stores for free.
#[derive(Debug, Default)]
pub struct TodoService {
    store: Mutex<TodoStore>,
}

impl TodoService {
    /// Create an empty service.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TodoProvider for TodoService {
    async fn create(&self, new: NewTodo) -> Todo {
        let mut store = self.store.lock().await;
        store.next_id += 1;
        let todo = Todo {
            id: store.next_id,
            title: new.title,
            description: new.description.unwrap_or_default(),
            completed: false,
            created_at: Utc::now(),
        };
        store.todos.push(todo.clone());
        todo
    }

    async fn list(&self) -> Vec<Todo> {
        self.store.lock().await.todos.clone()
    }

    async fn update(&self, id: u64, patch: TodoPatch) -> Result<Todo, TodoError> {
        let mut store = self.store.lock().await;
        let todo = store
            .todos
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(TodoError::NotFound(id))?;

        if let Some(title) = patch.title {
            todo.title = title;
        }
        if let Some(description) = patch.description {
            todo.description = description;
        }
        if let Some(completed) = patch.completed {
            todo.completed = completed;
        }
        Ok(todo.clone())
    }

    async fn delete(&self, id: u64) -> Result<DeletedTodo, TodoError> {
        let mut store = self.store.lock().await;
        let initial = store.todos.len();
        store.todos.retain(|t| t.id != id);
        if store.todos.len() == initial {
            return Err(TodoError::NotFound(id));
        }
        Ok(DeletedTodo { success: true, id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_assigns_sequential_ids() {
        let service = TodoService::new();
        let first = service
            .create(NewTodo {
                title: "first".into(),
                description: None,
            })
            .await;
        let second = service
            .create(NewTodo {
                title: "second".into(),
                description: Some("details".into()),
            })
            .await;

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert_eq!(first.description, "");
        assert_eq!(second.description, "details");
        assert!(!first.completed);
    }

    #[tokio::test]
    async fn test_create_then_list_roundtrip() {
        let service = TodoService::new();
        let created = service
            .create(NewTodo {
                title: "Buy milk".into(),
                description: None,
            })
            .await;

        let todos = service.list().await;
        assert_eq!(todos.len(), 1);
        assert_eq!(todos[0], created);
        assert!(!todos[0].completed);
    }

    #[tokio::test]
    async fn test_update_patches_only_given_fields() {
        let service = TodoService::new();
        let created = service
            .create(NewTodo {
                title: "Buy milk".into(),
                description: None,
            })
            .await;

        let updated = service
            .update(
                created.id,
                TodoPatch {
                    completed: Some(true),
                    ..TodoPatch::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.title, "Buy milk");
        assert!(updated.completed);
        assert_eq!(updated.created_at, created.created_at);
    }

    #[tokio::test]
    async fn test_update_unknown_id() {
        let service = TodoService::new();
        let err = service.update(99, TodoPatch::default()).await.unwrap_err();
        assert_eq!(err, TodoError::NotFound(99));
    }

    #[tokio::test]
    async fn test_delete_twice_second_fails() {
        let service = TodoService::new();
        let created = service
            .create(NewTodo {
                title: "ephemeral".into(),
                description: None,
            })
            .await;

        let deleted = service.delete(created.id).await.unwrap();
        assert!(deleted.success);
        assert_eq!(deleted.id, created.id);

        let err = service.delete(created.id).await.unwrap_err();
        assert_eq!(err, TodoError::NotFound(created.id));
    }

    #[test]
    fn test_todo_serializes_camel_case() {
        let todo = Todo {
            id: 1,
            title: "t".into(),
            description: String::new(),
            completed: false,
            created_at: Utc::now(),
        };
        let value = serde_json::to_value(&todo).unwrap();
        assert!(value.get("createdAt").is_some());
        assert!(value["createdAt"].as_str().unwrap().contains('T'));
    }
}
