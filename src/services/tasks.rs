//! # 할 일 목록 관리자 (Task Collection Manager)
//!
//! 세션 레코드 안의 `tasks` 목록에 대한 CRUD입니다.
//!
//! 두 층으로 나뉩니다:
//! - 순수 함수(`validate`, `append`, `toggle_in`, `remove_from`): 레코드만 다룸
//! - `TaskManager`: 저장소에서 레코드를 읽고, 순수 함수를 적용하고, 저장
//!
//! 검증 실패와 not-found는 여기서 바로 `AppError`로 보고합니다.

use chrono::{DateTime, Utc};

use crate::{
    error::AppError,
    models::{CreateTaskRequest, NewTask, SessionRecord, Task},
    store::SessionStore,
};

/// 생성 요청을 검증합니다. 제목이 없거나 공백뿐이면 `Validation`.
///
/// 공백 검사에만 trim을 쓰고, 제목은 클라이언트가 보낸 그대로 저장합니다.
pub fn validate(req: CreateTaskRequest) -> Result<NewTask, AppError> {
    let title = req
        .title
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| AppError::Validation("Title is required".to_string()))?;

    Ok(NewTask {
        title,
        description: req.description,
        priority: req.priority,
    })
}

/// 새 할 일을 목록 끝에 추가하고 그 사본을 돌려줍니다.
pub fn append(record: &mut SessionRecord, input: NewTask, now: DateTime<Utc>) -> Task {
    let task = Task::new(input, now);
    record.tasks.push(task.clone());
    task
}

/// `completed`를 뒤집습니다.
pub fn toggle_in(record: &mut SessionRecord, id: &str) -> Result<Task, AppError> {
    let task = record
        .tasks
        .iter_mut()
        .find(|t| t.id == id)
        .ok_or_else(task_not_found)?;
    task.completed = !task.completed;
    Ok(task.clone())
}

/// 일치하는 할 일을 지웁니다. 성공하면 목록 길이가 정확히 1 줄어듭니다.
pub fn remove_from(record: &mut SessionRecord, id: &str) -> Result<(), AppError> {
    let index = record
        .tasks
        .iter()
        .position(|t| t.id == id)
        .ok_or_else(task_not_found)?;
    record.tasks.remove(index);
    Ok(())
}

fn task_not_found() -> AppError {
    AppError::NotFound("Task not found".to_string())
}

fn no_tasks() -> AppError {
    AppError::NotFound("No tasks found".to_string())
}

/// 저장소에 붙은 할 일 관리자
pub struct TaskManager<'a> {
    store: &'a SessionStore,
}

impl<'a> TaskManager<'a> {
    pub fn new(store: &'a SessionStore) -> Self {
        Self { store }
    }

    /// 생성 순서대로 정렬된 할 일 목록. 레코드가 없으면 빈 레코드를 만들어 저장합니다.
    pub async fn list(&self, session_id: &str) -> Result<Vec<Task>, AppError> {
        let record = self.store.load_or_init(session_id).await?;
        self.store.save(&record).await?;
        Ok(record.tasks)
    }

    /// 검증이 저장소보다 먼저입니다. 실패하면 아무것도 저장하지 않습니다.
    pub async fn create(&self, session_id: &str, req: CreateTaskRequest) -> Result<Task, AppError> {
        let input = validate(req)?;
        let mut record = self.store.load_or_init(session_id).await?;
        let task = append(&mut record, input, Utc::now());
        self.store.save(&record).await?;
        tracing::debug!(task_id = %task.id, "Task created");
        Ok(task)
    }

    pub async fn toggle(&self, session_id: &str, id: &str) -> Result<Task, AppError> {
        let mut record = self.store.load(session_id).await?.ok_or_else(no_tasks)?;
        let task = toggle_in(&mut record, id)?;
        self.store.save(&record).await?;
        Ok(task)
    }

    pub async fn remove(&self, session_id: &str, id: &str) -> Result<(), AppError> {
        let mut record = self.store.load(session_id).await?.ok_or_else(no_tasks)?;
        remove_from(&mut record, id)?;
        self.store.save(&record).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;

    use super::*;
    use crate::{config::Config, models::Priority, store::MemoryTransport};

    async fn store() -> SessionStore {
        SessionStore::connect(
            Arc::new(MemoryTransport::new()),
            Config::default().store_options(),
        )
        .await
    }

    fn titled(title: &str) -> CreateTaskRequest {
        CreateTaskRequest {
            title: Some(title.to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn list_is_idempotent_and_initializes_record() {
        let store = store().await;
        let tasks = TaskManager::new(&store);
        tasks.create("s", titled("a")).await.unwrap();
        tasks.create("s", titled("b")).await.unwrap();

        let first = tasks.list("s").await.unwrap();
        let second = tasks.list("s").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.iter().map(|t| t.title.as_str()).collect::<Vec<_>>(), ["a", "b"]);

        assert!(tasks.list("brand-new").await.unwrap().is_empty());
        assert!(store.load("brand-new").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn created_ids_are_pairwise_distinct() {
        let store = store().await;
        let tasks = TaskManager::new(&store);
        for i in 0..25 {
            tasks.create("s", titled(&format!("task {}", i))).await.unwrap();
        }

        let listed = tasks.list("s").await.unwrap();
        let ids: HashSet<_> = listed.iter().map(|t| t.id.clone()).collect();
        assert_eq!(listed.len(), 25);
        assert_eq!(ids.len(), 25);
    }

    #[tokio::test]
    async fn create_applies_defaults() {
        let store = store().await;
        let task = TaskManager::new(&store).create("s", titled("Buy milk")).await.unwrap();
        assert_eq!(task.priority, Priority::Medium);
        assert_eq!(task.description, "");
        assert!(!task.completed);
    }

    #[test]
    fn title_is_kept_as_sent() {
        let input = validate(titled("  Buy milk  ")).unwrap();
        assert_eq!(input.title, "  Buy milk  ");
    }

    #[tokio::test]
    async fn toggle_twice_restores_completed() {
        let store = store().await;
        let tasks = TaskManager::new(&store);
        let task = tasks.create("s", titled("x")).await.unwrap();

        assert!(tasks.toggle("s", &task.id).await.unwrap().completed);
        assert!(!tasks.toggle("s", &task.id).await.unwrap().completed);
        assert!(!tasks.list("s").await.unwrap()[0].completed);
    }

    #[tokio::test]
    async fn remove_shrinks_list_by_one() {
        let store = store().await;
        let tasks = TaskManager::new(&store);
        let keep = tasks.create("s", titled("keep")).await.unwrap();
        let gone = tasks.create("s", titled("gone")).await.unwrap();

        tasks.remove("s", &gone.id).await.unwrap();
        let listed = tasks.list("s").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, keep.id);
    }

    #[tokio::test]
    async fn empty_or_missing_title_is_rejected_without_saving() {
        let store = store().await;
        let tasks = TaskManager::new(&store);

        for req in [titled(""), titled("   "), CreateTaskRequest::default()] {
            let err = tasks.create("s", req).await.unwrap_err();
            assert!(matches!(err, AppError::Validation(_)));
        }
        assert!(store.load("s").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unknown_ids_are_not_found_and_leave_list_unchanged() {
        let store = store().await;
        let tasks = TaskManager::new(&store);

        // 레코드가 아예 없는 경우
        assert!(matches!(
            tasks.toggle("s", "nonexistent").await,
            Err(AppError::NotFound(_))
        ));
        assert!(store.load("s").await.unwrap().is_none());

        tasks.create("s", titled("x")).await.unwrap();
        let before = tasks.list("s").await.unwrap();
        assert!(matches!(
            tasks.toggle("s", "nonexistent").await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            tasks.remove("s", "nonexistent").await,
            Err(AppError::NotFound(_))
        ));
        assert_eq!(tasks.list("s").await.unwrap(), before);
    }

    #[tokio::test]
    async fn sessions_do_not_share_tasks() {
        let store = store().await;
        let tasks = TaskManager::new(&store);
        tasks.create("alice", titled("mine")).await.unwrap();
        assert!(tasks.list("bob").await.unwrap().is_empty());
    }
}
