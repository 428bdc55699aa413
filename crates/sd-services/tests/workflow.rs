//! End-to-end application workflow tests against the in-memory stores

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use sd_core::error::SdError;
use sd_core::pagination::{Page, PaginationParams};
use sd_core::traits::Id;
use sd_db::{
    ApplicationStore, MemoryApplicationStore, MemoryToolStore, RepositoryError, RepositoryResult,
};
use sd_models::{
    Actor, Application, ApplicationFilter, ApplicationStatus, CompletionInput, NewApplication,
    NewTool, StatusCounts, Tool, UsedTool,
};
use sd_notifications::Notifier;
use sd_services::{ApplicationWorkflow, FixedClock, ToolStockLedger};

struct Desk {
    workflow: ApplicationWorkflow,
    tools: ToolStockLedger,
}

fn desk() -> Desk {
    desk_with(Arc::new(MemoryApplicationStore::new()))
}

fn desk_with(store: Arc<dyn ApplicationStore>) -> Desk {
    let tools = ToolStockLedger::new(Arc::new(MemoryToolStore::new()));
    let workflow = ApplicationWorkflow::new(store, tools.clone(), Notifier::disabled());
    Desk { workflow, tools }
}

fn filer() -> Actor {
    Actor::user(100, "Dilnoza")
}

fn admin() -> Actor {
    Actor::admin(1, "Admin")
}

fn technicians() -> Vec<Actor> {
    vec![Actor::employee(21, "Aziz"), Actor::employee(22, "Malika")]
}

fn new_application() -> NewApplication {
    NewApplication {
        branch_id: 1,
        department_id: 4,
        room: "301".into(),
        issue: "Network port is dead".into(),
        issue_comment: None,
        additional_comment: None,
        inventory_id: None,
    }
}

async fn stock(desk: &Desk, quantity: i64) -> Tool {
    desk.tools
        .create(NewTool {
            name: "RJ45 connector".into(),
            tool_number: "RJ-45".into(),
            serial: None,
            quantity,
            tags: vec![],
        })
        .await
        .unwrap()
}

/// Filed, assigned to two technicians and started
async fn in_progress(desk: &Desk) -> Application {
    let app = desk
        .workflow
        .create(new_application(), vec![], &filer())
        .await
        .unwrap();
    desk.workflow
        .assign(app.id, technicians(), Utc::now() + Duration::days(2), &admin())
        .await
        .unwrap();
    desk.workflow
        .update_status(app.id, ApplicationStatus::InProgress, &technicians()[0], None)
        .await
        .unwrap()
}

fn completion(tool: Id, quantity: i64) -> CompletionInput {
    CompletionInput {
        work_done: "Re-crimped the cable".into(),
        used_tools: vec![UsedTool::new(tool, quantity)],
        other_tools: Some("Crimping tool".into()),
    }
}

fn assert_history_consistent(app: &Application) {
    assert_eq!(app.history.last().map(|e| e.status), Some(app.status));
}

#[tokio::test]
async fn history_tracks_status_after_every_operation() {
    let desk = desk();
    let tool = stock(&desk, 5).await;

    let app = desk
        .workflow
        .create(new_application(), vec![], &filer())
        .await
        .unwrap();
    let mut lengths = vec![app.history.len()];
    assert_history_consistent(&app);

    let app = desk
        .workflow
        .assign(app.id, technicians(), Utc::now() + Duration::days(1), &admin())
        .await
        .unwrap();
    lengths.push(app.history.len());
    assert_history_consistent(&app);
    assert_eq!(app.status, ApplicationStatus::Accepted);
    assert_eq!(app.assigned_to, vec![21, 22]);

    let app = desk
        .workflow
        .update_status(app.id, ApplicationStatus::InProgress, &technicians()[0], None)
        .await
        .unwrap();
    lengths.push(app.history.len());
    assert_history_consistent(&app);
    assert_eq!(
        app.history.last().unwrap().comment,
        "Status changed by Aziz"
    );

    let app = desk
        .workflow
        .extend_deadline(
            app.id,
            Utc::now() + Duration::days(5),
            Some("Waiting for parts".into()),
            &technicians()[0],
        )
        .await
        .unwrap();
    lengths.push(app.history.len());
    assert_history_consistent(&app);

    let app = desk
        .workflow
        .complete(app.id, completion(tool.id, 1), vec![], &technicians()[1])
        .await
        .unwrap();
    lengths.push(app.history.len());
    assert_history_consistent(&app);

    assert!(lengths.windows(2).all(|w| w[0] < w[1]), "{:?}", lengths);
}

#[tokio::test]
async fn rejection_requires_a_comment() {
    let desk = desk();
    let app = desk
        .workflow
        .create(new_application(), vec![], &filer())
        .await
        .unwrap();

    for comment in [None, Some(String::new()), Some("   ".to_string())] {
        let err = desk
            .workflow
            .update_status(app.id, ApplicationStatus::Rejected, &admin(), comment)
            .await
            .unwrap_err();
        assert!(err.is_validation());
    }
    let unchanged = desk.workflow.find(app.id).await.unwrap();
    assert_eq!(unchanged.history.len(), 1);

    let app = desk
        .workflow
        .update_status(
            app.id,
            ApplicationStatus::Rejected,
            &admin(),
            Some("Duplicate of 00003-2026".into()),
        )
        .await
        .unwrap();
    assert_eq!(app.status, ApplicationStatus::Rejected);
    assert_eq!(app.history.last().unwrap().comment, "Duplicate of 00003-2026");
}

#[tokio::test]
async fn rejection_is_open_from_every_non_terminal_status() {
    let desk = desk();

    let accepted = desk
        .workflow
        .create(new_application(), vec![], &filer())
        .await
        .unwrap();
    desk.workflow
        .assign(accepted.id, technicians(), Utc::now(), &admin())
        .await
        .unwrap();

    let overdue = in_progress(&desk).await;
    desk.workflow
        .update_status(overdue.id, ApplicationStatus::Overdue, &admin(), None)
        .await
        .unwrap();

    let started = in_progress(&desk).await;

    for id in [accepted.id, overdue.id, started.id] {
        let app = desk
            .workflow
            .update_status(id, ApplicationStatus::Rejected, &admin(), Some("Out of scope".into()))
            .await
            .unwrap();
        assert_eq!(app.status, ApplicationStatus::Rejected);
    }
}

#[tokio::test]
async fn terminal_applications_stay_terminal() {
    let desk = desk();
    let app = desk
        .workflow
        .create(new_application(), vec![], &filer())
        .await
        .unwrap();
    desk.workflow
        .update_status(app.id, ApplicationStatus::Rejected, &admin(), Some("Spam".into()))
        .await
        .unwrap();

    for status in [ApplicationStatus::Accepted, ApplicationStatus::InProgress] {
        let err = desk
            .workflow
            .update_status(app.id, status, &admin(), None)
            .await
            .unwrap_err();
        assert!(err.is_invalid_transition());
    }
    let err = desk
        .workflow
        .assign(app.id, technicians(), Utc::now(), &admin())
        .await
        .unwrap_err();
    assert!(err.is_invalid_transition());
}

#[tokio::test]
async fn completed_is_only_reachable_through_complete() {
    let desk = desk();
    let app = in_progress(&desk).await;
    let err = desk
        .workflow
        .update_status(app.id, ApplicationStatus::Completed, &admin(), None)
        .await
        .unwrap_err();
    assert!(err.is_invalid_transition());
}

#[tokio::test]
async fn extend_deadline_and_complete_require_in_progress() {
    let desk = desk();
    let tool = stock(&desk, 5).await;

    let app = desk
        .workflow
        .create(new_application(), vec![], &filer())
        .await
        .unwrap();
    let reason = Some("Waiting for parts".to_string());

    // new
    let err = desk
        .workflow
        .extend_deadline(app.id, Utc::now(), reason.clone(), &admin())
        .await
        .unwrap_err();
    assert!(err.is_invalid_transition());
    assert_eq!(desk.workflow.find(app.id).await.unwrap().deadline, None);

    let mut ids = vec![app.id];

    // accepted
    let accepted = desk
        .workflow
        .create(new_application(), vec![], &filer())
        .await
        .unwrap();
    desk.workflow
        .assign(accepted.id, technicians(), Utc::now(), &admin())
        .await
        .unwrap();
    ids.push(accepted.id);

    // overdue
    let overdue = in_progress(&desk).await;
    desk.workflow
        .update_status(overdue.id, ApplicationStatus::Overdue, &admin(), None)
        .await
        .unwrap();
    ids.push(overdue.id);

    // rejected
    let rejected = desk
        .workflow
        .create(new_application(), vec![], &filer())
        .await
        .unwrap();
    desk.workflow
        .update_status(rejected.id, ApplicationStatus::Rejected, &admin(), Some("No".into()))
        .await
        .unwrap();
    ids.push(rejected.id);

    // completed
    let completed = in_progress(&desk).await;
    desk.workflow
        .complete(completed.id, completion(tool.id, 1), vec![], &admin())
        .await
        .unwrap();
    ids.push(completed.id);

    for id in ids {
        let before = desk.workflow.find(id).await.unwrap();
        let err = desk
            .workflow
            .extend_deadline(id, Utc::now() + Duration::days(9), reason.clone(), &admin())
            .await
            .unwrap_err();
        assert!(err.is_invalid_transition(), "extend on {}", before.status);

        let err = desk
            .workflow
            .complete(id, completion(tool.id, 1), vec![], &admin())
            .await
            .unwrap_err();
        assert!(err.is_invalid_transition(), "complete on {}", before.status);

        let after = desk.workflow.find(id).await.unwrap();
        assert_eq!(after.deadline, before.deadline);
        assert_eq!(after.history.len(), before.history.len());
    }
    assert_eq!(desk.tools.find(tool.id).await.unwrap().written_off, 1);
}

#[tokio::test]
async fn deadline_extension_records_old_and_new_deadline() {
    let desk = desk();
    let app = in_progress(&desk).await;
    let old = app.deadline.unwrap();
    let new = old + Duration::days(3);

    let err = desk
        .workflow
        .extend_deadline(app.id, new, None, &admin())
        .await
        .unwrap_err();
    assert!(err.is_validation());

    let app = desk
        .workflow
        .extend_deadline(app.id, new, Some("Supplier delay".into()), &admin())
        .await
        .unwrap();
    assert_eq!(app.deadline, Some(new));
    assert_eq!(app.status, ApplicationStatus::InProgress);
    assert_eq!(
        app.history.last().unwrap().comment,
        format!(
            "Deadline extended from {} to {}. Reason: Supplier delay",
            old.to_rfc3339(),
            new.to_rfc3339()
        )
    );
}

#[tokio::test]
async fn index_sequence_per_year() {
    let store: Arc<dyn ApplicationStore> = Arc::new(MemoryApplicationStore::new());
    let tools = ToolStockLedger::new(Arc::new(MemoryToolStore::new()));
    let in_year = |year: i32| {
        ApplicationWorkflow::new(store.clone(), tools.clone(), Notifier::disabled()).with_clock(
            Arc::new(FixedClock(Utc.with_ymd_and_hms(year, 6, 15, 12, 0, 0).unwrap())),
        )
    };

    let workflow_2025 = in_year(2025);
    let first = workflow_2025
        .create(new_application(), vec![], &filer())
        .await
        .unwrap();
    assert_eq!(first.index, "00001-2025");
    for _ in 0..41 {
        workflow_2025
            .create(new_application(), vec![], &filer())
            .await
            .unwrap();
    }
    let next = workflow_2025
        .create(new_application(), vec![], &filer())
        .await
        .unwrap();
    assert_eq!(next.index, "00043-2025");

    let next_year = in_year(2026)
        .create(new_application(), vec![], &filer())
        .await
        .unwrap();
    assert_eq!(next_year.index, "00001-2026");
}

#[tokio::test]
async fn workflow_timestamps_come_from_the_clock() {
    let at = Utc.with_ymd_and_hms(2025, 11, 3, 8, 30, 0).unwrap();
    let tools = ToolStockLedger::new(Arc::new(MemoryToolStore::new()));
    let desk = Desk {
        workflow: ApplicationWorkflow::new(
            Arc::new(MemoryApplicationStore::new()),
            tools.clone(),
            Notifier::disabled(),
        )
        .with_clock(Arc::new(FixedClock(at))),
        tools,
    };
    let tool = stock(&desk, 5).await;
    let app = in_progress(&desk).await;
    assert_eq!(app.created_at, at);

    let app = desk
        .workflow
        .complete(app.id, completion(tool.id, 1), vec![], &admin())
        .await
        .unwrap();
    assert_eq!(app.history.len(), 4);
    assert!(app.history.iter().all(|entry| entry.changed_at == at));
    assert_eq!(app.completion_report.unwrap().completed_at, at);
}

#[tokio::test]
async fn concurrent_creation_yields_distinct_indexes() {
    let desk = desk();
    let filer = filer();
    let creations = (0..20).map(|_| desk.workflow.create(new_application(), vec![], &filer));
    let created = futures::future::join_all(creations).await;

    let mut indexes: Vec<String> = created.into_iter().map(|r| r.unwrap().index).collect();
    indexes.sort();
    indexes.dedup();
    assert_eq!(indexes.len(), 20);
}

#[tokio::test]
async fn over_deduction_fails_completion_without_side_effects() {
    let desk = desk();
    let tool = stock(&desk, 5).await;
    let app = in_progress(&desk).await;

    let err = desk
        .workflow
        .complete(app.id, completion(tool.id, 10), vec![], &technicians()[0])
        .await
        .unwrap_err();
    assert!(err.is_validation());
    assert!(err.to_string().contains("Available: 5, Requested: 10"));

    assert_eq!(desk.tools.find(tool.id).await.unwrap().written_off, 0);
    let app = desk.workflow.find(app.id).await.unwrap();
    assert_eq!(app.status, ApplicationStatus::InProgress);
    assert!(app.completion_report.is_none());
}

#[tokio::test]
async fn completion_writes_off_stock() {
    let desk = desk();
    let tool = stock(&desk, 5).await;
    let app = in_progress(&desk).await;

    let app = desk
        .workflow
        .complete(
            app.id,
            completion(tool.id, 3),
            vec!["/uploads/after.jpg".into()],
            &technicians()[0],
        )
        .await
        .unwrap();

    assert_eq!(app.status, ApplicationStatus::Completed);
    let report = app.completion_report.as_ref().unwrap();
    assert_eq!(report.used_tools, vec![UsedTool::new(tool.id, 3)]);
    assert_eq!(report.other_tools.as_deref(), Some("Crimping tool"));
    assert_eq!(report.images, vec!["/uploads/after.jpg".to_string()]);
    assert_eq!(report.completed_by, 21);
    assert_eq!(
        app.history.last().unwrap().comment,
        "Completed. Work done: Re-crimped the cable"
    );

    let tool = desk.tools.find(tool.id).await.unwrap();
    assert_eq!(tool.written_off, 3);
    assert_eq!(tool.available(), 2);
}

#[tokio::test]
async fn multi_tool_completion_is_all_or_nothing() {
    let desk = desk();
    let plenty = stock(&desk, 10).await;
    let scarce = desk
        .tools
        .create(NewTool {
            name: "Wall socket".into(),
            tool_number: "WS-1".into(),
            serial: None,
            quantity: 1,
            tags: vec![],
        })
        .await
        .unwrap();
    let app = in_progress(&desk).await;

    let input = CompletionInput {
        work_done: "Replaced socket".into(),
        used_tools: vec![UsedTool::new(plenty.id, 4), UsedTool::new(scarce.id, 2)],
        other_tools: None,
    };
    let err = desk
        .workflow
        .complete(app.id, input, vec![], &admin())
        .await
        .unwrap_err();
    assert!(matches!(err, SdError::InsufficientStock { ref tool, .. } if tool == "Wall socket"));

    assert_eq!(desk.tools.find(plenty.id).await.unwrap().written_off, 0);
    assert_eq!(desk.tools.find(scarce.id).await.unwrap().written_off, 0);
}

#[tokio::test]
async fn repeated_tool_lines_are_merged() {
    let desk = desk();
    let tool = stock(&desk, 5).await;
    let app = in_progress(&desk).await;

    let input = CompletionInput {
        work_done: "Two ports".into(),
        used_tools: vec![UsedTool::new(tool.id, 3), UsedTool::new(tool.id, 3)],
        other_tools: None,
    };
    let err = desk
        .workflow
        .complete(app.id, input, vec![], &admin())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Available: 5, Requested: 6"));

    let input = CompletionInput {
        work_done: "Two ports".into(),
        used_tools: vec![UsedTool::new(tool.id, 2), UsedTool::new(tool.id, 1)],
        other_tools: None,
    };
    let app = desk
        .workflow
        .complete(app.id, input, vec![], &admin())
        .await
        .unwrap();
    assert_eq!(
        app.completion_report.unwrap().used_tools,
        vec![UsedTool::new(tool.id, 3)]
    );
}

#[tokio::test]
async fn concurrent_completions_never_oversell() {
    let desk = desk();
    let tool = stock(&desk, 5).await;
    let first = in_progress(&desk).await;
    let second = in_progress(&desk).await;

    let admin = admin();
    let (a, b) = futures::join!(
        desk.workflow
            .complete(first.id, completion(tool.id, 3), vec![], &admin),
        desk.workflow
            .complete(second.id, completion(tool.id, 3), vec![], &admin),
    );

    assert_eq!(a.is_ok() as u8 + b.is_ok() as u8, 1);
    let tool = desk.tools.find(tool.id).await.unwrap();
    assert_eq!(tool.written_off, 3);
    assert!(tool.available() >= 0);
}

#[tokio::test]
async fn assignment_replaces_employees_and_records_the_caller() {
    let desk = desk();
    let app = desk
        .workflow
        .create(new_application(), vec![], &filer())
        .await
        .unwrap();
    let deadline = Utc.with_ymd_and_hms(2026, 5, 1, 18, 0, 0).unwrap();

    let app = desk
        .workflow
        .assign(app.id, technicians(), deadline, &admin())
        .await
        .unwrap();
    let entry = app.history.last().unwrap();
    assert_eq!(entry.changed_by, 1);
    assert_eq!(
        entry.comment,
        "Assigned to Aziz, Malika, deadline: 2026-05-01T18:00:00+00:00"
    );

    let app = desk
        .workflow
        .assign(app.id, vec![Actor::employee(23, "Timur")], deadline, &admin())
        .await
        .unwrap();
    assert_eq!(app.assigned_to, vec![23]);
    assert_eq!(app.status, ApplicationStatus::Accepted);

    let err = desk
        .workflow
        .assign(app.id, vec![], deadline, &admin())
        .await
        .unwrap_err();
    assert!(err.is_validation());
}

#[tokio::test]
async fn missing_application_is_not_found() {
    let desk = desk();
    let err = desk
        .workflow
        .assign(77, technicians(), Utc::now(), &admin())
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    let err = desk
        .workflow
        .update_status(77, ApplicationStatus::InProgress, &admin(), None)
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

/// Application store whose updates can be made to fail
struct FlakyStore {
    inner: MemoryApplicationStore,
    fail_updates: AtomicBool,
}

#[async_trait]
impl ApplicationStore for FlakyStore {
    async fn insert_with_next_index(
        &self,
        year: i32,
        draft: Application,
    ) -> RepositoryResult<Application> {
        self.inner.insert_with_next_index(year, draft).await
    }

    async fn find_by_id(&self, id: Id) -> RepositoryResult<Option<Application>> {
        self.inner.find_by_id(id).await
    }

    async fn update(&self, application: &Application) -> RepositoryResult<Application> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(RepositoryError::stale("Application", application.id));
        }
        self.inner.update(application).await
    }

    async fn list(
        &self,
        filter: &ApplicationFilter,
        pagination: PaginationParams,
    ) -> RepositoryResult<Page<Application>> {
        self.inner.list(filter, pagination).await
    }

    async fn count_by_status(&self, filter: &ApplicationFilter) -> RepositoryResult<StatusCounts> {
        self.inner.count_by_status(filter).await
    }
}

#[tokio::test]
async fn failed_save_gives_the_stock_back() {
    let store = Arc::new(FlakyStore {
        inner: MemoryApplicationStore::new(),
        fail_updates: AtomicBool::new(false),
    });
    let desk = desk_with(store.clone());
    let tool = stock(&desk, 5).await;
    let app = in_progress(&desk).await;

    store.fail_updates.store(true, Ordering::SeqCst);
    let err = desk
        .workflow
        .complete(app.id, completion(tool.id, 3), vec![], &admin())
        .await
        .unwrap_err();
    assert!(matches!(err, SdError::Conflict { .. }));

    let tool = desk.tools.find(tool.id).await.unwrap();
    assert_eq!(tool.written_off, 0);
    assert_eq!(tool.history.len(), 2);
}
