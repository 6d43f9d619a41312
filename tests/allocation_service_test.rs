mod common;

use std::sync::Arc;

use assert_matches::assert_matches;
use inventory_ledger::{
    client::{HttpInventoryClient, Session},
    errors::LedgerError,
    ledger::{RemovalState, RemovalStep, Selection},
    models::{Assembly, AssemblyDetail, AssemblyStatus},
    services::{AllocationService, AutoConfirm, Confirmation, Decline},
};
use serde_json::json;
use wiremock::{
    matchers::{body_json, method, path},
    Mock, MockServer, ResponseTemplate,
};

use common::{alias_link, bom_line};

const ASSEMBLY: i64 = 7;
const DETAIL_PATH: &str = "/api/assemblies/7/detail";

/// Four boards; part 11 can take 5 more, 12 has no stock, 13 is full, 14 can take 3.
fn detail() -> AssemblyDetail {
    let mut aliased = bom_line(11, 3, 7, 20);
    aliased.alias_id = Some(2);
    aliased.alias_name = Some("P11".into());
    AssemblyDetail {
        assembly: Assembly {
            id: ASSEMBLY,
            assembly_name: "Amp".into(),
            quantity_to_build: 4,
            status: AssemblyStatus::InProgress,
            description: None,
            version: None,
            create_date: None,
            update_date: None,
        },
        parts: vec![
            aliased,
            bom_line(12, 1, 0, 0),
            bom_line(13, 2, 8, 5),
            bom_line(14, 1, 1, 10),
        ],
    }
}

async fn backend() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(DETAIL_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(detail()))
        .mount(&server)
        .await;
    server
}

fn service(
    server: &MockServer,
    confirmation: impl Confirmation + 'static,
) -> AllocationService<HttpInventoryClient> {
    let session = Session::new(&server.uri()).expect("mock server url");
    AllocationService::new(
        Arc::new(HttpInventoryClient::new(session)),
        Arc::new(confirmation),
    )
}

fn line_path(part_id: i64, action: &str) -> String {
    format!("/api/assemblies/{}/bom/{}/{}", ASSEMBLY, part_id, action)
}

async fn requests(server: &MockServer) -> Vec<(String, String)> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .map(|r| (r.method.to_string(), r.url.path().to_string()))
        .collect()
}

#[tokio::test]
async fn removal_deallocates_full_amount_before_deleting() {
    let server = backend().await;
    Mock::given(method("PUT"))
        .and(path(line_path(11, "deallocate")))
        .and(body_json(json!({ "amount": 7 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(bom_line(11, 3, 0, 27)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/assemblies/7/bom/11"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = service(&server, AutoConfirm)
        .remove_line(&detail(), 11)
        .await
        .expect("removal runs");
    assert!(outcome.is_deleted());
    assert!(outcome.detail.is_some());

    let seen = requests(&server).await;
    let dealloc = seen
        .iter()
        .position(|(m, p)| m == "PUT" && p.ends_with("/deallocate"))
        .expect("deallocate sent");
    let delete = seen
        .iter()
        .position(|(m, _)| m == "DELETE")
        .expect("delete sent");
    assert!(dealloc < delete);
}

#[tokio::test]
async fn failed_deallocate_never_issues_the_delete() {
    let server = backend().await;
    Mock::given(method("PUT"))
        .and(path(line_path(11, "deallocate")))
        .respond_with(ResponseTemplate::new(500).set_body_string("database locked"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&server)
        .await;

    let outcome = service(&server, AutoConfirm)
        .remove_line(&detail(), 11)
        .await
        .expect("removal runs");
    assert_eq!(outcome.removal.state(), RemovalState::Failed);
    assert_eq!(outcome.removal.failed_at(), Some(RemovalStep::Deallocate));
    assert_eq!(outcome.removal.last_error(), Some("database locked"));
    assert!(!outcome.removal.pending_compensation());
    assert!(outcome.detail.is_some());
}

#[tokio::test]
async fn failed_delete_resumes_without_returning_stock_twice() {
    let server = backend().await;
    Mock::given(method("PUT"))
        .and(path(line_path(11, "deallocate")))
        .respond_with(ResponseTemplate::new(200).set_body_json(bom_line(11, 3, 0, 27)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/assemblies/7/bom/11"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({ "error": "busy" })))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/assemblies/7/bom/11"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let service = service(&server, AutoConfirm);
    let outcome = service
        .remove_line(&detail(), 11)
        .await
        .expect("removal runs");
    assert!(outcome.removal.pending_compensation());
    assert_eq!(outcome.removal.failed_at(), Some(RemovalStep::Delete));
    assert_eq!(outcome.removal.last_error(), Some("busy"));

    let resumed = service
        .resume_removal(outcome.removal)
        .await
        .expect("resume runs");
    assert!(resumed.is_deleted());
}

#[tokio::test]
async fn unallocated_line_is_deleted_directly() {
    let server = backend().await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/assemblies/7/bom/12"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = service(&server, AutoConfirm)
        .remove_line(&detail(), 12)
        .await
        .expect("removal runs");
    assert!(outcome.is_deleted());
}

#[tokio::test]
async fn auto_allocate_skips_lines_without_need_or_stock() {
    let server = backend().await;
    Mock::given(method("PUT"))
        .and(path(line_path(11, "allocate")))
        .and(body_json(json!({ "amount": 5 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(bom_line(11, 3, 12, 15)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path(line_path(14, "allocate")))
        .and(body_json(json!({ "amount": 3 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(bom_line(14, 1, 4, 7)))
        .expect(1)
        .mount(&server)
        .await;

    let resynced = service(&server, AutoConfirm)
        .auto_allocate(&detail(), &Selection::All)
        .await
        .expect("plan is not empty");
    let report = resynced.outcome.expect("batch ran");
    assert_eq!(report.attempted, 2);
    assert_eq!(report.succeeded, 2);
    assert!(report.is_success());

    let allocations: Vec<_> = requests(&server)
        .await
        .into_iter()
        .filter(|(m, _)| m == "PUT")
        .collect();
    assert_eq!(allocations.len(), 2);
    assert!(allocations
        .iter()
        .all(|(_, p)| !p.contains("/12/") && !p.contains("/13/")));
}

#[tokio::test]
async fn auto_allocate_reports_partial_failure() {
    let server = backend().await;
    Mock::given(method("PUT"))
        .and(path(line_path(11, "allocate")))
        .respond_with(ResponseTemplate::new(200).set_body_json(bom_line(11, 3, 12, 15)))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path(line_path(14, "allocate")))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(json!({ "error": "Requested 3 but only 2 in stock" })),
        )
        .mount(&server)
        .await;

    let resynced = service(&server, AutoConfirm)
        .auto_allocate(&detail(), &Selection::All)
        .await
        .expect("plan is not empty");
    assert!(resynced.detail.is_some());
    let report = resynced.outcome.expect("batch ran");
    assert_eq!(report.summary(), "1/2 failed");
    assert_eq!(
        report.failures,
        vec![(14, "Requested 3 but only 2 in stock".to_string())]
    );
}

#[tokio::test]
async fn auto_allocate_with_nothing_eligible_sends_nothing() {
    let server = backend().await;
    let err = service(&server, AutoConfirm)
        .auto_allocate(&detail(), &Selection::Parts(vec![12, 13]))
        .await
        .unwrap_err();
    assert_matches!(err, LedgerError::NothingToAllocate);
    assert!(requests(&server).await.is_empty());
}

#[tokio::test]
async fn out_of_range_amount_never_reaches_the_backend() {
    let server = backend().await;
    let service = service(&server, AutoConfirm);

    let err = service.allocate(&detail(), 11, Some(6)).await.unwrap_err();
    assert_matches!(
        err,
        LedgerError::OutOfRange { requested: 6, max: 5, .. }
    );
    let err = service.deallocate(&detail(), 11, Some(8)).await.unwrap_err();
    assert_matches!(err, LedgerError::OutOfRange { max: 7, .. });
    let err = service.allocate(&detail(), 11, Some(-1)).await.unwrap_err();
    assert!(err.is_client_side());

    assert!(requests(&server).await.is_empty());
}

#[tokio::test]
async fn declined_confirmation_sends_nothing() {
    let server = backend().await;
    let err = service(&server, Decline)
        .allocate(&detail(), 11, None)
        .await
        .unwrap_err();
    assert_matches!(err, LedgerError::Cancelled);
    assert!(requests(&server).await.is_empty());
}

#[tokio::test]
async fn default_allocation_is_the_maximum_and_prompt_states_it() {
    let server = backend().await;
    Mock::given(method("PUT"))
        .and(path(line_path(11, "allocate")))
        .and(body_json(json!({ "amount": 5 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(bom_line(11, 3, 12, 15)))
        .expect(1)
        .mount(&server)
        .await;

    let prompts = Arc::new(std::sync::Mutex::new(Vec::new()));
    let recorded = Arc::clone(&prompts);
    let confirm = move |prompt: &str| {
        recorded.lock().unwrap().push(prompt.to_string());
        true
    };

    let resynced = service(&server, confirm)
        .allocate(&detail(), 11, None)
        .await
        .expect("request sent");
    assert_eq!(resynced.into_result().unwrap(), 5);
    let prompts = prompts.lock().unwrap();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains('5'));
}

#[tokio::test]
async fn detail_is_refetched_after_a_rejected_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(DETAIL_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(detail()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path(line_path(11, "allocate")))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({ "error": "stale" })))
        .mount(&server)
        .await;

    let resynced = service(&server, AutoConfirm)
        .allocate(&detail(), 11, Some(5))
        .await
        .expect("request sent");
    assert!(!resynced.is_ok());
    assert!(resynced.detail.is_some());
    assert_matches!(
        resynced.outcome,
        Err(LedgerError::Http { status: 400, ref message }) if message == "stale"
    );
}

#[tokio::test]
async fn swap_requires_an_interchangeable_target() {
    let server = backend().await;
    Mock::given(method("GET"))
        .and(path("/api/aliases/2/links"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(vec![alias_link(1, 2, 11), alias_link(2, 2, 15)]),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/assemblies/7/bom/swap-quantity"))
        .and(body_json(json!({
            "source_part_id": 11,
            "target_part_id": 15,
            "swap_quantity": 1
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": "Swap completed",
            "returned_to_stock": 0,
            "target_created": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    let service = service(&server, AutoConfirm);
    let err = service.swap(&detail(), 11, 99, 1).await.unwrap_err();
    assert_matches!(err, LedgerError::Validation(_));
    let err = service.swap(&detail(), 11, 15, 4).await.unwrap_err();
    assert_matches!(err, LedgerError::OutOfRange { max: 3, .. });

    let resynced = service.swap(&detail(), 11, 15, 1).await.expect("sent");
    assert!(resynced.is_ok());

    let substitutes = service.substitutes(&detail(), 11).await.expect("links");
    assert_eq!(
        substitutes.iter().map(|l| l.part_id).collect::<Vec<_>>(),
        vec![15]
    );
}
