#![allow(dead_code)]

use std::net::SocketAddr;

use axum::{
    body::{self, Body},
    http::{Method, Request},
    response::Response,
    Router,
};
use inventory_ledger::{
    build_router,
    client::{HttpInventoryClient, Session},
    config::AppConfig,
    models::{AliasLink, AssemblyDetail, BomLine, Part},
    store::InventoryStore,
    AppState,
};
use serde_json::Value;
use tower::ServiceExt;

/// Ids assigned by `InventoryStore::seed_demo` on a fresh store.
pub const TIMER_BOARD: i64 = 1;
pub const RES_10K: i64 = 1;
pub const CAP_MURATA: i64 = 3;
pub const CAP_SAMSUNG: i64 = 4;
pub const NE555: i64 = 5;
pub const LM358: i64 = 6;

fn test_config() -> AppConfig {
    AppConfig {
        environment: "test".to_string(),
        cors_allow_any_origin: true,
        ..AppConfig::default()
    }
}

/// Router over a seeded in-memory store, driven with `oneshot`.
pub struct TestApp {
    router: Router,
    pub store: InventoryStore,
}

impl TestApp {
    pub async fn new() -> Self {
        let store = InventoryStore::new();
        store.seed_demo().await.expect("seed demo inventory");
        Self::with_store(store)
    }

    pub fn with_store(store: InventoryStore) -> Self {
        let state = AppState::new(store.clone(), test_config());
        let router = build_router(state).expect("router builds with permissive cors");
        Self { router, store }
    }

    pub async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        self.router
            .clone()
            .oneshot(builder.body(body).expect("request"))
            .await
            .expect("router response")
    }

    pub async fn detail(&self, assembly_id: i64) -> AssemblyDetail {
        self.store
            .assembly_detail(assembly_id)
            .await
            .expect("assembly detail")
    }

    pub async fn stock(&self, part_id: i64) -> i64 {
        self.store.get_part(part_id).await.expect("part").quantity
    }
}

pub async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}

/// A seeded backend listening on a random local port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub store: InventoryStore,
    _task: tokio::task::JoinHandle<()>,
}

impl TestServer {
    pub async fn spawn() -> Self {
        let store = InventoryStore::new();
        store.seed_demo().await.expect("seed demo inventory");
        let router = build_router(AppState::new(store.clone(), test_config()))
            .expect("router builds with permissive cors");

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("local addr");
        let task = tokio::spawn(async move {
            axum::serve(listener, router).await.expect("test server");
        });
        Self {
            addr,
            store,
            _task: task,
        }
    }

    pub fn client(&self) -> HttpInventoryClient {
        let session = Session::new(&format!("http://{}", self.addr))
            .expect("valid session url")
            .with_operator("tester");
        HttpInventoryClient::new(session)
    }
}

pub fn bom_line(part_id: i64, quantity_per: i64, allocated: i64, stock: i64) -> BomLine {
    BomLine {
        part_id,
        part_name: format!("P{}", part_id),
        reference: None,
        quantity_per,
        allocated_quantity: allocated,
        quantity: stock,
        package: None,
        alias_id: None,
        alias_name: None,
    }
}

pub fn alias_link(link_id: i64, alias_id: i64, part_id: i64) -> AliasLink {
    AliasLink {
        link_id,
        alias_id,
        part_id,
        part_name: format!("P{}", part_id),
        quantity: 0,
    }
}

pub fn part(id: i64, name: &str, quantity: i64) -> Part {
    Part {
        id,
        part_name: name.to_string(),
        quantity,
        manufacturer: None,
        description: None,
        package: None,
        category_large: None,
        location: None,
        price: None,
        memo: None,
        create_date: None,
        update_date: None,
    }
}
