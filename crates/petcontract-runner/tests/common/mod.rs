//! In-process pet store for integration tests.
//!
//! Serves the four endpoints the suite talks to from an axum router on a
//! background tokio runtime. [`Faults`] switches on deliberately broken
//! behaviour so each failure category can be provoked.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, mpsc};

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use serde_json::{Value, json};

pub const SUCCESS_MESSAGE: &str = "Order and pet status updated successfully";

/// Deliberate misbehaviour; all off is a conforming store.
#[derive(Debug, Clone, Copy, Default)]
pub struct Faults {
    /// GET /pets/{id} drops the required `name` field
    pub pet_without_name: bool,
    /// 404 bodies do not mention "not found"
    pub vague_not_found: bool,
    /// findByStatus ignores the status filter
    pub unfiltered_find: bool,
    /// POST /store/order answers 200 instead of 201
    pub create_returns_200: bool,
    /// PATCH /store/order/{id} reports success but leaves the pet untouched
    pub patch_skips_pet: bool,
    /// PATCH /store/order/{id} updates everything but answers a different message
    pub wrong_patch_message: bool,
}

struct Store {
    pets: BTreeMap<i64, Value>,
    orders: BTreeMap<i64, Value>,
    next_order_id: i64,
    faults: Faults,
}

impl Store {
    fn seeded(faults: Faults) -> Self {
        let pets = [
            json!({"id": 1, "name": "snowball", "type": "cat", "status": "available"}),
            json!({"id": 2, "name": "flippy", "type": "fish", "status": "available"}),
            json!({"id": 3, "name": "rex", "type": "dog", "status": "pending"}),
            json!({"id": 4, "name": "goldie", "type": "fish", "status": "sold"}),
        ];
        Self {
            pets: pets
                .into_iter()
                .map(|p| (p["id"].as_i64().unwrap(), p))
                .collect(),
            orders: BTreeMap::new(),
            next_order_id: 1,
            faults,
        }
    }

    fn render_pet(&self, pet: &Value) -> Value {
        let mut pet = pet.clone();
        if self.faults.pet_without_name {
            if let Some(fields) = pet.as_object_mut() {
                fields.remove("name");
            }
        }
        pet
    }

    fn not_found(&self, what: &str) -> Response {
        let message = if self.faults.vague_not_found {
            "No such resource".to_string()
        } else {
            format!("{what} not found")
        };
        (StatusCode::NOT_FOUND, Json(json!({ "message": message }))).into_response()
    }
}

type Shared = Arc<Mutex<Store>>;

/// Start a store on an ephemeral port; returns its base URL.
///
/// The server lives until the test process exits.
pub fn spawn(faults: Faults) -> String {
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .unwrap();
        runtime.block_on(async move {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            tx.send(listener.local_addr().unwrap()).unwrap();
            axum::serve(listener, router(faults)).await.unwrap();
        });
    });
    format!("http://{}", rx.recv().unwrap())
}

fn router(faults: Faults) -> Router {
    Router::new()
        .route("/pets/findByStatus", get(find_by_status))
        .route("/pets/{id}", get(get_pet))
        .route("/store/order", post(create_order))
        .route("/store/order/{id}", patch(update_order))
        .with_state(Arc::new(Mutex::new(Store::seeded(faults))))
}

async fn get_pet(State(store): State<Shared>, Path(id): Path<String>) -> Response {
    let store = store.lock().unwrap();
    match id.parse::<i64>().ok().and_then(|id| store.pets.get(&id)) {
        Some(pet) => Json(store.render_pet(pet)).into_response(),
        None => store.not_found(&format!("Pet with ID {id}")),
    }
}

async fn find_by_status(
    State(store): State<Shared>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let store = store.lock().unwrap();
    let Some(status) = params.get("status") else {
        return (StatusCode::BAD_REQUEST, Json(json!({"message": "status is required"})))
            .into_response();
    };
    let pets: Vec<Value> = store
        .pets
        .values()
        .filter(|p| store.faults.unfiltered_find || p["status"] == status.as_str())
        .map(|p| store.render_pet(p))
        .collect();
    Json(pets).into_response()
}

async fn create_order(State(store): State<Shared>, Json(body): Json<Value>) -> Response {
    let mut store = store.lock().unwrap();
    let Some(pet_id) = body["pet_id"].as_i64() else {
        return (StatusCode::BAD_REQUEST, Json(json!({"message": "pet_id is required"})))
            .into_response();
    };
    match store.pets.get(&pet_id) {
        None => return store.not_found(&format!("Pet with ID {pet_id}")),
        Some(pet) if pet["status"] != "available" => {
            return (StatusCode::BAD_REQUEST, Json(json!({"message": "Pet is not available"})))
                .into_response();
        }
        Some(_) => {}
    }

    let id = store.next_order_id;
    store.next_order_id += 1;
    let order = json!({"id": id, "pet_id": pet_id, "status": "pending"});
    store.orders.insert(id, order.clone());

    let status = if store.faults.create_returns_200 {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    (status, Json(order)).into_response()
}

async fn update_order(
    State(store): State<Shared>,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Response {
    let mut store = store.lock().unwrap();
    let Some(status) = body["status"].as_str().map(str::to_string) else {
        return (StatusCode::BAD_REQUEST, Json(json!({"message": "status is required"})))
            .into_response();
    };
    let Some(order) = store.orders.get_mut(&id) else {
        return store.not_found(&format!("Order with ID {id}"));
    };
    order["status"] = json!(status);
    let pet_id = order["pet_id"].as_i64().unwrap();

    if !store.faults.patch_skips_pet {
        if let Some(pet) = store.pets.get_mut(&pet_id) {
            pet["status"] = json!(status);
        }
    }
    let message = if store.faults.wrong_patch_message {
        "Order updated"
    } else {
        SUCCESS_MESSAGE
    };
    Json(json!({ "message": message })).into_response()
}
