// web-server/src/detection_registry.rs
use actix::{Actor, Context, Handler, Message, MessageResult};
use dashmap::DashMap;
use roadnet_common::models::detection::DetectionRecord;
use std::sync::Arc;
use uuid::Uuid;

/// Actor message: Store a detection result, replacing any record with the same id
#[derive(Message)]
#[rtype(result = "()")]
pub struct StoreDetection {
    pub record: DetectionRecord,
}

/// Actor message: Fetch a detection result by id
#[derive(Message)]
#[rtype(result = "Option<DetectionRecord>")]
pub struct GetDetection {
    pub id: Uuid,
}

/// In-memory store for the crack-detection demo.
/// Records live only as long as the process; last write wins.
#[derive(Default)]
pub struct DetectionRegistryActor {
    records: Arc<DashMap<Uuid, DetectionRecord>>,
}

impl DetectionRegistryActor {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Actor for DetectionRegistryActor {
    type Context = Context<Self>;

    fn started(&mut self, _ctx: &mut Self::Context) {
        tracing::info!("DetectionRegistryActor started");
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        tracing::info!(
            "DetectionRegistryActor stopped, discarding {} results",
            self.records.len()
        );
    }
}

impl Handler<StoreDetection> for DetectionRegistryActor {
    type Result = ();

    fn handle(&mut self, msg: StoreDetection, _ctx: &mut Self::Context) -> Self::Result {
        let id = msg.record.id;
        if self.records.insert(id, msg.record).is_some() {
            tracing::debug!("Replaced detection result: {}", id);
        } else {
            tracing::debug!("Stored detection result: {}", id);
        }
    }
}

impl Handler<GetDetection> for DetectionRegistryActor {
    type Result = MessageResult<GetDetection>;

    fn handle(&mut self, msg: GetDetection, _ctx: &mut Self::Context) -> Self::Result {
        let record = self.records.get(&msg.id).map(|entry| entry.value().clone());
        if record.is_none() {
            tracing::debug!("Detection result not found: {}", msg.id);
        }
        MessageResult(record)
    }
}
