//! In-memory engine used by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use searchdata::transport::{EngineRequest, EngineResponse, EngineTransport};
use searchdata::{DocumentStore, ElasticSearchConfig, Error, Result};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Replays scripted responses in order and records every request.
#[derive(Default)]
pub struct MockEngine {
    replies: Mutex<VecDeque<Result<EngineResponse>>>,
    requests: Mutex<Vec<EngineRequest>>,
}

impl MockEngine {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn reply(&self, status: u16, body: impl Into<String>) -> &Self {
        self.replies
            .lock()
            .unwrap()
            .push_back(Ok(EngineResponse::new(status, body)));
        self
    }

    pub fn fail(&self, error: Error) -> &Self {
        self.replies.lock().unwrap().push_back(Err(error));
        self
    }

    pub fn requests(&self) -> Vec<EngineRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last_request(&self) -> EngineRequest {
        self.requests().pop().expect("no request was sent")
    }
}

#[async_trait]
impl EngineTransport for MockEngine {
    async fn send(&self, request: EngineRequest) -> Result<EngineResponse> {
        self.requests.lock().unwrap().push(request);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(EngineResponse::new(500, "no scripted reply")))
    }
}

pub fn store(engine: &Arc<MockEngine>) -> DocumentStore {
    store_with(ElasticSearchConfig::default(), engine)
}

pub fn store_with(config: ElasticSearchConfig, engine: &Arc<MockEngine>) -> DocumentStore {
    let transport: Arc<dyn EngineTransport> = engine.clone();
    DocumentStore::with_transport(config, transport)
}
