// Common test utilities shared across test files

use async_trait::async_trait;
use modelfactory::{
    RequestDescriptor, Resource, ResourceOptions, Transport, TransportError, TransportResponse,
};
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Transport that records every request and answers with a canned response
pub struct MockTransport {
    requests: Mutex<Vec<RequestDescriptor>>,
    response: Mutex<Result<Value, TransportError>>,
    gate: Option<Semaphore>,
}

#[allow(dead_code)]
impl MockTransport {
    pub fn new(response: Value) -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            response: Mutex::new(Ok(response)),
            gate: None,
        }
    }

    pub fn failing(error: TransportError) -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            response: Mutex::new(Err(error)),
            gate: None,
        }
    }

    /// Requests block inside the transport until [`MockTransport::release`]
    pub fn gated(response: Value) -> Self {
        Self {
            gate: Some(Semaphore::new(0)),
            ..Self::new(response)
        }
    }

    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.add_permits(64);
        }
    }

    pub fn respond_with(&self, response: Result<Value, TransportError>) {
        *self.response.lock() = response;
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn requests(&self) -> Vec<RequestDescriptor> {
        self.requests.lock().clone()
    }

    pub fn last_request(&self) -> Option<RequestDescriptor> {
        self.requests.lock().last().cloned()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: RequestDescriptor) -> Result<TransportResponse, TransportError> {
        self.requests.lock().push(request);

        if let Some(gate) = &self.gate {
            let _permit = gate
                .acquire()
                .await
                .map_err(|_| TransportError::new("gate closed"))?;
        }

        let response = self.response.lock().clone();
        response.map(TransportResponse::ok)
    }
}

/// A resource at `api/zoo` over a mock transport
#[allow(dead_code)]
pub fn zoo_resource(options: ResourceOptions, transport: &Arc<MockTransport>) -> Resource {
    Resource::new("api/zoo", options, Arc::clone(transport) as Arc<dyn Transport>)
}
