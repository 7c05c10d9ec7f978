//! Scripted advisor for integration testing.
//!
//! Replies are queued up front and handed out one per call. Every
//! request is recorded so tests can check what the model was shown.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use stayrate::llm::{AdvisoryRequest, PricingAdvisor};
use stayrate::types::Property;

pub struct ScriptedAdvisor {
    replies: Mutex<VecDeque<Result<String, String>>>,
    seen: Arc<Mutex<Vec<AdvisoryRequest>>>,
}

impl ScriptedAdvisor {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Queue a successful reply.
    pub fn reply(self, text: &str) -> Self {
        self.replies.lock().unwrap().push_back(Ok(text.to_string()));
        self
    }

    /// Queue a transport failure.
    pub fn fail(self, msg: &str) -> Self {
        self.replies.lock().unwrap().push_back(Err(msg.to_string()));
        self
    }

    /// Handle on the recorded requests, valid after the advisor is boxed.
    pub fn requests(&self) -> Arc<Mutex<Vec<AdvisoryRequest>>> {
        self.seen.clone()
    }
}

#[async_trait]
impl PricingAdvisor for ScriptedAdvisor {
    async fn advise(&self, request: &AdvisoryRequest) -> Result<String> {
        self.seen.lock().unwrap().push(request.clone());
        match self.replies.lock().unwrap().pop_front() {
            Some(Ok(text)) => Ok(text),
            Some(Err(msg)) => Err(anyhow!(msg)),
            None => Err(anyhow!("no scripted reply left")),
        }
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

/// A priced, active property.
pub fn property(id: &str, base_price: Decimal) -> Property {
    Property {
        id: id.to_string(),
        name: format!("Listing {id}"),
        base_price: Some(base_price),
        currency: "USD".to_string(),
        location: Some("Lisbon".to_string()),
        property_type: Some("apartment".to_string()),
        amenities: vec!["wifi".to_string()],
        is_active: true,
    }
}
