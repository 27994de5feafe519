//! In-process broker with the same pending/claim semantics as the Redis stream.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use vpipe_models::TranscodeTask;

use crate::broker::{Delivery, TaskBroker};
use crate::error::QueueResult;

struct Pending {
    delivery: Delivery,
    delivered_at: Instant,
}

#[derive(Default)]
struct State {
    next_seq: u64,
    ready: VecDeque<Delivery>,
    pending: Vec<Pending>,
    attempts: HashMap<String, u32>,
    touches: HashMap<String, u32>,
    acked: Vec<String>,
    rejected: Vec<String>,
    dead_lettered: Vec<(Delivery, String)>,
}

/// Broker kept in memory for tests and local runs.
pub struct MemoryBroker {
    state: Mutex<State>,
    max_retries: u32,
}

impl Default for MemoryBroker {
    fn default() -> Self {
        Self::new(3)
    }
}

impl MemoryBroker {
    pub fn new(max_retries: u32) -> Self {
        Self {
            state: Mutex::new(State::default()),
            max_retries,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        // A panicking test thread must not hide the recorded state from others
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Append a raw payload; returns the message id.
    pub fn push(&self, payload: impl Into<Vec<u8>>) -> String {
        let mut state = self.lock();
        state.next_seq += 1;
        let id = format!("{}-0", state.next_seq);
        state.ready.push_back(Delivery::new(id.clone(), payload));
        id
    }

    pub fn push_task(&self, task: &TranscodeTask) -> String {
        let payload = task.to_json().unwrap_or_default();
        self.push(payload)
    }

    /// Messages delivered but not yet settled.
    pub fn pending_ids(&self) -> Vec<String> {
        self.lock()
            .pending
            .iter()
            .map(|p| p.delivery.message_id.clone())
            .collect()
    }

    pub fn ready_len(&self) -> usize {
        self.lock().ready.len()
    }

    pub fn acked(&self) -> Vec<String> {
        self.lock().acked.clone()
    }

    pub fn rejected(&self) -> Vec<String> {
        self.lock().rejected.clone()
    }

    pub fn dead_lettered(&self) -> Vec<(Delivery, String)> {
        self.lock().dead_lettered.clone()
    }

    pub fn attempts(&self, message_id: &str) -> u32 {
        self.lock().attempts.get(message_id).copied().unwrap_or(0)
    }

    /// Heartbeats received for a message.
    pub fn touches(&self, message_id: &str) -> u32 {
        self.lock().touches.get(message_id).copied().unwrap_or(0)
    }

    fn settle(state: &mut State, message_id: &str) {
        state.pending.retain(|p| p.delivery.message_id != message_id);
        state.attempts.remove(message_id);
    }
}

#[async_trait]
impl TaskBroker for MemoryBroker {
    async fn receive(&self, _consumer: &str, block: Duration, count: usize) -> QueueResult<Vec<Delivery>> {
        let taken: Vec<Delivery> = {
            let mut state = self.lock();
            let n = count.min(state.ready.len());
            let taken: Vec<Delivery> = state.ready.drain(..n).collect();
            let now = Instant::now();
            for delivery in &taken {
                state.pending.push(Pending {
                    delivery: delivery.clone(),
                    delivered_at: now,
                });
            }
            taken
        };

        if taken.is_empty() {
            tokio::time::sleep(block).await;
        }
        Ok(taken)
    }

    async fn claim_stale(
        &self,
        _consumer: &str,
        min_idle: Duration,
        count: usize,
    ) -> QueueResult<Vec<Delivery>> {
        let mut state = self.lock();
        let now = Instant::now();
        let mut claimed = Vec::new();
        for pending in state.pending.iter_mut() {
            if claimed.len() >= count {
                break;
            }
            if now.duration_since(pending.delivered_at) >= min_idle {
                pending.delivered_at = now;
                claimed.push(pending.delivery.clone());
            }
        }
        Ok(claimed)
    }

    async fn touch(&self, _consumer: &str, message_id: &str) -> QueueResult<bool> {
        let mut state = self.lock();
        let now = Instant::now();
        let Some(pending) = state
            .pending
            .iter_mut()
            .find(|p| p.delivery.message_id == message_id)
        else {
            return Ok(false);
        };
        pending.delivered_at = now;
        *state.touches.entry(message_id.to_string()).or_insert(0) += 1;
        Ok(true)
    }

    async fn ack(&self, message_id: &str) -> QueueResult<()> {
        let mut state = self.lock();
        Self::settle(&mut state, message_id);
        state.acked.push(message_id.to_string());
        Ok(())
    }

    async fn reject(&self, message_id: &str) -> QueueResult<()> {
        let mut state = self.lock();
        Self::settle(&mut state, message_id);
        state.rejected.push(message_id.to_string());
        Ok(())
    }

    async fn dead_letter(&self, delivery: &Delivery, reason: &str) -> QueueResult<()> {
        let mut state = self.lock();
        Self::settle(&mut state, &delivery.message_id);
        state
            .dead_lettered
            .push((delivery.clone(), reason.to_string()));
        Ok(())
    }

    async fn record_attempt(&self, message_id: &str) -> QueueResult<u32> {
        let mut state = self.lock();
        let count = state.attempts.entry(message_id.to_string()).or_insert(0);
        *count += 1;
        Ok(*count)
    }

    fn max_retries(&self) -> u32 {
        self.max_retries
    }
}
