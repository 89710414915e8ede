//! Scripted in-memory stack service for tests.
//!
//! Behaves like a tiny CloudFormation: stacks live in a map, operations move
//! them through a configurable status progression, and every call is counted
//! so tests can assert exactly which operations a convergence run performed.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;

use super::client::RemoteStackClient;
use super::types::{CreateStackRequest, RemoteStack, StackStatus, UpdateStackRequest};
use crate::error::{Result, ServiceError, StackherdError};
use crate::outputs::OutputMap;

/// One stack held by the fake service.
#[derive(Debug)]
struct FakeStack {
    /// Remaining status progression; the last entry repeats until the next
    /// operation replaces it.
    statuses: VecDeque<StackStatus>,
    /// Outputs reported once the stack reaches a `_COMPLETE` status.
    outputs: OutputMap,
    /// Whether the stack disappears after the progression is exhausted
    /// (delete semantics).
    vanish: bool,
}

/// Scripted in-memory implementation of [`RemoteStackClient`].
#[derive(Debug, Default)]
pub(crate) struct FakeCloudFormation {
    stacks: Mutex<BTreeMap<String, FakeStack>>,
    /// Outputs the "template" produces on create/update completion.
    template_outputs: OutputMap,
    /// Status progression applied by create (default: straight to
    /// `CREATE_COMPLETE`).
    create_statuses: Vec<StackStatus>,
    /// Status progression applied by update (default: straight to
    /// `UPDATE_COMPLETE`).
    update_statuses: Vec<StackStatus>,
    /// When set, updates report that no changes are necessary.
    no_updates: bool,
    /// Region the fake reports being scoped to (`None`: region-agnostic).
    region: Option<String>,
    /// Last create request received, for submission assertions.
    last_create: Mutex<Option<CreateStackRequest>>,
    /// Last update request received, for submission assertions.
    last_update: Mutex<Option<UpdateStackRequest>>,
    describes: AtomicU32,
    creates: AtomicU32,
    updates: AtomicU32,
    deletes: AtomicU32,
}

impl FakeCloudFormation {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Sets the outputs produced when a create or update completes.
    pub(crate) fn with_template_output(mut self, key: &str, value: &str) -> Self {
        self.template_outputs.insert(key.to_string(), value.to_string());
        self
    }

    /// Scripts the status progression a create walks through.
    pub(crate) fn with_create_statuses(mut self, statuses: &[&str]) -> Self {
        self.create_statuses = statuses.iter().map(|s| StackStatus::from(*s)).collect();
        self
    }

    /// Scripts the status progression an update walks through.
    pub(crate) fn with_update_statuses(mut self, statuses: &[&str]) -> Self {
        self.update_statuses = statuses.iter().map(|s| StackStatus::from(*s)).collect();
        self
    }

    /// Makes every update report `NoUpdatesNeeded`.
    pub(crate) const fn with_no_updates(mut self) -> Self {
        self.no_updates = true;
        self
    }

    /// Scopes the fake to a region.
    pub(crate) fn with_region(mut self, region: &str) -> Self {
        self.region = Some(region.to_string());
        self
    }

    /// Seeds a pre-existing stack with a status progression and outputs.
    pub(crate) fn seed(&self, name: &str, statuses: &[&str], outputs: &OutputMap) {
        let mut stacks = self.stacks.lock().unwrap();
        stacks.insert(
            name.to_string(),
            FakeStack {
                statuses: statuses.iter().map(|s| StackStatus::from(*s)).collect(),
                outputs: outputs.clone(),
                vanish: false,
            },
        );
    }

    pub(crate) fn describe_calls(&self) -> u32 {
        self.describes.load(Ordering::SeqCst)
    }

    pub(crate) fn create_calls(&self) -> u32 {
        self.creates.load(Ordering::SeqCst)
    }

    pub(crate) fn update_calls(&self) -> u32 {
        self.updates.load(Ordering::SeqCst)
    }

    pub(crate) fn delete_calls(&self) -> u32 {
        self.deletes.load(Ordering::SeqCst)
    }

    /// True if the named stack currently exists.
    pub(crate) fn exists(&self, name: &str) -> bool {
        self.stacks.lock().unwrap().contains_key(name)
    }

    /// Returns the last create request received.
    pub(crate) fn last_create(&self) -> Option<CreateStackRequest> {
        self.last_create.lock().unwrap().clone()
    }

    /// Returns the last update request received.
    pub(crate) fn last_update(&self) -> Option<UpdateStackRequest> {
        self.last_update.lock().unwrap().clone()
    }

    fn default_progression(statuses: &[StackStatus], terminal: &str) -> VecDeque<StackStatus> {
        if statuses.is_empty() {
            VecDeque::from([StackStatus::from(terminal)])
        } else {
            statuses.iter().cloned().collect()
        }
    }
}

#[async_trait]
impl RemoteStackClient for FakeCloudFormation {
    fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }

    async fn describe(&self, name: &str) -> Result<Option<RemoteStack>> {
        self.describes.fetch_add(1, Ordering::SeqCst);
        let mut stacks = self.stacks.lock().unwrap();

        let Some(stack) = stacks.get_mut(name) else {
            return Ok(None);
        };

        if stack.statuses.is_empty() && stack.vanish {
            stacks.remove(name);
            return Ok(None);
        }

        let status = stack
            .statuses
            .front()
            .cloned()
            .ok_or_else(|| StackherdError::internal("fake stack has no status"))?;

        // Advance the progression; the final status repeats unless the stack
        // is scheduled to vanish.
        if stack.statuses.len() > 1 || stack.vanish {
            stack.statuses.pop_front();
        }

        let outputs = if status.is_complete() {
            stack.outputs.clone()
        } else {
            OutputMap::new()
        };

        Ok(Some(RemoteStack {
            name: name.to_string(),
            status,
            outputs,
        }))
    }

    async fn create(&self, request: &CreateStackRequest) -> Result<()> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        *self.last_create.lock().unwrap() = Some(request.clone());
        let mut stacks = self.stacks.lock().unwrap();

        if stacks.contains_key(&request.name) {
            return Err(ServiceError::AlreadyExists {
                name: request.name.clone(),
            }
            .into());
        }

        stacks.insert(
            request.name.clone(),
            FakeStack {
                statuses: Self::default_progression(&self.create_statuses, "CREATE_COMPLETE"),
                outputs: self.template_outputs.clone(),
                vanish: false,
            },
        );
        Ok(())
    }

    async fn update(&self, request: &UpdateStackRequest) -> Result<()> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        *self.last_update.lock().unwrap() = Some(request.clone());
        let mut stacks = self.stacks.lock().unwrap();

        let Some(stack) = stacks.get_mut(&request.name) else {
            return Err(ServiceError::NotFound {
                name: request.name.clone(),
            }
            .into());
        };

        if self.no_updates {
            return Err(ServiceError::NoUpdatesNeeded {
                name: request.name.clone(),
            }
            .into());
        }

        stack.statuses = Self::default_progression(&self.update_statuses, "UPDATE_COMPLETE");
        stack.outputs = self.template_outputs.clone();
        Ok(())
    }

    async fn delete(&self, name: &str) -> Result<()> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        let mut stacks = self.stacks.lock().unwrap();

        if let Some(stack) = stacks.get_mut(name) {
            stack.statuses = VecDeque::from([StackStatus::from("DELETE_IN_PROGRESS")]);
            stack.vanish = true;
        }
        Ok(())
    }
}
