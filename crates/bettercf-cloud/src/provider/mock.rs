//! Mock provider for testing
//!
//! Stacks, objects and parameters live in memory. Each stack mutation plays
//! back a status script, so a test can walk the poller through any sequence
//! of `*_IN_PROGRESS` statuses before a terminal one.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, RwLock};

use super::{CloudProvider, StackRequest, StackSummary, TemplateSource};
use crate::error::{CloudError, Result};

/// In-memory provider for testing
#[derive(Clone, Default)]
pub struct MockProvider {
    state: Arc<RwLock<MockState>>,
    /// Track operation counts for assertions
    operations: Arc<RwLock<OperationCounts>>,
}

/// Counts of operations performed for testing assertions
#[derive(Debug, Default, Clone)]
pub struct OperationCounts {
    pub template_gets: usize,
    pub creates: usize,
    pub updates: usize,
    pub deletes: usize,
    pub status_queries: usize,
    pub object_puts: usize,
    pub object_gets: usize,
    pub object_lists: usize,
    pub parameter_gets: usize,
}

#[derive(Default)]
struct MockState {
    stacks: Vec<MockStack>,
    next_stack_id: usize,
    /// Status script for the next mutation of a stack name
    scripts: HashMap<String, Vec<String>>,
    /// Operation name -> injected failure message
    failures: HashMap<&'static str, String>,
    objects: BTreeMap<(String, String), Vec<u8>>,
    parameters: HashMap<String, String>,
    bucket_regions: HashMap<String, Option<String>>,
    created: Vec<StackRequest>,
    updated: Vec<StackRequest>,
    deleted: Vec<String>,
}

struct MockStack {
    id: String,
    name: String,
    template: String,
    status: String,
    pending: VecDeque<String>,
    deleted: bool,
}

impl MockStack {
    fn matches(&self, stack: &str) -> bool {
        self.id == stack || (!self.deleted && self.name == stack)
    }

    fn play(&mut self, script: Vec<String>) {
        self.pending = script.into();
        self.advance();
    }

    /// Move to the next scripted status
    ///
    /// A stack leaves its name once it reaches `DELETE_COMPLETE` and stays
    /// reachable by id only.
    fn advance(&mut self) {
        if let Some(next) = self.pending.pop_front() {
            self.status = next;
        }
        if self.status == "DELETE_COMPLETE" {
            self.deleted = true;
        }
    }
}

impl MockState {
    fn live_stack(&self, name: &str) -> Option<&MockStack> {
        self.stacks.iter().find(|s| !s.deleted && s.name == name)
    }

    fn live_stack_mut(&mut self, name: &str) -> Option<&mut MockStack> {
        self.stacks.iter_mut().find(|s| !s.deleted && s.name == name)
    }

    fn add_stack(&mut self, name: &str, template: String, status: &str) -> &mut MockStack {
        self.next_stack_id += 1;
        self.stacks.push(MockStack {
            id: format!(
                "arn:aws:cloudformation:us-east-1:000000000000:stack/{name}/{}",
                self.next_stack_id
            ),
            name: name.to_string(),
            template,
            status: status.to_string(),
            pending: VecDeque::new(),
            deleted: false,
        });
        let last = self.stacks.len() - 1;
        &mut self.stacks[last]
    }

    fn script_for(&mut self, name: &str, default: [&str; 2]) -> Vec<String> {
        self.scripts
            .remove(name)
            .unwrap_or_else(|| default.iter().map(|s| s.to_string()).collect())
    }

    fn check_failure(&self, operation: &'static str) -> Result<()> {
        match self.failures.get(operation) {
            Some(message) => Err(CloudError::provider(operation, message.clone())),
            None => Ok(()),
        }
    }
}

fn stack_not_found(name: &str) -> CloudError {
    CloudError::NotFound {
        kind: "stack",
        name: name.to_string(),
    }
}

fn template_text(template: &TemplateSource) -> String {
    match template {
        TemplateSource::Url(url) => url.clone(),
        TemplateSource::Body(body) => body.clone(),
    }
}

impl MockProvider {
    /// Create a new empty mock provider
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a live stack in `CREATE_COMPLETE`
    pub fn with_stack(self, name: &str, template: &str) -> Self {
        self.state
            .write()
            .unwrap()
            .add_stack(name, template.to_string(), "CREATE_COMPLETE");
        self
    }

    /// Add an object
    pub fn with_object(self, bucket: &str, key: &str, body: impl Into<Vec<u8>>) -> Self {
        self.state
            .write()
            .unwrap()
            .objects
            .insert((bucket.to_string(), key.to_string()), body.into());
        self
    }

    /// Add a parameter
    pub fn with_parameter(self, name: &str, value: &str) -> Self {
        self.state
            .write()
            .unwrap()
            .parameters
            .insert(name.to_string(), value.to_string());
        self
    }

    /// Set the raw location constraint of a bucket
    pub fn with_bucket_region(self, bucket: &str, region: Option<&str>) -> Self {
        self.state
            .write()
            .unwrap()
            .bucket_regions
            .insert(bucket.to_string(), region.map(str::to_string));
        self
    }

    /// Statuses the next create, update or delete of `stack_name` goes through
    ///
    /// The last status sticks once the script is exhausted.
    pub fn script_statuses<I, S>(&self, stack_name: &str, statuses: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.state
            .write()
            .unwrap()
            .scripts
            .insert(stack_name.to_string(), statuses.into_iter().map(Into::into).collect());
    }

    /// Make every call of `operation` fail with a provider error
    pub fn fail_on(&self, operation: &'static str, message: &str) {
        self.state
            .write()
            .unwrap()
            .failures
            .insert(operation, message.to_string());
    }

    /// Get operation counts for assertions
    pub fn operation_counts(&self) -> OperationCounts {
        self.operations.read().unwrap().clone()
    }

    /// Create requests received so far
    pub fn created_requests(&self) -> Vec<StackRequest> {
        self.state.read().unwrap().created.clone()
    }

    /// Update requests received so far
    pub fn updated_requests(&self) -> Vec<StackRequest> {
        self.state.read().unwrap().updated.clone()
    }

    /// Stack names whose deletion was requested
    pub fn deleted_stacks(&self) -> Vec<String> {
        self.state.read().unwrap().deleted.clone()
    }

    /// Stored object body
    pub fn object(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.state
            .read()
            .unwrap()
            .objects
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    /// Number of live stacks
    pub fn stack_count(&self) -> usize {
        self.state
            .read()
            .unwrap()
            .stacks
            .iter()
            .filter(|s| !s.deleted)
            .count()
    }

    fn count(&self, f: impl FnOnce(&mut OperationCounts)) {
        let mut ops = self.operations.write().unwrap();
        f(&mut ops);
    }
}

#[async_trait]
impl CloudProvider for MockProvider {
    async fn get_stack_template(&self, stack_name: &str) -> Result<String> {
        self.count(|ops| ops.template_gets += 1);

        let state = self.state.read().unwrap();
        state.check_failure("GetTemplate")?;
        state
            .live_stack(stack_name)
            .map(|s| s.template.clone())
            .ok_or_else(|| stack_not_found(stack_name))
    }

    async fn create_stack(&self, request: &StackRequest) -> Result<()> {
        self.count(|ops| ops.creates += 1);

        let mut state = self.state.write().unwrap();
        state.check_failure("CreateStack")?;
        if state.live_stack(&request.stack_name).is_some() {
            return Err(CloudError::provider(
                "CreateStack",
                format!("Stack [{}] already exists", request.stack_name),
            ));
        }

        state.created.push(request.clone());
        let script = state.script_for(&request.stack_name, ["CREATE_IN_PROGRESS", "CREATE_COMPLETE"]);
        state
            .add_stack(&request.stack_name, template_text(&request.template), "")
            .play(script);
        Ok(())
    }

    async fn update_stack(&self, request: &StackRequest) -> Result<()> {
        self.count(|ops| ops.updates += 1);

        let mut state = self.state.write().unwrap();
        state.check_failure("UpdateStack")?;
        if state.live_stack(&request.stack_name).is_none() {
            return Err(stack_not_found(&request.stack_name));
        }

        state.updated.push(request.clone());
        let script = state.script_for(&request.stack_name, ["UPDATE_IN_PROGRESS", "UPDATE_COMPLETE"]);
        if let Some(stack) = state.live_stack_mut(&request.stack_name) {
            stack.template = template_text(&request.template);
            stack.play(script);
        }
        Ok(())
    }

    async fn delete_stack(&self, stack_name: &str) -> Result<()> {
        self.count(|ops| ops.deletes += 1);

        let mut state = self.state.write().unwrap();
        state.check_failure("DeleteStack")?;
        state.deleted.push(stack_name.to_string());

        let script = state.script_for(stack_name, ["DELETE_IN_PROGRESS", "DELETE_COMPLETE"]);
        if let Some(stack) = state.live_stack_mut(stack_name) {
            stack.play(script);
        }
        Ok(())
    }

    async fn describe_stack_status(&self, stack: &str) -> Result<String> {
        self.count(|ops| ops.status_queries += 1);

        let mut state = self.state.write().unwrap();
        state.check_failure("DescribeStacks")?;
        let found = state
            .stacks
            .iter_mut()
            .find(|s| s.matches(stack))
            .ok_or_else(|| stack_not_found(stack))?;

        let status = found.status.clone();
        found.advance();
        Ok(status)
    }

    async fn list_stacks_by_name(&self, stack_name: &str) -> Result<Vec<StackSummary>> {
        let state = self.state.read().unwrap();
        state.check_failure("DescribeStacks")?;
        Ok(state
            .stacks
            .iter()
            .filter(|s| !s.deleted && s.name == stack_name)
            .map(|s| StackSummary {
                id: s.id.clone(),
                name: s.name.clone(),
                status: s.status.clone(),
            })
            .collect())
    }

    async fn put_object(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<()> {
        self.count(|ops| ops.object_puts += 1);

        let mut state = self.state.write().unwrap();
        state.check_failure("PutObject")?;
        state
            .objects
            .insert((bucket.to_string(), key.to_string()), body);
        Ok(())
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        self.count(|ops| ops.object_gets += 1);

        let state = self.state.read().unwrap();
        state.check_failure("GetObject")?;
        state
            .objects
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
            .ok_or_else(|| CloudError::NotFound {
                kind: "object",
                name: format!("{bucket}/{key}"),
            })
    }

    async fn list_object_keys(&self, bucket: &str, prefix: &str) -> Result<Vec<String>> {
        self.count(|ops| ops.object_lists += 1);

        let state = self.state.read().unwrap();
        state.check_failure("ListObjectsV2")?;
        Ok(state
            .objects
            .keys()
            .filter(|(b, key)| b == bucket && key.starts_with(prefix))
            .map(|(_, key)| key.clone())
            .collect())
    }

    async fn get_parameter(&self, name: &str) -> Result<String> {
        self.count(|ops| ops.parameter_gets += 1);

        let state = self.state.read().unwrap();
        state.check_failure("GetParameter")?;
        state
            .parameters
            .get(name)
            .cloned()
            .ok_or_else(|| CloudError::NotFound {
                kind: "parameter",
                name: name.to_string(),
            })
    }

    async fn get_bucket_region(&self, bucket: &str) -> Result<Option<String>> {
        let state = self.state.read().unwrap();
        state.check_failure("GetBucketLocation")?;
        Ok(state.bucket_regions.get(bucket).cloned().flatten())
    }

    async fn empty_bucket(&self, bucket: &str) -> Result<usize> {
        let mut state = self.state.write().unwrap();
        state.check_failure("DeleteObjects")?;
        let before = state.objects.len();
        state.objects.retain(|(b, _), _| b != bucket);
        Ok(before - state.objects.len())
    }
}
