//! Testing utilities for the leadflow workspace
//!
//! Shared fixtures and an in-memory persistence API.

#![allow(missing_docs)]

use async_trait::async_trait;
use leadflow_core::{ProspectApi, ProspectRecord, TransportError};
use leadflow_model::{
    AppointmentStatus, AppointmentStep, Contact, Event, Group, GroupId, MeetingPart, Outcome,
    PhoneNumber, Progress, Prospect, ProspectId, ProspectProduct, Role, User, UserId,
};
use leadflow_scope::ListScope;
use leadflow_workflow::ProspectUpdate;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

// -- fixtures ---------------------------------------------------------------

pub fn admin() -> User {
    User::new("admin", "Admin", Role::Admin)
}

pub fn master_trainer() -> User {
    User::new("mt", "Master Trainer", Role::MasterTrainer)
}

pub fn trainer(groups: &[&str]) -> User {
    User::new("trainer", "Trainer", Role::Trainer)
        .managing(groups.iter().map(|g| GroupId::from(*g)))
}

pub fn leader(id: &str, group: &str) -> User {
    User::new(id, format!("Leader {id}"), Role::GroupLeader).in_group(group)
}

pub fn agent(id: &str, group: &str) -> User {
    User::new(id, format!("Agent {id}"), Role::Agent).in_group(group)
}

/// Bare prospect owned by `uid`
pub fn prospect(id: &str, uid: &str, group: &str) -> Prospect {
    Prospect::new(
        id.into(),
        uid.into(),
        Contact::new("Siti Aminah", PhoneNumber::from_stored("+60123456789")),
    )
    .with_group(group.into())
}

/// Appointment step with a completed appointment and every meeting part done
pub fn completed_step() -> AppointmentStep {
    let mut step = AppointmentStep::default();
    step.appointment.status = AppointmentStatus::Completed;
    step.meeting_parts = MeetingPart::ALL.into_iter().collect();
    step
}

/// Prospect closed successfully for `amount`
pub fn sold(id: &str, uid: &str, group: &str, amount: i64) -> Prospect {
    prospect(id, uid, group)
        .with_progress(Progress::SalesOutcome {
            step: completed_step(),
            outcome: Outcome::Successful,
        })
        .with_products(vec![ProspectProduct::new("Takaful Term80", Decimal::from(amount))])
}

/// Stored JSON form of `prospect`, as the backend would return it
pub fn record_json(prospect: &Prospect) -> Value {
    let update = as_update(prospect);
    let mut value = serde_json::to_value(ProspectRecord::from_update(prospect, &update))
        .unwrap_or(Value::Null);
    if matches!(prospect.progress, Progress::Prospect) {
        value["currentStage"] = json!("prospect");
    }
    value
}

fn as_update(prospect: &Prospect) -> ProspectUpdate {
    ProspectUpdate {
        id: prospect.id.clone(),
        contact: prospect.contact.clone(),
        step: prospect.progress.step().cloned().unwrap_or_default(),
        outcome: prospect.progress.outcome().cloned(),
        products: prospect.products.as_slice().to_vec(),
    }
}

// -- in-memory API ----------------------------------------------------------

/// Persistence API backed by in-process maps
///
/// Filters lists by scope the way the real backend does and wraps them in
/// `{ "<resource>": [...] }` envelopes.
#[derive(Debug, Default)]
pub struct InMemoryApi {
    records: RwLock<BTreeMap<String, Value>>,
    users: RwLock<Vec<User>>,
    groups: RwLock<Vec<Group>>,
    events: RwLock<Vec<Value>>,
    failure: RwLock<Option<TransportError>>,
    update_delay: Option<Duration>,
    list_calls: AtomicUsize,
}

impl InMemoryApi {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_users(self, users: impl IntoIterator<Item = User>) -> Self {
        self.users.write().extend(users);
        self
    }

    #[must_use]
    pub fn with_groups(self, groups: impl IntoIterator<Item = Group>) -> Self {
        self.groups.write().extend(groups);
        self
    }

    #[must_use]
    pub fn with_prospects(self, prospects: impl IntoIterator<Item = Prospect>) -> Self {
        for p in prospects {
            self.insert_record(p.id.as_str(), record_json(&p));
        }
        self
    }

    #[must_use]
    pub fn with_events(self, events: impl IntoIterator<Item = Event>) -> Self {
        self.events.write().extend(events.into_iter().map(|e| {
            json!({
                "id": e.id,
                "title": e.title,
                "description": e.description,
                "createdBy": e.created_by,
                "targetGroupIds": e.target_group_ids,
            })
        }));
        self
    }

    /// Make update calls take at least `delay`
    #[must_use]
    pub fn with_update_delay(mut self, delay: Duration) -> Self {
        self.update_delay = Some(delay);
        self
    }

    /// Insert a raw stored record
    pub fn insert_record(&self, id: &str, record: Value) {
        self.records.write().insert(id.to_string(), record);
    }

    /// Raw stored record
    pub fn record(&self, id: &str) -> Option<Value> {
        self.records.read().get(id).cloned()
    }

    pub fn record_count(&self) -> usize {
        self.records.read().len()
    }

    /// Fail every call with `error` until [`Self::recover`]
    pub fn fail_with(&self, error: TransportError) {
        *self.failure.write() = Some(error);
    }

    pub fn recover(&self) {
        *self.failure.write() = None;
    }

    /// Prospect list calls served so far
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), TransportError> {
        match &*self.failure.read() {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    fn managed_groups(&self, actor: &UserId) -> Vec<GroupId> {
        self.users
            .read()
            .iter()
            .find(|u| &u.id == actor)
            .map(|u| u.managed_group_ids.clone())
            .unwrap_or_default()
    }

    fn not_found(id: &ProspectId) -> TransportError {
        TransportError::Status {
            code: 404,
            message: format!("prospect {id} not found"),
        }
    }
}

fn field<'a>(record: &'a Value, key: &str) -> Option<&'a str> {
    record.get(key).and_then(Value::as_str)
}

fn in_groups(record: &Value, groups: &[GroupId]) -> bool {
    field(record, "groupId").is_some_and(|g| groups.iter().any(|m| m.as_str() == g))
}

#[async_trait]
impl ProspectApi for InMemoryApi {
    async fn list_prospects(
        &self,
        actor: &UserId,
        scope: &ListScope,
    ) -> Result<Value, TransportError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        let managed = self.managed_groups(actor);
        let items: Vec<Value> = self
            .records
            .read()
            .values()
            .filter(|r| match scope {
                ListScope::Mine => field(r, "uid") == Some(actor.as_str()),
                ListScope::ManagedGroups => in_groups(r, &managed),
                ListScope::All => true,
                ListScope::Group(group) => in_groups(r, std::slice::from_ref(group)),
            })
            .cloned()
            .collect();
        Ok(json!({ "prospects": items }))
    }

    async fn get_prospect(&self, id: &ProspectId) -> Result<Value, TransportError> {
        self.check()?;
        self.record(id.as_str()).ok_or_else(|| Self::not_found(id))
    }

    async fn create_prospect(&self, record: &ProspectRecord) -> Result<Value, TransportError> {
        self.check()?;
        let id = ulid::Ulid::new().to_string();
        let mut value = serde_json::to_value(record)
            .map_err(|e| TransportError::Decode(e.to_string()))?;
        value["id"] = json!(id);
        value["createdAt"] = json!({ "_seconds": chrono::Utc::now().timestamp() });
        self.insert_record(&id, value);
        Ok(json!({ "id": id }))
    }

    async fn update_prospect(
        &self,
        id: &ProspectId,
        record: &ProspectRecord,
    ) -> Result<(), TransportError> {
        if let Some(delay) = self.update_delay {
            tokio::time::sleep(delay).await;
        }
        self.check()?;
        let mut value = serde_json::to_value(record)
            .map_err(|e| TransportError::Decode(e.to_string()))?;
        let mut records = self.records.write();
        let existing = records.get(id.as_str()).ok_or_else(|| Self::not_found(id))?;
        if let Some(created) = existing.get("createdAt") {
            value["createdAt"] = created.clone();
        }
        value["id"] = json!(id);
        value["updatedAt"] = json!({ "_seconds": chrono::Utc::now().timestamp() });
        records.insert(id.to_string(), value);
        Ok(())
    }

    async fn delete_prospect(&self, id: &ProspectId) -> Result<(), TransportError> {
        self.check()?;
        self.records
            .write()
            .remove(id.as_str())
            .map(|_| ())
            .ok_or_else(|| Self::not_found(id))
    }

    async fn list_events(&self) -> Result<Value, TransportError> {
        self.check()?;
        let events = self.events.read().clone();
        Ok(json!({ "events": events }))
    }

    async fn list_users(&self) -> Result<Value, TransportError> {
        self.check()?;
        let users = self.users.read().clone();
        Ok(json!({ "users": users }))
    }

    async fn list_groups(&self) -> Result<Value, TransportError> {
        self.check()?;
        let groups = self.groups.read().clone();
        Ok(json!({ "groups": groups }))
    }
}
