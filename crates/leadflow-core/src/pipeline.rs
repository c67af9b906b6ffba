//! Pipeline service
//!
//! Wires the session, the persistence seam, the per-user cache and the pure
//! workflow/scope/metrics crates into the operations a front-end calls.
//!
//! - Reads go through the cache; a failed list fetch yields an empty list
//! - Writes go straight to the API; only after success are the affected
//!   cache entries dropped and re-fetched
//! - At most one save per prospect is in flight

use crate::api::{created_id, ProspectApi};
use crate::config::PipelineConfig;
use crate::error::{IngestError, PipelineError};
use crate::ingest::{self, ProspectRecord};
use crate::session::{SessionChange, SessionContext};
use dashmap::DashMap;
use leadflow_cache::{ResourceTag, ScopedCache};
use leadflow_metrics::{
    leaderboard_agents, leaderboard_groups, BadgeProgress, EntityRollup, PipelineSummary,
};
use leadflow_model::{Event, Group, GroupId, Prospect, ProspectId, Role, User};
use leadflow_scope::{list_scope_for, resolve, resolve_by_group, visible_events, ListScope};
use leadflow_workflow::{
    authorize_delete, create, Clock, NewProspect, ProspectEditor, SystemClock, WorkflowError,
};
use std::sync::Arc;

/// Removes the in-flight marker when the save finishes, however it ends
struct SaveGuard<'a> {
    saving: &'a DashMap<ProspectId, ()>,
    id: ProspectId,
}

impl Drop for SaveGuard<'_> {
    fn drop(&mut self) {
        self.saving.remove(&self.id);
    }
}

/// Front-end facing service
pub struct Pipeline {
    api: Arc<dyn ProspectApi>,
    session: Arc<SessionContext>,
    config: PipelineConfig,
    clock: Arc<dyn Clock>,
    prospects: ScopedCache<Vec<Prospect>>,
    events: ScopedCache<Vec<Event>>,
    saving: DashMap<ProspectId, ()>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("session", &self.session)
            .field("config", &self.config)
            .field("saves_in_flight", &self.saving.len())
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Create a pipeline over `api` for `session`
    #[must_use]
    pub fn new(
        api: Arc<dyn ProspectApi>,
        session: Arc<SessionContext>,
        config: PipelineConfig,
    ) -> Self {
        let ttl = config.cache_ttl();
        let capacity = config.cache_capacity;
        Self {
            api,
            session,
            config,
            clock: Arc::new(SystemClock),
            prospects: ScopedCache::with_ttl(capacity, ttl),
            events: ScopedCache::with_ttl(capacity, ttl),
            saving: DashMap::new(),
        }
    }

    /// With clock
    #[inline]
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Configuration in use
    #[inline]
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Session context
    #[inline]
    #[must_use]
    pub fn session(&self) -> &Arc<SessionContext> {
        &self.session
    }

    fn actor(&self) -> Result<User, PipelineError> {
        self.session.current().ok_or(PipelineError::NoSession)
    }

    // -- session ------------------------------------------------------------

    /// Sign in `user`, dropping the previous user's cached views
    pub async fn sign_in(&self, user: User) -> Option<SessionChange> {
        let change = self.session.sign_in(user)?;
        self.forget_previous(&change).await;
        Some(change)
    }

    /// Sign out, dropping the user's cached views
    pub async fn sign_out(&self) -> Option<SessionChange> {
        let change = self.session.sign_out()?;
        self.forget_previous(&change).await;
        Some(change)
    }

    async fn forget_previous(&self, change: &SessionChange) {
        if let Some(previous) = change.previous() {
            self.prospects.invalidate_user(&previous.id).await;
            self.events.invalidate_user(&previous.id).await;
        }
    }

    // -- reads --------------------------------------------------------------

    /// Prospects the signed-in user may see
    ///
    /// Fetch failures are logged and yield an empty list.
    pub async fn visible_prospects(&self) -> Vec<Prospect> {
        let Some(actor) = self.session.current() else {
            return Vec::new();
        };
        if actor.role == Role::Trainer && actor.managed_group_ids.is_empty() {
            return Vec::new();
        }
        let scope = list_scope_for(actor.role);
        let fetched = self.cached_list(&actor, &scope).await;
        resolve(&actor, &fetched)
    }

    /// Prospects attributed to `group_id`, for aggregate views
    pub async fn group_prospects(&self, group_id: &GroupId) -> Vec<Prospect> {
        let Some(actor) = self.session.current() else {
            return Vec::new();
        };
        let fetched = self
            .cached_list(&actor, &ListScope::Group(group_id.clone()))
            .await;
        resolve_by_group(group_id, &fetched)
    }

    async fn cached_list(&self, actor: &User, scope: &ListScope) -> Vec<Prospect> {
        let tag = ResourceTag::prospects(&scope.tag());
        let result = self
            .prospects
            .try_get_or_insert_with(&actor.id, tag, || async {
                let body = self.api.list_prospects(&actor.id, scope).await?;
                Ok::<_, PipelineError>(ingest::prospects(body)?)
            })
            .await;
        result.unwrap_or_else(|e| {
            tracing::warn!(user_id = %actor.id, scope = %scope.tag(), error = %e, "prospect list fetch failed; showing empty list");
            Vec::new()
        })
    }

    /// Events the signed-in user may see; failures yield an empty list
    pub async fn visible_events(&self) -> Vec<Event> {
        let Some(actor) = self.session.current() else {
            return Vec::new();
        };
        let result = self
            .events
            .try_get_or_insert_with(&actor.id, ResourceTag::events(), || async {
                let body = self.api.list_events().await?;
                Ok::<_, PipelineError>(ingest::events(body)?)
            })
            .await;
        match result {
            Ok(all) => visible_events(&actor, &all),
            Err(e) => {
                tracing::warn!(user_id = %actor.id, error = %e, "event list fetch failed; showing empty list");
                Vec::new()
            }
        }
    }

    /// Funnel, FYC and conversion over the visible set
    pub async fn dashboard(&self) -> PipelineSummary {
        PipelineSummary::compute(&self.visible_prospects().await)
    }

    /// Funnel, FYC and conversion for one group
    pub async fn group_dashboard(&self, group_id: &GroupId) -> PipelineSummary {
        PipelineSummary::compute(&self.group_prospects(group_id).await)
    }

    /// Agent leaderboard over the visible set
    pub async fn agent_leaderboard(&self) -> Vec<EntityRollup> {
        let users: Vec<User> = self.list_or_empty("users", self.api.list_users()).await;
        let agents: Vec<User> = users
            .into_iter()
            .filter(|u| matches!(u.role, Role::Agent | Role::GroupLeader))
            .collect();
        leaderboard_agents(&agents, &self.visible_prospects().await)
    }

    /// Group leaderboard over the visible set
    pub async fn group_leaderboard(&self) -> Vec<EntityRollup> {
        let groups: Vec<Group> = self.list_or_empty("groups", self.api.list_groups()).await;
        leaderboard_groups(&groups, &self.visible_prospects().await)
    }

    async fn list_or_empty<T, F>(&self, key: &'static str, fetch: F) -> Vec<T>
    where
        T: serde::de::DeserializeOwned,
        F: std::future::Future<Output = Result<serde_json::Value, crate::error::TransportError>>,
    {
        let result = match fetch.await {
            Ok(body) => ingest::records(body, key).map_err(PipelineError::from),
            Err(e) => Err(PipelineError::from(e)),
        };
        result.unwrap_or_else(|e| {
            tracing::warn!(resource = key, error = %e, "list fetch failed; showing empty list");
            Vec::new()
        })
    }

    /// Tier progress for `points` under the configured tiers
    #[must_use]
    pub fn badge_progress(&self, points: u64) -> BadgeProgress {
        BadgeProgress::lookup(points, &self.config.badge_tiers)
    }

    // -- writes -------------------------------------------------------------

    /// Open a prospect for editing
    ///
    /// # Errors
    /// `NoSession`, `Transport` or `Ingest`
    pub async fn open_editor(&self, id: &ProspectId) -> Result<ProspectEditor, PipelineError> {
        let actor = self.actor()?;
        let body = self.api.get_prospect(id).await?;
        let prospect = ingest::prospect(body)?;
        Ok(ProspectEditor::open(actor, prospect)
            .with_phone_prefix(self.config.phone_prefix.clone())
            .with_catalog(self.config.product_catalog.iter().cloned())
            .with_clock(Arc::clone(&self.clock)))
    }

    /// Validate and persist a new prospect owned by the signed-in user
    ///
    /// # Errors
    /// - `Workflow` for a role that cannot create or invalid fields
    /// - `Transport` when the API call fails
    /// - `Ingest` when the response carries no id
    pub async fn create_prospect(&self, draft: &NewProspect) -> Result<Prospect, PipelineError> {
        let actor = self.actor()?;
        let payload = create(&actor, draft, &self.config.phone_prefix)?;
        let record = ProspectRecord::from_create(&payload);

        let body = self.api.create_prospect(&record).await?;
        let id = created_id(&body).ok_or(IngestError::MissingField("id"))?;

        let mut prospect = Prospect::new(id, payload.uid, payload.contact);
        prospect.group_id = payload.group_id;
        tracing::info!(prospect_id = %prospect.id, user_id = %actor.id, "prospect created");

        self.refresh(&actor).await;
        Ok(prospect)
    }

    /// Persist the editor's buffered changes
    ///
    /// On failure the editor is left untouched so the caller can retry.
    /// An editor opened under a different session is refused.
    ///
    /// # Errors
    /// - `SaveInProgress` when another save for the same prospect is running
    /// - `Workflow` when the actor cannot edit, the editor belongs to another
    ///   session, or fields are invalid
    /// - `Transport` when the API call fails
    pub async fn save(&self, editor: &mut ProspectEditor) -> Result<(), PipelineError> {
        let actor = self.actor()?;
        if editor.actor().id != actor.id {
            tracing::warn!(
                prospect_id = %editor.draft().id,
                editor_user = %editor.actor().id,
                user_id = %actor.id,
                "save rejected; editor opened under another session"
            );
            return Err(WorkflowError::PermissionDenied.into());
        }
        let update = editor.prepare_save()?;
        let _guard = self.begin_save(&update.id)?;

        let record = ProspectRecord::from_update(editor.committed(), &update);
        if let Err(e) = self.api.update_prospect(&update.id, &record).await {
            tracing::warn!(prospect_id = %update.id, error = %e, "save failed; edits kept");
            return Err(e.into());
        }
        editor.mark_saved(&update);
        self.refresh(&actor).await;
        Ok(())
    }

    fn begin_save(&self, id: &ProspectId) -> Result<SaveGuard<'_>, PipelineError> {
        match self.saving.entry(id.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                tracing::warn!(prospect_id = %id, "save rejected; another save in flight");
                Err(PipelineError::SaveInProgress(id.clone()))
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(());
                Ok(SaveGuard {
                    saving: &self.saving,
                    id: id.clone(),
                })
            }
        }
    }

    /// Whether a save for `id` is running
    #[must_use]
    pub fn is_saving(&self, id: &ProspectId) -> bool {
        self.saving.contains_key(id)
    }

    /// Irreversibly delete `prospect`
    ///
    /// # Errors
    /// `Workflow(PermissionDenied)` unless owner or admin; `Transport` on failure
    pub async fn delete_prospect(&self, prospect: &Prospect) -> Result<(), PipelineError> {
        let actor = self.actor()?;
        authorize_delete(&actor, prospect)?;
        self.api.delete_prospect(&prospect.id).await?;
        tracing::info!(prospect_id = %prospect.id, user_id = %actor.id, "prospect deleted");
        self.refresh(&actor).await;
        Ok(())
    }

    /// Drop cached prospect lists of `actor` and fetch the primary view again
    async fn refresh(&self, actor: &User) {
        self.prospects
            .invalidate_where(&actor.id, ResourceTag::is_prospects)
            .await;
        let refetched = self.visible_prospects().await;
        tracing::debug!(user_id = %actor.id, count = refetched.len(), "prospect view refreshed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MockProspectApi;
    use crate::error::TransportError;
    use leadflow_model::{AppointmentStatus, Contact, PhoneNumber};
    use leadflow_workflow::BasicInfoUpdate;
    use mockall::predicate::always;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn agent() -> User {
        User::new("a1", "Agent One", Role::Agent).in_group("g1")
    }

    fn pipeline(api: MockProspectApi, user: Option<User>) -> Pipeline {
        let session = match user {
            Some(user) => SessionContext::signed_in(user),
            None => SessionContext::new(),
        };
        Pipeline::new(Arc::new(api), Arc::new(session), PipelineConfig::default())
    }

    fn one_prospect() -> serde_json::Value {
        json!({"prospects": [
            {"id": "p1", "uid": "a1", "groupId": "g1", "name": "Ali", "phone": "+601",
             "currentStage": "prospect"}
        ]})
    }

    #[tokio::test]
    async fn list_failure_degrades_to_empty() {
        let mut api = MockProspectApi::new();
        api.expect_list_prospects()
            .returning(|_, _| Err(TransportError::Network("offline".into())));
        let pipeline = pipeline(api, Some(agent()));
        assert!(pipeline.visible_prospects().await.is_empty());
        assert_eq!(pipeline.dashboard().await, PipelineSummary::default());
    }

    #[tokio::test]
    async fn second_read_is_served_from_cache() {
        let mut api = MockProspectApi::new();
        api.expect_list_prospects()
            .times(1)
            .returning(|_, _| Ok(one_prospect()));
        let pipeline = pipeline(api, Some(agent()));
        assert_eq!(pipeline.visible_prospects().await.len(), 1);
        assert_eq!(pipeline.visible_prospects().await.len(), 1);
    }

    #[tokio::test]
    async fn trainer_without_groups_never_fetches() {
        let api = MockProspectApi::new();
        let trainer = User::new("t1", "Trainer", Role::Trainer);
        let pipeline = pipeline(api, Some(trainer));
        assert!(pipeline.visible_prospects().await.is_empty());
    }

    #[tokio::test]
    async fn no_session_is_an_error_for_writes() {
        let pipeline = pipeline(MockProspectApi::new(), None);
        let err = pipeline
            .create_prospect(&NewProspect::new("Ali", "1"))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::NoSession));
        assert!(pipeline.visible_prospects().await.is_empty());
    }

    #[tokio::test]
    async fn failed_save_keeps_edits_and_releases_guard() {
        let mut api = MockProspectApi::new();
        api.expect_update_prospect()
            .with(always(), always())
            .times(1)
            .returning(|_, _| {
                Err(TransportError::Status {
                    code: 503,
                    message: "unavailable".into(),
                })
            });
        let pipeline = pipeline(api, Some(agent()));

        let prospect = Prospect::new(
            "p1".into(),
            "a1".into(),
            Contact::new("Ali", PhoneNumber::from_suffix("1").unwrap()),
        );
        let mut editor = ProspectEditor::open(agent(), prospect);
        editor
            .set_appointment_status(AppointmentStatus::Scheduled)
            .unwrap();

        let err = pipeline.save(&mut editor).await.unwrap_err();
        assert!(err.is_retryable());
        assert!(editor.is_dirty());
        assert_eq!(
            editor.draft().appointment_status(),
            AppointmentStatus::Scheduled
        );
        assert!(!pipeline.is_saving(&"p1".into()));
    }

    #[tokio::test]
    async fn view_only_save_never_reaches_api() {
        let api = MockProspectApi::new();
        let pipeline = pipeline(api, Some(User::new("a2", "Other", Role::Agent)));
        let prospect = Prospect::new(
            "p1".into(),
            "a1".into(),
            Contact::new("Ali", PhoneNumber::from_suffix("1").unwrap()),
        );
        let mut editor = ProspectEditor::open(User::new("a2", "Other", Role::Agent), prospect);
        assert!(editor
            .edit_basic_info(BasicInfoUpdate::default())
            .unwrap_err()
            .is_permission());
        let err = pipeline.save(&mut editor).await.unwrap_err();
        assert!(err.is_permission());
    }

    #[tokio::test]
    async fn editor_from_previous_session_is_refused() {
        let api = MockProspectApi::new();
        let pipeline = pipeline(api, Some(User::new("a2", "Other", Role::Agent)));
        let prospect = Prospect::new(
            "p1".into(),
            "a1".into(),
            Contact::new("Ali", PhoneNumber::from_suffix("1").unwrap()),
        );
        let mut editor = ProspectEditor::open(agent(), prospect);
        editor
            .set_appointment_status(AppointmentStatus::Kiv)
            .unwrap();

        let err = pipeline.save(&mut editor).await.unwrap_err();
        assert!(err.is_permission());
        assert!(editor.is_dirty());
        assert!(!pipeline.is_saving(&"p1".into()));
    }

    #[tokio::test]
    async fn concurrent_save_is_rejected() {
        let pipeline = pipeline(MockProspectApi::new(), Some(agent()));
        let id = ProspectId::from("p1");
        let guard = pipeline.begin_save(&id).unwrap();
        assert!(matches!(
            pipeline.begin_save(&id),
            Err(PipelineError::SaveInProgress(_))
        ));
        drop(guard);
        assert!(pipeline.begin_save(&id).is_ok());
    }

    #[tokio::test]
    async fn malformed_user_list_yields_empty_leaderboard() {
        let mut api = MockProspectApi::new();
        api.expect_list_users()
            .returning(|| Ok(json!({"unexpected": true})));
        api.expect_list_prospects()
            .returning(|_, _| Ok(one_prospect()));
        let pipeline = pipeline(api, Some(agent()));
        assert!(pipeline.agent_leaderboard().await.is_empty());
    }
}
