//! The runtime enforcer

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use rolegate_service::ConfigClient;
use rolegate_types::{MarkerDecl, MarkerId, Principal};
use rolegate_view::{
    FragmentId, MarkedFragment, ViewChange, ViewChangeWatcher, ViewError, ViewTree,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::config::EnforcerConfig;
use crate::context::{AccessDecider, AuthorizationContext, EnforcerState};
use crate::error::{EnforcerError, EnforcerResult};
use crate::rescan::RescanScheduler;

/// Outcome of one enforcement sweep
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnforcementReport {
    pub kept: usize,
    /// Detached, including fragments already gone with an ancestor
    pub removed: usize,
    /// Could not be detached; left inert and hidden
    pub hidden: usize,
    /// Previously withheld fragments handed back to the view
    pub restored: usize,
}

impl EnforcementReport {
    pub fn denied(&self) -> usize {
        self.removed + self.hidden
    }
}

/// Fragments the enforcer took away from the view, by how it did so
#[derive(Default)]
struct Withheld {
    detached: BTreeMap<FragmentId, MarkerId>,
    hidden: BTreeMap<FragmentId, MarkerId>,
}

/// Keeps a view consistent with the access map and the active principal.
///
/// An enforcer remembers what it withheld from the view it sweeps, so a
/// later sweep can give back whatever the new principal is allowed to see.
/// Use one enforcer per view.
pub struct Enforcer {
    context: Arc<AuthorizationContext>,
    client: Arc<dyn ConfigClient>,
    rescan: Mutex<Option<RescanScheduler>>,
    withheld: Mutex<Withheld>,
}

impl Enforcer {
    /// Create an enforcer talking to `client`.
    ///
    /// The marker rescan needs a Tokio runtime; outside one the enforcer
    /// still decides fragments but never persists observed markers.
    pub fn new(config: &EnforcerConfig, client: Arc<dyn ConfigClient>) -> Self {
        let context = Arc::new(AuthorizationContext::new(config.missing_config));
        let rescan = match tokio::runtime::Handle::try_current() {
            Ok(_) => Some(RescanScheduler::spawn(
                context.clone(),
                client.clone(),
                config.debounce(),
            )),
            Err(_) => {
                warn!("No async runtime, marker rescan disabled");
                None
            }
        };

        Self {
            context,
            client,
            rescan: Mutex::new(rescan),
            withheld: Mutex::new(Withheld::default()),
        }
    }

    pub fn context(&self) -> &Arc<AuthorizationContext> {
        &self.context
    }

    pub fn client(&self) -> &Arc<dyn ConfigClient> {
        &self.client
    }

    /// Load the access configuration. On failure the enforcer stays
    /// uninitialized and the error is logged.
    pub async fn initialize(&self) -> EnforcerResult<()> {
        self.load("initialize").await
    }

    /// Refresh the access configuration. On failure the previous
    /// configuration, if any, stays in effect.
    pub async fn reload(&self) -> EnforcerResult<()> {
        self.load("reload").await
    }

    async fn load(&self, reason: &'static str) -> EnforcerResult<()> {
        match self.client.load_config().await {
            Ok(config) => {
                info!(
                    reason,
                    roles = config.roles.len(),
                    markers = config.markers.marker_count(),
                    version = config.version,
                    "Access config loaded"
                );
                self.context.install_config(config)
            }
            Err(e) => {
                error!(reason, error = %e, state = ?self.state(), "Failed to load access config");
                Err(EnforcerError::Service(e))
            }
        }
    }

    pub fn state(&self) -> EnforcerState {
        self.context.state()
    }

    pub fn check_access(&self, marker: &str) -> bool {
        self.context.check_access(marker)
    }

    /// Sweep every marked fragment of `view`. Withheld fragments the
    /// principal may now see are given back first; without a principal every
    /// marked fragment is detached.
    pub fn apply_access_rules(&self, view: &mut dyn ViewTree) -> EnforcementReport {
        let decider = self.decider();
        let mut report = EnforcementReport {
            restored: self.release(view, &decider),
            ..EnforcementReport::default()
        };

        let fragments = view.marked_fragments();
        self.schedule_rescan(fragments.iter().map(|f| f.marker.clone()).collect());
        self.enforce(view, &fragments, &decider, &mut report);
        debug!(
            kept = report.kept,
            removed = report.removed,
            hidden = report.hidden,
            restored = report.restored,
            "Access rules applied"
        );
        report
    }

    /// Replace the active principal and re-sweep the whole view
    pub fn set_current_principal(
        &self,
        principal: Option<Principal>,
        view: &mut dyn ViewTree,
    ) -> EnforcerResult<EnforcementReport> {
        match &principal {
            Some(p) => info!(role = %p.role, user = ?p.user_id, "Principal signed in"),
            None => info!("Principal cleared"),
        }
        self.context.set_principal(principal)?;
        Ok(self.apply_access_rules(view))
    }

    /// Queue markers for the debounced rescan
    pub fn schedule_rescan(&self, markers: Vec<MarkerDecl>) {
        let rescan = match self.rescan.lock() {
            Ok(rescan) => rescan,
            Err(_) => {
                error!("Rescan lock poisoned, dropping observed markers");
                return;
            }
        };
        if let Some(scheduler) = rescan.as_ref() {
            if !scheduler.schedule(markers) {
                warn!("Rescan scheduler stopped, dropping observed markers");
            }
        }
    }

    /// Drop the configuration and principal, flush pending rescans
    pub async fn teardown(&self) -> EnforcerResult<()> {
        let scheduler = self
            .rescan
            .lock()
            .map_err(|_| EnforcerError::LockError)?
            .take();
        if let Some(scheduler) = scheduler {
            scheduler.shutdown().await;
        }
        *self.withheld.lock().map_err(|_| EnforcerError::LockError)? = Withheld::default();
        self.context.clear()?;
        info!("Enforcer torn down");
        Ok(())
    }

    fn decider(&self) -> AccessDecider {
        self.context.sweep_decider().unwrap_or_else(|e| {
            error!(error = %e, "Failed to read authorization state, denying all");
            AccessDecider::DenyAll
        })
    }

    /// Reattach or unhide withheld fragments that `decider` now allows.
    /// The lock is not held while the view is mutated.
    fn release(&self, view: &mut dyn ViewTree, decider: &AccessDecider) -> usize {
        let (detached, hidden) = match self.withheld.lock() {
            Ok(withheld) => (withheld.detached.clone(), withheld.hidden.clone()),
            Err(_) => {
                error!("Withheld fragment lock poisoned, nothing restored");
                return 0;
            }
        };

        let mut restored = 0;
        let mut forget = vec![];
        for (fragment, marker) in &detached {
            if !decider.allows(marker.as_str()) {
                continue;
            }
            match view.reattach(*fragment) {
                Ok(()) => {
                    restored += 1;
                    forget.push(*fragment);
                }
                Err(ViewError::NotFound(_)) => forget.push(*fragment),
                Err(e) => warn!(fragment = %fragment, error = %e, "Failed to reattach fragment"),
            }
        }
        for (fragment, marker) in &hidden {
            if !decider.allows(marker.as_str()) {
                continue;
            }
            match view.restore(*fragment) {
                Ok(()) => {
                    restored += 1;
                    forget.push(*fragment);
                }
                Err(ViewError::NotFound(_)) => forget.push(*fragment),
                Err(e) => warn!(fragment = %fragment, error = %e, "Failed to unhide fragment"),
            }
        }

        if let Ok(mut withheld) = self.withheld.lock() {
            for fragment in &forget {
                withheld.detached.remove(fragment);
                withheld.hidden.remove(fragment);
            }
        }
        restored
    }

    /// Detach each denied fragment, hiding it when detaching is refused
    fn enforce(
        &self,
        view: &mut dyn ViewTree,
        fragments: &[MarkedFragment],
        decider: &AccessDecider,
        report: &mut EnforcementReport,
    ) {
        let mut detached = vec![];
        let mut hidden = vec![];

        for marked in fragments {
            if decider.allows(marked.marker.id.as_str()) {
                report.kept += 1;
                continue;
            }

            match view.detach(marked.fragment) {
                Ok(()) => {
                    report.removed += 1;
                    detached.push((marked.fragment, marked.marker.id.clone()));
                }
                Err(ViewError::NotFound(_)) => report.removed += 1,
                Err(e) => {
                    warn!(
                        fragment = %marked.fragment,
                        marker = %marked.marker.id,
                        error = %e,
                        "Detach refused, hiding fragment"
                    );
                    match view.disable_and_hide(marked.fragment) {
                        Ok(()) => {
                            report.hidden += 1;
                            hidden.push((marked.fragment, marked.marker.id.clone()));
                        }
                        Err(ViewError::NotFound(_)) => report.removed += 1,
                        Err(e) => error!(
                            fragment = %marked.fragment,
                            error = %e,
                            "Failed to hide denied fragment"
                        ),
                    }
                }
            }
        }

        match self.withheld.lock() {
            Ok(mut withheld) => {
                withheld.detached.extend(detached);
                withheld.hidden.extend(hidden);
            }
            Err(_) => error!("Withheld fragment lock poisoned, denied fragments cannot be restored"),
        }
    }
}

impl ViewChangeWatcher for Enforcer {
    fn on_change(&self, view: &mut dyn ViewTree, change: &ViewChange) {
        let ViewChange::Inserted(fragments) = change else {
            return;
        };

        self.schedule_rescan(fragments.iter().map(|f| f.marker.clone()).collect());

        let mut report = EnforcementReport::default();
        self.enforce(view, fragments, &self.decider(), &mut report);
        debug!(
            inserted = fragments.len(),
            removed = report.removed,
            hidden = report.hidden,
            "Inserted fragments decided"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MissingConfigPolicy;
    use crate::testing::ScriptedClient;
    use rolegate_types::{AccessMap, MarkerAttributes};
    use rolegate_view::{FragmentSpec, InMemoryView, HIDDEN_MARK_ATTRIBUTE};

    fn marked(id: &str) -> FragmentSpec {
        FragmentSpec::new("button").marker(&MarkerDecl::root(id), &MarkerAttributes::default())
    }

    fn client() -> Arc<ScriptedClient> {
        Arc::new(ScriptedClient::new(
            AccessMap::new()
                .with_grants("User", ["view-x"])
                .with_grants("Admin", ["view-x", "edit-x"]),
        ))
    }

    async fn loaded_enforcer() -> Arc<Enforcer> {
        let enforcer = Arc::new(Enforcer::new(&EnforcerConfig::default(), client()));
        enforcer.initialize().await.unwrap();
        enforcer
    }

    #[tokio::test]
    async fn no_principal_removes_every_marked_fragment() {
        let enforcer = loaded_enforcer().await;
        let mut view = InMemoryView::default();
        let root = view.root();
        for i in 0..5 {
            view.insert(root, marked(&format!("m-{}", i))).unwrap();
        }
        view.insert(root, FragmentSpec::new("p")).unwrap();

        let report = enforcer.apply_access_rules(&mut view);
        assert_eq!(report.removed, 5);
        assert!(view.marked_fragments().is_empty());
        assert_eq!(view.len(), 2);
    }

    #[tokio::test]
    async fn role_keeps_exactly_its_allow_list() {
        let enforcer = loaded_enforcer().await;
        let mut view = InMemoryView::default();
        let root = view.root();
        let view_x = view.insert(root, marked("view-x")).unwrap();
        let edit_x = view.insert(root, marked("edit-x")).unwrap();

        let report = enforcer
            .set_current_principal(Some(Principal::new("User")), &mut view)
            .unwrap();
        assert_eq!(
            report,
            EnforcementReport { kept: 1, removed: 1, hidden: 0, restored: 0 }
        );
        assert!(view.contains(view_x));
        assert!(!view.contains(edit_x));
    }

    #[tokio::test]
    async fn role_upgrade_gives_back_detached_fragments() {
        let enforcer = loaded_enforcer().await;
        let mut view = InMemoryView::default();
        let root = view.root();
        let view_x = view.insert(root, marked("view-x")).unwrap();
        let edit_x = view.insert(root, marked("edit-x")).unwrap();

        enforcer.apply_access_rules(&mut view);
        assert!(view.marked_fragments().is_empty());

        let report = enforcer
            .set_current_principal(Some(Principal::new("User")), &mut view)
            .unwrap();
        assert_eq!(
            report,
            EnforcementReport { kept: 1, removed: 0, hidden: 0, restored: 1 }
        );
        assert!(view.contains(view_x));
        assert!(!view.contains(edit_x));

        let report = enforcer
            .set_current_principal(Some(Principal::new("Admin")), &mut view)
            .unwrap();
        assert_eq!(report.restored, 1);
        assert_eq!(report.kept, 2);
        view.dispatch_click(edit_x).unwrap();
        assert_eq!(view.click_count(edit_x), 1);
    }

    #[tokio::test]
    async fn hidden_fragment_is_restored_when_granted() {
        let enforcer = loaded_enforcer().await;
        let mut view = InMemoryView::default();
        let root = view.root();
        let edit_x = view.insert(root, marked("edit-x").pinned()).unwrap();

        enforcer
            .set_current_principal(Some(Principal::new("User")), &mut view)
            .unwrap();
        assert!(view.is_hidden(edit_x));

        let report = enforcer
            .set_current_principal(Some(Principal::new("Admin")), &mut view)
            .unwrap();
        assert_eq!(report.restored, 1);
        assert!(!view.is_hidden(edit_x));
        assert!(view.is_interactive(edit_x));
        assert_eq!(view.attribute(edit_x, HIDDEN_MARK_ATTRIBUTE), None);
    }

    #[tokio::test]
    async fn full_sweep_feeds_rendered_markers_to_rescan() {
        let client = client();
        let config = EnforcerConfig {
            debounce_ms: 10,
            ..EnforcerConfig::default()
        };
        let enforcer = Enforcer::new(&config, client.clone());
        enforcer.initialize().await.unwrap();

        let mut view = InMemoryView::default();
        let root = view.root();
        view.insert(root, marked("view-x")).unwrap();
        view.insert(root, marked("edit-x")).unwrap();
        enforcer
            .set_current_principal(Some(Principal::new("User")), &mut view)
            .unwrap();

        enforcer.teardown().await.unwrap();
        let forest = client.last_update().unwrap();
        assert!(forest.contains("view-x"));
        assert!(forest.contains("edit-x"));
    }

    #[tokio::test]
    async fn pinned_fragment_is_hidden_and_inert() {
        let enforcer = loaded_enforcer().await;
        let mut view = InMemoryView::default();
        let root = view.root();
        let edit_x = view.insert(root, marked("edit-x").pinned()).unwrap();

        let report = enforcer.apply_access_rules(&mut view);
        assert_eq!(report.hidden, 1);
        assert!(view.is_hidden(edit_x));
        assert!(!view.is_interactive(edit_x));
    }

    #[tokio::test]
    async fn nested_denied_fragments_count_as_removed() {
        let enforcer = loaded_enforcer().await;
        let mut view = InMemoryView::default();
        let root = view.root();
        view.insert(root, marked("edit-x").child(marked("view-x"))).unwrap();

        let report = enforcer.apply_access_rules(&mut view);
        assert_eq!(report.denied(), 2);
        assert!(view.marked_fragments().is_empty());
    }

    #[tokio::test]
    async fn failed_load_stays_uninitialized() {
        let enforcer = Enforcer::new(&EnforcerConfig::default(), Arc::new(ScriptedClient::failing()));
        assert!(enforcer.initialize().await.is_err());
        assert_eq!(enforcer.state(), EnforcerState::Uninitialized);
        assert!(!enforcer.check_access("view-x"));
    }

    #[tokio::test]
    async fn fail_open_allows_before_load() {
        let config = EnforcerConfig {
            missing_config: MissingConfigPolicy::FailOpen,
            ..EnforcerConfig::default()
        };
        let enforcer = Enforcer::new(&config, Arc::new(ScriptedClient::failing()));
        assert!(enforcer.initialize().await.is_err());
        assert!(enforcer.check_access("anything"));
    }

    #[tokio::test]
    async fn inserted_fragment_is_decided_before_click() {
        let enforcer = loaded_enforcer().await;
        let mut view = InMemoryView::default();
        view.watch(enforcer.clone());
        enforcer
            .set_current_principal(Some(Principal::new("User")), &mut view)
            .unwrap();

        let root = view.root();
        let edit_x = view.insert(root, marked("edit-x")).unwrap();
        assert!(view.dispatch_click(edit_x).is_err());
        assert_eq!(view.click_count(edit_x), 0);

        let view_x = view.insert(root, marked("view-x")).unwrap();
        view.dispatch_click(view_x).unwrap();
        assert_eq!(view.click_count(view_x), 1);
    }

    #[tokio::test]
    async fn teardown_clears_state() {
        let enforcer = loaded_enforcer().await;
        let mut view = InMemoryView::default();
        enforcer
            .set_current_principal(Some(Principal::new("Admin")), &mut view)
            .unwrap();
        assert!(matches!(enforcer.state(), EnforcerState::LoadedSession(_)));

        enforcer.teardown().await.unwrap();
        assert_eq!(enforcer.state(), EnforcerState::Uninitialized);
    }
}
