//! Debounced patient search box.
//!
//! Keystrokes update the query immediately; the remote lookup only fires once the
//! query has been stable for the debounce period. A lookup that completes after the
//! query moved on (more typing, a selection, a reset) is dropped.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

use crate::config::Timings;
use crate::gateway::PaymentsApi;
use crate::models::Patient;
use crate::timer::TaskSlot;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AutocompleteState {
    pub query: String,
    pub suggestions: Vec<Patient>,
    pub suggestions_visible: bool,
    /// Name written into the box by the last selection
    pub last_accepted: String,
}

impl AutocompleteState {
    /// Suggestions the presentation layer should currently show
    pub fn visible_suggestions(&self) -> &[Patient] {
        if self.suggestions_visible {
            &self.suggestions
        } else {
            &[]
        }
    }
}

struct Inner {
    api: Arc<dyn PaymentsApi>,
    state: watch::Sender<AutocompleteState>,
    selections: mpsc::UnboundedSender<Patient>,
    // Bumped whenever the query changes; a lookup only lands if its tag is still current
    lookup_seq: AtomicU64,
}

impl Inner {
    fn invalidate_lookups(&self) -> u64 {
        self.lookup_seq.fetch_add(1, Ordering::SeqCst) + 1
    }

    async fn lookup(&self, seq: u64, query: String) {
        tracing::debug!("searching patients for {:?}", query);
        let result = self.api.search_patients(&query).await;

        if self.lookup_seq.load(Ordering::SeqCst) != seq {
            tracing::debug!("discarding stale patient lookup for {:?}", query);
            return;
        }

        self.state.send_if_modified(|state| {
            if state.query != query {
                return false;
            }
            match result {
                Ok(patients) => {
                    state.suggestions = patients;
                    state.suggestions_visible = true;
                }
                Err(err) => {
                    // Suggestions are optional; a failed lookup just shows nothing
                    tracing::debug!("patient lookup for {:?} failed: {}", query, err);
                    state.suggestions.clear();
                    state.suggestions_visible = false;
                }
            }
            true
        });
    }
}

/// Search box controller reporting the chosen patient to its owning form.
///
/// Dropping the controller cancels any pending lookup or hide timer.
pub struct PatientAutocomplete {
    inner: Arc<Inner>,
    timings: Timings,
    lookup: TaskSlot,
    blur: TaskSlot,
}

impl PatientAutocomplete {
    /// Returns the controller and the channel on which each selection is sent once.
    pub fn new(
        api: Arc<dyn PaymentsApi>,
        timings: Timings,
    ) -> (Self, mpsc::UnboundedReceiver<Patient>) {
        let (selections, selected) = mpsc::unbounded_channel();
        let (state, _) = watch::channel(AutocompleteState::default());

        let controller = Self {
            inner: Arc::new(Inner {
                api,
                state,
                selections,
                lookup_seq: AtomicU64::new(0),
            }),
            timings,
            lookup: TaskSlot::new(),
            blur: TaskSlot::new(),
        };
        (controller, selected)
    }

    pub fn subscribe(&self) -> watch::Receiver<AutocompleteState> {
        self.inner.state.subscribe()
    }

    pub fn state(&self) -> AutocompleteState {
        self.inner.state.borrow().clone()
    }

    /// A keystroke: `text` is the full content of the search box.
    pub fn input(&self, text: &str) {
        let query = text.to_string();
        self.inner.state.send_modify(|state| state.query = query.clone());
        let seq = self.inner.invalidate_lookups();

        if query.is_empty() {
            self.lookup.cancel();
            self.inner.state.send_modify(|state| {
                state.suggestions.clear();
                state.suggestions_visible = false;
            });
            return;
        }

        // Text written by a selection is not a new search
        if query == self.inner.state.borrow().last_accepted {
            self.lookup.cancel();
            return;
        }

        let inner = self.inner.clone();
        let debounce = self.timings.debounce;
        self.lookup.schedule(async move {
            tokio::time::sleep(debounce).await;
            inner.lookup(seq, query).await;
        });
    }

    pub fn select(&self, patient: Patient) {
        self.lookup.cancel();
        self.inner.invalidate_lookups();

        self.inner.state.send_modify(|state| {
            state.query = patient.name.clone();
            state.last_accepted = patient.name.clone();
            state.suggestions.clear();
            state.suggestions_visible = false;
        });

        tracing::debug!("selected patient {} ({})", patient.id, patient.name);
        // The owning form may already be gone
        let _ = self.inner.selections.send(patient);
    }

    /// Select the suggestion at `index` of the visible list, if any.
    pub fn select_index(&self, index: usize) -> Option<Patient> {
        let patient = self
            .inner
            .state
            .borrow()
            .visible_suggestions()
            .get(index)
            .cloned()?;
        self.select(patient.clone());
        Some(patient)
    }

    /// Back to the initial state, e.g. after the owning form was submitted.
    pub fn reset(&self) {
        self.lookup.cancel();
        self.blur.cancel();
        self.inner.invalidate_lookups();
        self.inner.state.send_replace(AutocompleteState::default());
    }

    /// Hide suggestions after a grace delay, so a click on a suggestion still lands.
    pub fn blur(&self) {
        let inner = self.inner.clone();
        let grace = self.timings.blur_grace;
        self.blur.schedule(async move {
            tokio::time::sleep(grace).await;
            inner.state.send_if_modified(|state| {
                let was_visible = state.suggestions_visible;
                state.suggestions_visible = false;
                was_visible
            });
        });
    }

    /// Reopen the last known suggestions without querying again.
    pub fn focus(&self) {
        self.blur.cancel();
        self.inner.state.send_if_modified(|state| {
            if state.query.is_empty() || state.suggestions_visible {
                return false;
            }
            state.suggestions_visible = true;
            true
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::InMemoryGateway;
    use std::time::Duration;
    use tokio::time::sleep;

    fn setup() -> (
        Arc<InMemoryGateway>,
        PatientAutocomplete,
        mpsc::UnboundedReceiver<Patient>,
    ) {
        let gateway = Arc::new(InMemoryGateway::new());
        gateway.seed_patient("Jane Doe");
        gateway.seed_patient("John Smith");
        gateway.seed_patient("Janet King");
        let (autocomplete, selected) = PatientAutocomplete::new(gateway.clone(), Timings::default());
        (gateway, autocomplete, selected)
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_query_never_hits_the_gateway() {
        let (gateway, autocomplete, _selected) = setup();

        autocomplete.input("");
        sleep(Duration::from_secs(1)).await;
        assert!(gateway.searches().is_empty());

        autocomplete.input("J");
        sleep(Duration::from_millis(100)).await;
        autocomplete.input("");
        sleep(Duration::from_secs(1)).await;

        assert!(gateway.searches().is_empty());
        let state = autocomplete.state();
        assert!(state.suggestions.is_empty());
        assert!(!state.suggestions_visible);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fast_typing_issues_one_lookup() {
        let (gateway, autocomplete, _selected) = setup();

        autocomplete.input("a");
        sleep(Duration::from_millis(100)).await;
        autocomplete.input("ab");
        sleep(Duration::from_millis(100)).await;
        autocomplete.input("abc");
        // Query updates synchronously, before any lookup
        assert_eq!(autocomplete.state().query, "abc");
        assert!(gateway.searches().is_empty());

        sleep(Duration::from_millis(400)).await;
        assert_eq!(gateway.searches(), vec!["abc".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_lookup_populates_visible_suggestions() {
        let (gateway, autocomplete, _selected) = setup();

        autocomplete.input("jan");
        sleep(Duration::from_millis(299)).await;
        assert!(gateway.searches().is_empty());

        sleep(Duration::from_millis(50)).await;
        let state = autocomplete.state();
        assert!(state.suggestions_visible);
        let names: Vec<_> = state.visible_suggestions().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Jane Doe", "Janet King"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_selection_sets_text_without_new_lookup() {
        let (gateway, autocomplete, mut selected) = setup();

        autocomplete.input("Jane");
        sleep(Duration::from_millis(400)).await;
        assert_eq!(gateway.searches().len(), 1);

        let picked = autocomplete.select_index(0).unwrap();
        assert_eq!(picked.name, "Jane Doe");

        let state = autocomplete.state();
        assert_eq!(state.query, "Jane Doe");
        assert_eq!(state.last_accepted, "Jane Doe");
        assert!(state.suggestions.is_empty());
        assert!(!state.suggestions_visible);

        // Emitted exactly once
        assert_eq!(selected.try_recv().unwrap(), picked);
        assert!(selected.try_recv().is_err());

        // The box echoing the selected name is not a new search
        autocomplete.input("Jane Doe");
        sleep(Duration::from_secs(1)).await;
        assert_eq!(gateway.searches().len(), 1);

        // Editing it afterwards is
        autocomplete.input("Jane Do");
        sleep(Duration::from_secs(1)).await;
        assert_eq!(gateway.searches().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_selection_beats_in_flight_lookup() {
        let (gateway, autocomplete, _selected) = setup();
        gateway.set_search_delay(Some(Duration::from_millis(500)));

        autocomplete.input("Ja");
        sleep(Duration::from_millis(400)).await;
        assert_eq!(gateway.searches().len(), 1);

        autocomplete.select(Patient {
            id: 1,
            name: "Jane Doe".to_string(),
        });
        sleep(Duration::from_secs(2)).await;

        let state = autocomplete.state();
        assert_eq!(state.query, "Jane Doe");
        assert!(state.suggestions.is_empty());
        assert!(!state.suggestions_visible);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_returns_to_initial_state() {
        let (gateway, autocomplete, _selected) = setup();

        autocomplete.input("Jane");
        sleep(Duration::from_millis(400)).await;
        autocomplete.select_index(0);

        autocomplete.input("Jo");
        autocomplete.reset();
        sleep(Duration::from_secs(1)).await;

        assert_eq!(gateway.searches().len(), 1);
        assert_eq!(autocomplete.state(), AutocompleteState::default());
    }

    #[tokio::test(start_paused = true)]
    async fn test_blur_hides_after_grace_and_focus_reopens() {
        let (gateway, autocomplete, _selected) = setup();

        autocomplete.input("Jo");
        sleep(Duration::from_millis(400)).await;
        assert!(autocomplete.state().suggestions_visible);

        autocomplete.blur();
        sleep(Duration::from_millis(150)).await;
        assert!(autocomplete.state().suggestions_visible);
        sleep(Duration::from_millis(100)).await;
        assert!(!autocomplete.state().suggestions_visible);

        autocomplete.focus();
        let state = autocomplete.state();
        assert!(state.suggestions_visible);
        assert_eq!(state.visible_suggestions().len(), 1);
        assert_eq!(gateway.searches().len(), 1);

        // Focus regained within the grace period keeps the list open
        autocomplete.blur();
        sleep(Duration::from_millis(100)).await;
        autocomplete.focus();
        sleep(Duration::from_millis(500)).await;
        assert!(autocomplete.state().suggestions_visible);
    }

    #[tokio::test(start_paused = true)]
    async fn test_focus_with_empty_query_stays_closed() {
        let (_gateway, autocomplete, _selected) = setup();

        autocomplete.focus();
        assert!(!autocomplete.state().suggestions_visible);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_lookup_is_swallowed() {
        let (gateway, autocomplete, _selected) = setup();
        gateway.fail_with(Some("search unavailable"));

        autocomplete.input("Jane");
        sleep(Duration::from_millis(400)).await;

        assert_eq!(gateway.searches().len(), 1);
        let state = autocomplete.state();
        assert_eq!(state.query, "Jane");
        assert!(state.suggestions.is_empty());
        assert!(!state.suggestions_visible);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels_pending_lookup() {
        let (gateway, autocomplete, _selected) = setup();

        autocomplete.input("Jane");
        drop(autocomplete);
        sleep(Duration::from_secs(1)).await;

        assert!(gateway.searches().is_empty());
    }
}
