pub mod migrate;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::models::{BudgetDraft, CatalogItem, LinePatch, SavedDraft};
use migrate::CURRENT_STATE_VERSION;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Step {
    #[default]
    Select,
    Edit,
    Review,
}

impl Step {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Select => "Selección",
            Self::Edit => "Cantidades",
            Self::Review => "Revisión",
        }
    }
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Everything one wizard session needs. Owned by a [`WizardStore`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WizardState {
    pub step: Step,
    pub name: String,
    pub draft_id: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub include_materials: bool,
    pub draft: BudgetDraft,
}

impl Default for WizardState {
    fn default() -> Self {
        Self {
            step: Step::Select,
            name: String::new(),
            draft_id: None,
            created_at: None,
            updated_at: None,
            include_materials: true,
            draft: BudgetDraft::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    SetStep(Step),
    ToggleSelect(CatalogItem),
    SetLine { item_id: String, patch: LinePatch },
    SetMarkup(String),
    SetName(String),
    SetIncludeMaterials(bool),
    Load(SavedDraft),
    MarkSaved {
        draft_id: String,
        created_at: String,
        updated_at: String,
    },
    /// Start over with the given markup.
    Reset { markup: String },
}

impl WizardState {
    pub fn fresh(markup: &str) -> Self {
        Self {
            draft: BudgetDraft::new(markup),
            ..Default::default()
        }
    }

    pub fn apply(&mut self, action: &Action) {
        match action {
            Action::SetStep(step) => self.step = *step,
            Action::ToggleSelect(item) => {
                self.draft.toggle(item);
            }
            Action::SetLine { item_id, patch } => {
                self.draft.set_line_patch(item_id, patch);
            }
            Action::SetMarkup(value) => self.draft.set_markup(value.clone()),
            Action::SetName(name) => self.name = name.clone(),
            Action::SetIncludeMaterials(include) => self.include_materials = *include,
            Action::Load(saved) => {
                *self = Self {
                    step: if saved.draft.can_edit() {
                        Step::Edit
                    } else {
                        Step::Select
                    },
                    name: saved.name.clone(),
                    draft_id: Some(saved.id.clone()),
                    created_at: Some(saved.created_at.clone()),
                    updated_at: Some(saved.updated_at.clone()),
                    include_materials: saved.include_materials,
                    draft: saved.draft.clone(),
                };
            }
            Action::MarkSaved {
                draft_id,
                created_at,
                updated_at,
            } => {
                self.draft_id = Some(draft_id.clone());
                self.created_at = Some(created_at.clone());
                self.updated_at = Some(updated_at.clone());
            }
            Action::Reset { markup } => *self = Self::fresh(markup),
        }
    }

    /// Whether the wizard may move to `step` from the current draft.
    pub fn can_enter(&self, step: Step) -> bool {
        match step {
            Step::Select => true,
            Step::Edit => self.draft.can_edit(),
            Step::Review => self.draft.can_review(),
        }
    }

    /// Snapshot for storage. A never-saved session gets a fresh id and equal
    /// timestamps (create); a saved one keeps its id and `created_at` (update).
    pub fn to_saved_draft(&self, user_id: &str, now: &str) -> SavedDraft {
        let (id, created_at) = match (&self.draft_id, &self.created_at) {
            (Some(id), Some(created)) => (id.clone(), created.clone()),
            _ => (uuid::Uuid::new_v4().to_string(), now.to_string()),
        };
        SavedDraft {
            id,
            user_id: user_id.to_string(),
            name: self.name.clone(),
            created_at,
            updated_at: now.to_string(),
            include_materials: self.include_materials,
            draft: self.draft.clone(),
        }
    }
}

// ── Store ─────────────────────────────────────────────────────

/// Receives every action after it has been applied.
pub trait SessionObserver {
    fn notify(&mut self, state: &WizardState, action: &Action);
}

impl<F> SessionObserver for F
where
    F: FnMut(&WizardState, &Action),
{
    fn notify(&mut self, state: &WizardState, action: &Action) {
        self(state, action)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

pub struct WizardStore {
    state: WizardState,
    observers: Vec<(SubscriptionId, Box<dyn SessionObserver>)>,
    next_id: u64,
}

impl WizardStore {
    pub fn new(state: WizardState) -> Self {
        Self {
            state,
            observers: Vec::new(),
            next_id: 0,
        }
    }

    pub fn state(&self) -> &WizardState {
        &self.state
    }

    pub fn dispatch(&mut self, action: Action) {
        self.state.apply(&action);
        for (_, observer) in self.observers.iter_mut() {
            observer.notify(&self.state, &action);
        }
    }

    pub fn subscribe(&mut self, observer: impl SessionObserver + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.observers.push((id, Box::new(observer)));
        id
    }

    /// Returns false if `id` was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(sid, _)| *sid != id);
        self.observers.len() != before
    }
}

// ── Persistence boundary ──────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedState {
    pub schema_version: u32,
    /// Signed-in user, if any.
    pub user_id: Option<String>,
    pub wizard: WizardState,
}

impl PersistedState {
    pub fn new(user_id: Option<String>, wizard: WizardState) -> Self {
        Self {
            schema_version: CURRENT_STATE_VERSION,
            user_id,
            wizard,
        }
    }
}

impl Default for PersistedState {
    fn default() -> Self {
        Self::new(None, WizardState::default())
    }
}

/// `state.json` on disk.
#[derive(Debug, Clone)]
pub struct StateFile {
    path: PathBuf,
}

impl StateFile {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load and upgrade the saved state. A missing file yields the default
    /// state; an unreadable one is discarded with a warning.
    pub fn load(&self) -> PersistedState {
        if !self.path.exists() {
            return PersistedState::default();
        }
        match self.try_load() {
            Ok(state) => state,
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %format!("{e:#}"),
                    "discarding unreadable state file"
                );
                PersistedState::default()
            }
        }
    }

    fn try_load(&self) -> Result<PersistedState> {
        let contents = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read state file: {}", self.path.display()))?;
        let value: serde_json::Value =
            serde_json::from_str(&contents).context("State file is not valid JSON")?;
        migrate::migrate(value)
    }

    pub fn save(&self, state: &PersistedState) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let contents = serde_json::to_string_pretty(state).context("Failed to serialize state")?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, contents)
            .with_context(|| format!("Failed to write state file: {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace state file: {}", self.path.display()))
    }
}
