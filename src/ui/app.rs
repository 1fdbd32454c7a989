use anyhow::Result;

use crate::catalog::{
    filter_by_search, partition_parents_and_children, CatalogOrigin, CatalogPartition,
    UNKNOWN_PARENT,
};
use crate::config::Settings;
use crate::db::Database;
use crate::models::*;
use crate::session::{Action, Step, WizardState, WizardStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Screen {
    Drafts,
    Select,
    Edit,
    Review,
}

impl Screen {
    pub(crate) fn all() -> &'static [Screen] {
        &[Self::Drafts, Self::Select, Self::Edit, Self::Review]
    }

    /// Wizard step shown by this screen, if any.
    pub(crate) fn step(&self) -> Option<Step> {
        match self {
            Self::Drafts => None,
            Self::Select => Some(Step::Select),
            Self::Edit => Some(Step::Edit),
            Self::Review => Some(Step::Review),
        }
    }

    pub(crate) fn for_step(step: Step) -> Self {
        match step {
            Step::Select => Self::Select,
            Step::Edit => Self::Edit,
            Step::Review => Self::Review,
        }
    }
}

impl std::fmt::Display for Screen {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Drafts => write!(f, "Borradores"),
            Self::Select => write!(f, "{}", Step::Select),
            Self::Edit => write!(f, "{}", Step::Edit),
            Self::Review => write!(f, "{}", Step::Review),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum InputMode {
    Normal,
    Command,
    Search,
    Editing,
    Confirm,
}

impl std::fmt::Display for InputMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Normal => write!(f, "NORMAL"),
            Self::Command => write!(f, "COMMAND"),
            Self::Search => write!(f, "SEARCH"),
            Self::Editing => write!(f, "EDIT"),
            Self::Confirm => write!(f, "CONFIRM"),
        }
    }
}

/// Which part of a draft line the edit prompt writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LineField {
    Quantity,
    Materials,
    Labor,
}

impl LineField {
    pub(crate) fn label(&self) -> &'static str {
        match self {
            Self::Quantity => "cantidad",
            Self::Materials => "P.U. materiales",
            Self::Labor => "P.U. mano de obra",
        }
    }

    /// Patch for the typed value. A blank override clears it.
    pub(crate) fn patch(&self, value: &str) -> LinePatch {
        let value = value.trim();
        let override_value = (!value.is_empty()).then(|| value.to_string());
        match self {
            Self::Quantity => LinePatch::quantity(value),
            Self::Materials => LinePatch::materials_override(override_value),
            Self::Labor => LinePatch::labor_override(override_value),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct EditTarget {
    pub(crate) item_id: String,
    pub(crate) field: LineField,
}

/// Pending action that requires user confirmation.
#[derive(Debug, Clone)]
pub(crate) enum PendingAction {
    DeleteDraft { id: String, name: String },
    NewDraft,
}

/// One row of the selection list.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum SelectRow {
    Chapter { code: i64, label: String },
    Item(CatalogItem),
}

pub(crate) struct App {
    pub(crate) running: bool,
    pub(crate) screen: Screen,
    pub(crate) input_mode: InputMode,
    pub(crate) command_input: String,
    pub(crate) search_input: String,
    pub(crate) status_message: String,
    pub(crate) show_help: bool,

    pub(crate) user: User,
    pub(crate) settings: Settings,
    pub(crate) store: WizardStore,

    // Catalog
    pub(crate) catalog_origin: CatalogOrigin,
    pub(crate) partition: CatalogPartition,
    pub(crate) select_rows: Vec<SelectRow>,
    pub(crate) select_index: usize,
    pub(crate) select_scroll: usize,

    // Edit
    pub(crate) edit_index: usize,
    pub(crate) edit_scroll: usize,
    pub(crate) edit_target: Option<EditTarget>,

    // Review
    pub(crate) review_scroll: usize,

    // Drafts
    pub(crate) drafts: Vec<SavedDraft>,
    pub(crate) draft_index: usize,
    pub(crate) draft_scroll: usize,

    // Confirmation
    pub(crate) pending_action: Option<PendingAction>,
    pub(crate) confirm_message: String,

    // Layout (updated each render frame)
    pub(crate) visible_rows: usize,
}

impl App {
    pub(crate) fn new(
        user: User,
        settings: Settings,
        catalog: &[CatalogItem],
        catalog_origin: CatalogOrigin,
        wizard: WizardState,
    ) -> Self {
        let screen = Screen::for_step(wizard.step);
        let mut app = Self {
            running: true,
            screen,
            input_mode: InputMode::Normal,
            command_input: String::new(),
            search_input: String::new(),
            status_message: String::new(),
            show_help: false,

            user,
            settings,
            store: WizardStore::new(wizard),

            catalog_origin,
            partition: partition_parents_and_children(catalog),
            select_rows: Vec::new(),
            select_index: 0,
            select_scroll: 0,

            edit_index: 0,
            edit_scroll: 0,
            edit_target: None,

            review_scroll: 0,

            drafts: Vec::new(),
            draft_index: 0,
            draft_scroll: 0,

            pending_action: None,
            confirm_message: String::new(),

            visible_rows: 20,
        };
        app.refresh_select_rows();
        app
    }

    pub(crate) fn state(&self) -> &WizardState {
        self.store.state()
    }

    pub(crate) fn dispatch(&mut self, action: Action) {
        self.store.dispatch(action);
    }

    pub(crate) fn refresh_drafts(&mut self, db: &Database) -> Result<()> {
        self.drafts = db.get_drafts_for_user(&self.user.id)?;
        if self.draft_index >= self.drafts.len() {
            self.draft_index = self.drafts.len().saturating_sub(1);
        }
        Ok(())
    }

    /// Rebuild the selection list from the catalog and the live search.
    pub(crate) fn refresh_select_rows(&mut self) {
        let filtered = filter_by_search(&self.partition, &self.search_input);
        let mut rows = Vec::new();
        for parent in &filtered.parents {
            rows.push(SelectRow::Chapter {
                code: parent.code,
                label: parent.chapter.clone(),
            });
            rows.extend(filtered.children_of(parent).iter().cloned().map(SelectRow::Item));
        }
        // Buckets whose chapter entry is missing from the catalog
        for (code, kids) in &filtered.children_by_parent {
            if filtered.parents.iter().any(|p| p.code == *code) || kids.is_empty() {
                continue;
            }
            rows.push(SelectRow::Chapter {
                code: *code,
                label: UNKNOWN_PARENT.to_string(),
            });
            rows.extend(kids.iter().cloned().map(SelectRow::Item));
        }
        self.select_rows = rows;
        if self.select_index >= self.select_rows.len() {
            self.select_index = self.select_rows.len().saturating_sub(1);
        }
        if self.select_scroll > self.select_index {
            self.select_scroll = self.select_index;
        }
    }

    pub(crate) fn selected_item_count(&self) -> usize {
        self.select_rows
            .iter()
            .filter(|r| matches!(r, SelectRow::Item(_)))
            .count()
    }

    /// Item under the cursor on the Edit screen.
    pub(crate) fn edit_item(&self) -> Option<&CatalogItem> {
        self.state().draft.selected.get(self.edit_index)
    }

    pub(crate) fn clamp_edit_index(&mut self) {
        let len = self.state().draft.selected.len();
        if self.edit_index >= len {
            self.edit_index = len.saturating_sub(1);
        }
        if self.edit_scroll > self.edit_index {
            self.edit_scroll = self.edit_index;
        }
    }

    /// Rows available to a list inside a bordered table with a header.
    pub(crate) fn list_page(&self) -> usize {
        self.visible_rows.saturating_sub(3).max(1)
    }

    pub(crate) fn set_status(&mut self, msg: impl Into<String>) {
        self.status_message = msg.into();
    }
}
