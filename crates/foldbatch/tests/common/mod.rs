//! Scripted in-memory job form shared by the integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::io::Cursor;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use foldbatch::{
    ArtifactStream, ElementHandle, FoldError, FoldResult, Locator, Locators, Manifest,
    ManifestEntry, RemoteForm, Settings, Timings,
};

/// Every element the drivers address, as the form sees it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Role {
    Login,
    AddEntity,
    Clear,
    SequenceInput,
    SaveJob,
    ContinuePreview,
    PreviewDialog,
    JobNameInput,
    JobNameFallback,
    FocusedInput,
    SeedToggle,
    ConfirmSubmit,
    Filter(String),
    JobTable,
    JobRows,
    DownloadItem,
}

#[derive(Debug, Clone)]
enum Node {
    Role(Role),
    Row(usize),
    RowName(usize),
    RowActions(usize),
}

/// Observable state of the scripted form.
#[derive(Debug, Default)]
pub struct FormState {
    next_id: u64,
    nodes: HashMap<u64, Node>,

    /// Roles that never become visible.
    pub missing: HashSet<Role>,
    /// Roles whose native click fails.
    pub click_fails: HashSet<Role>,
    /// Answers for successive enabled checks; `true` once exhausted.
    pub validation: VecDeque<bool>,
    pub enabled_checks: usize,
    pub toggle_checked: bool,
    pub toggle_clicks: usize,
    pub dialog_never_closes: bool,

    pub sequence: String,
    pub job_name: String,
    /// Every keystroke batch sent to the sequence field.
    pub keystrokes: Vec<String>,
    /// (job name, sequence) captured at each confirm click.
    pub submitted: Vec<(String, String)>,
    pub entities_added: usize,
    pub clears: usize,
    pub scripted_clicks: Vec<Role>,

    /// Display names of listed rows, untrimmed.
    pub rows: Vec<String>,
    /// Absent filter chips.
    pub missing_chips: HashSet<String>,
    pub filters_clicked: Vec<String>,
    open_menu: Option<usize>,
    pub downloads: Vec<String>,
    /// Row queries fail as if the page dropped mid-read.
    pub listing_fails: bool,
    pub handle_releases: usize,
}

pub struct ScriptedForm {
    locators: Locators,
    pub state: Mutex<FormState>,
}

impl ScriptedForm {
    pub fn new() -> Self {
        Self::with(|_| {})
    }

    pub fn with(setup: impl FnOnce(&mut FormState)) -> Self {
        let mut state = FormState::default();
        setup(&mut state);
        Self {
            locators: Locators::default(),
            state: Mutex::new(state),
        }
    }

    pub fn listing(rows: &[&str]) -> Self {
        Self::with(|s| s.rows = rows.iter().map(|r| format!("  {r}  ")).collect())
    }

    pub fn state(&self) -> std::sync::MutexGuard<'_, FormState> {
        self.state.lock().unwrap()
    }

    fn role(&self, locator: &Locator) -> Option<Role> {
        let l = &self.locators;
        let role = if locator == &l.login {
            Role::Login
        } else if locator == &l.add_entity {
            Role::AddEntity
        } else if locator == &l.clear {
            Role::Clear
        } else if locator == &l.sequence_input {
            Role::SequenceInput
        } else if locator == &l.save_job {
            Role::SaveJob
        } else if locator == &l.continue_preview {
            Role::ContinuePreview
        } else if locator == &l.preview_dialog {
            Role::PreviewDialog
        } else if locator == &l.job_name_input {
            Role::JobNameInput
        } else if locator == &l.job_name_fallback {
            Role::JobNameFallback
        } else if locator == &l.focused_input {
            Role::FocusedInput
        } else if locator == &l.seed_toggle {
            Role::SeedToggle
        } else if locator == &l.confirm_submit {
            Role::ConfirmSubmit
        } else if locator == &l.job_table {
            Role::JobTable
        } else if locator == &l.job_rows {
            Role::JobRows
        } else if locator == &l.download_item {
            Role::DownloadItem
        } else if locator.css == l.filter_chip.css {
            Role::Filter(locator.text.clone().unwrap_or_default())
        } else {
            return None;
        };
        Some(role)
    }

    fn visible(state: &FormState, role: &Role) -> bool {
        match role {
            Role::Filter(label) => !state.missing_chips.contains(label),
            other => !state.missing.contains(other),
        }
    }

    fn node(&self, element: &ElementHandle) -> FoldResult<Node> {
        self.state()
            .nodes
            .get(&element.id())
            .cloned()
            .ok_or_else(|| FoldError::ElementNotFound(format!("stale handle {}", element.id())))
    }

    fn apply_click(state: &mut FormState, node: &Node) {
        match node {
            Node::Role(Role::AddEntity) => state.entities_added += 1,
            Node::Role(Role::Clear) => {
                state.clears += 1;
                state.sequence.clear();
                state.job_name.clear();
            }
            Node::Role(Role::SeedToggle) => {
                state.toggle_checked = !state.toggle_checked;
                state.toggle_clicks += 1;
            }
            Node::Role(Role::ConfirmSubmit) => {
                let job = (state.job_name.clone(), state.sequence.clone());
                state.submitted.push(job);
            }
            Node::Role(Role::Filter(label)) => state.filters_clicked.push(label.clone()),
            Node::RowActions(i) => state.open_menu = Some(*i),
            _ => {}
        }
    }
}

fn alloc(state: &mut FormState, node: Node) -> ElementHandle {
    state.next_id += 1;
    state.nodes.insert(state.next_id, node);
    ElementHandle::new(state.next_id)
}

#[async_trait]
impl RemoteForm for ScriptedForm {
    async fn wait_visible(&self, locator: &Locator, timeout: Duration) -> FoldResult<ElementHandle> {
        let role = self
            .role(locator)
            .ok_or_else(|| FoldError::ElementNotFound(locator.to_string()))?;
        let mut state = self.state();
        if !Self::visible(&state, &role) {
            return Err(FoldError::timeout(locator.to_string(), timeout));
        }
        Ok(alloc(&mut state, Node::Role(role)))
    }

    async fn wait_visible_within(
        &self,
        scope: &ElementHandle,
        locator: &Locator,
        timeout: Duration,
    ) -> FoldResult<ElementHandle> {
        let scope = self.node(scope)?;
        let mut state = self.state();
        match scope {
            Node::Row(i) if locator == &self.locators.row_name => {
                Ok(alloc(&mut state, Node::RowName(i)))
            }
            Node::Row(i) if locator == &self.locators.row_actions => {
                Ok(alloc(&mut state, Node::RowActions(i)))
            }
            Node::Role(Role::PreviewDialog) => {
                let role = self
                    .role(locator)
                    .ok_or_else(|| FoldError::ElementNotFound(locator.to_string()))?;
                if !Self::visible(&state, &role) {
                    return Err(FoldError::timeout(locator.to_string(), timeout));
                }
                Ok(alloc(&mut state, Node::Role(role)))
            }
            _ => Err(FoldError::timeout(locator.to_string(), timeout)),
        }
    }

    async fn wait_hidden(&self, locator: &Locator, timeout: Duration) -> FoldResult<()> {
        let state = self.state();
        if self.role(locator) == Some(Role::PreviewDialog) && state.dialog_never_closes {
            return Err(FoldError::timeout(locator.to_string(), timeout));
        }
        Ok(())
    }

    async fn wait_enabled(&self, _locator: &Locator, _timeout: Duration) -> FoldResult<bool> {
        let mut state = self.state();
        state.enabled_checks += 1;
        Ok(state.validation.pop_front().unwrap_or(true))
    }

    async fn query_all(&self, locator: &Locator) -> FoldResult<Vec<ElementHandle>> {
        let mut state = self.state();
        if self.role(locator) != Some(Role::JobRows) {
            return Ok(Vec::new());
        }
        if state.listing_fails {
            return Err(FoldError::Script("node list went away".into()));
        }
        let count = state.rows.len();
        Ok((0..count).map(|i| alloc(&mut state, Node::Row(i))).collect())
    }

    async fn click(&self, element: &ElementHandle) -> FoldResult<()> {
        let node = self.node(element)?;
        let mut state = self.state();
        if let Node::Role(role) = &node {
            if state.click_fails.contains(role) {
                return Err(FoldError::Script(format!("click on {role:?} intercepted")));
            }
        }
        Self::apply_click(&mut state, &node);
        Ok(())
    }

    async fn click_scripted(&self, locator: &Locator) -> FoldResult<bool> {
        let Some(role) = self.role(locator) else {
            return Ok(false);
        };
        let mut state = self.state();
        if !Self::visible(&state, &role) {
            return Ok(false);
        }
        state.scripted_clicks.push(role.clone());
        Self::apply_click(&mut state, &Node::Role(role));
        Ok(true)
    }

    async fn focus_scripted(&self, locator: &Locator) -> FoldResult<bool> {
        let state = self.state();
        Ok(self.role(locator) == Some(Role::JobNameFallback)
            && !state.missing.contains(&Role::JobNameFallback))
    }

    async fn clear(&self, element: &ElementHandle) -> FoldResult<()> {
        let node = self.node(element)?;
        let mut state = self.state();
        match node {
            Node::Role(Role::SequenceInput) => state.sequence.clear(),
            Node::Role(Role::JobNameInput | Role::FocusedInput) => state.job_name.clear(),
            _ => {}
        }
        Ok(())
    }

    async fn type_incremental(
        &self,
        element: &ElementHandle,
        text: &str,
        _per_char_delay: Duration,
    ) -> FoldResult<()> {
        let node = self.node(element)?;
        let mut state = self.state();
        match node {
            Node::Role(Role::SequenceInput) => {
                state.sequence.push_str(text);
                state.keystrokes.push(text.to_string());
            }
            Node::Role(Role::JobNameInput | Role::FocusedInput) => state.job_name.push_str(text),
            other => return Err(FoldError::Script(format!("cannot type into {other:?}"))),
        }
        Ok(())
    }

    async fn read_attribute(&self, element: &ElementHandle, name: &str) -> FoldResult<Option<String>> {
        let node = self.node(element)?;
        let state = self.state();
        match (node, name) {
            (Node::Role(Role::SeedToggle), "aria-checked") => {
                Ok(Some(state.toggle_checked.to_string()))
            }
            _ => Ok(None),
        }
    }

    async fn text_content(&self, element: &ElementHandle) -> FoldResult<String> {
        match self.node(element)? {
            Node::RowName(i) => Ok(self.state().rows[i].clone()),
            _ => Ok(String::new()),
        }
    }

    async fn release_handles(&self) {
        let mut state = self.state();
        state.nodes.clear();
        state.handle_releases += 1;
    }

    async fn download(&self, trigger: &ElementHandle, _timeout: Duration) -> FoldResult<ArtifactStream> {
        let node = self.node(trigger)?;
        let mut state = self.state();
        if !matches!(node, Node::Role(Role::DownloadItem)) {
            return Err(FoldError::Download("trigger is not a download link".into()));
        }
        let row = state
            .open_menu
            .take()
            .ok_or_else(|| FoldError::Download("no row menu open".into()))?;
        let name = state.rows[row].trim().to_string();
        state.downloads.push(name.clone());
        Ok(Box::new(Cursor::new(format!("archive:{name}").into_bytes())))
    }
}

/// Settings with all pacing removed.
pub fn fast_settings() -> Settings {
    Settings {
        timings: Timings::immediate(),
        ..Settings::default()
    }
}

pub fn manifest(entries: &[(&str, &str)]) -> Manifest {
    Manifest::new(
        entries
            .iter()
            .map(|(name, payload)| ManifestEntry::new(*name, *payload))
            .collect(),
    )
}

pub fn names(manifest_names: &[&str]) -> Manifest {
    Manifest::new(
        manifest_names
            .iter()
            .map(|n| ManifestEntry::new(*n, "MKVL"))
            .collect(),
    )
}
