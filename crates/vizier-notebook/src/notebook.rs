//! Notebook aggregate
//!
//! An immutable, ordered list of cells built from one workflow version.
//! Every transformation returns a new `Notebook`; cells live in a persistent
//! vector so untouched cells are shared, not copied.
//!
//! The freeze boundary is derived on demand: the first cell whose module
//! failed or was cancelled, and every cell after it, cannot be edited.

use crate::cell::{ActiveCell, NotebookCell};
use crate::output::OutputResource;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use vizier_resource::{
    wire, DatasetDescriptor, DatasetIndex, Module, ModuleId, WorkflowDescriptor,
};

/// Display grouping of consecutive cells
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellRun {
    /// A single cell shown as-is
    Cell(usize),
    /// Consecutive matching cells, `start..=end`
    Collapsed {
        /// First index of the run
        start: usize,
        /// Last index of the run
        end: usize,
    },
}

/// Snapshot of one workflow version as notebook cells
#[derive(Debug, Clone, PartialEq)]
pub struct Notebook {
    workflow: WorkflowDescriptor,
    datasets: Arc<DatasetIndex>,
    cells: im::Vector<NotebookCell>,
}

/// Level of a workflow payload that lists the modules
///
/// Modules come either top-level or nested under `workflow`; the top level
/// wins when both are present.
#[must_use]
pub fn workflow_body(json: &Value) -> Option<&Value> {
    if json.get("modules").is_some() {
        return Some(json);
    }
    json.get("workflow").filter(|w| w.get("modules").is_some())
}

fn dataset_index(json: &Value) -> DatasetIndex {
    let levels = [workflow_body(json), Some(json), json.get("workflow")];
    let source = levels
        .into_iter()
        .flatten()
        .find(|level| level.get("datasets").is_some())
        .unwrap_or(json);
    wire::array_field(source, "datasets")
        .iter()
        .map(DatasetDescriptor::from_wire)
        .map(|d| (d.id.clone(), d))
        .collect()
}

fn hydrate_modules(json: &Value, index: &DatasetIndex) -> Vec<Module> {
    let Some(body) = workflow_body(json) else {
        return Vec::new();
    };
    wire::array_field(body, "modules")
        .iter()
        .map(|m| Module::from_wire_indexed(m, index))
        .collect()
}

impl Notebook {
    /// Notebook of an empty workflow
    #[must_use]
    pub fn empty() -> Self {
        Self::from_workflow_json(&Value::Null)
    }

    /// Build a notebook from a workflow fetch response
    ///
    /// Dataset references of each module are resolved against the
    /// response's `datasets` index; every output is freshly derived.
    #[must_use]
    pub fn from_workflow_json(json: &Value) -> Self {
        let datasets = dataset_index(json);
        let cells = hydrate_modules(json, &datasets)
            .into_iter()
            .map(NotebookCell::derive)
            .collect();
        Self {
            workflow: WorkflowDescriptor::from_wire(json),
            datasets: Arc::new(datasets),
            cells,
        }
    }

    /// Workflow version this notebook shows
    #[inline]
    #[must_use]
    pub fn workflow(&self) -> &WorkflowDescriptor {
        &self.workflow
    }

    /// Copy with a different workflow descriptor (e.g. read-only flag)
    #[must_use]
    pub fn with_workflow(&self, workflow: WorkflowDescriptor) -> Self {
        Self {
            workflow,
            datasets: Arc::clone(&self.datasets),
            cells: self.cells.clone(),
        }
    }

    /// Full dataset descriptor by id
    #[must_use]
    pub fn dataset(&self, id: &str) -> Option<&DatasetDescriptor> {
        self.datasets.get(id)
    }

    /// Download URL of a dataset in this version
    #[must_use]
    pub fn download_url(&self, dataset_id: &str) -> Option<&str> {
        self.dataset(dataset_id).and_then(DatasetDescriptor::download_url)
    }

    /// All cells in execution order
    pub fn cells(&self) -> impl Iterator<Item = &NotebookCell> {
        self.cells.iter()
    }

    /// Cell at a position
    #[inline]
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&NotebookCell> {
        self.cells.get(index)
    }

    /// Position of the cell showing a module
    #[must_use]
    pub fn position(&self, id: &ModuleId) -> Option<usize> {
        self.cells.iter().position(|c| &c.module.id == id)
    }

    /// Cell showing a module
    #[must_use]
    pub fn cell(&self, id: &ModuleId) -> Option<&NotebookCell> {
        self.position(id).and_then(|i| self.cells.get(i))
    }

    /// Number of cells
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Check if the workflow has no module
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Whether any module is still pending or running
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.cells.iter().any(|c| c.module.is_active())
    }

    fn update_cell(&self, id: &ModuleId, f: impl FnOnce(&NotebookCell) -> NotebookCell) -> Self {
        let Some(index) = self.position(id) else {
            return self.clone();
        };
        let replaced = f(&self.cells[index]);
        Self {
            workflow: self.workflow.clone(),
            datasets: Arc::clone(&self.datasets),
            cells: self.cells.update(index, replaced),
        }
    }

    /// Replace the output of the cell showing `id`
    ///
    /// Returns an unchanged copy when no cell matches.
    #[must_use]
    pub fn replace_output(&self, id: &ModuleId, output: impl Into<OutputResource>) -> Self {
        let output = output.into();
        self.update_cell(id, |cell| cell.with_output(output))
    }

    /// Flag the output of the cell showing `id` as fetching
    #[must_use]
    pub fn set_fetching(&self, id: &ModuleId) -> Self {
        self.update_cell(id, |cell| cell.with_output(cell.output.set_fetching()))
    }

    /// Set the annotation marker of the cell showing `id`
    #[must_use]
    pub fn show_annotations(&self, id: &ModuleId, active_cell: ActiveCell) -> Self {
        self.update_cell(id, |cell| cell.with_active_cell(active_cell))
    }

    /// Rebuild from a new workflow version
    ///
    /// A cell whose module survives with the same outcome keeps its previous
    /// output and marker; the modified cell, new modules and changed modules
    /// get a freshly derived output.
    #[must_use]
    pub fn update_workflow(&self, json: &Value, modified: Option<&ModuleId>) -> Self {
        let previous: HashMap<&ModuleId, &NotebookCell> =
            self.cells.iter().map(|c| (&c.module.id, c)).collect();
        let datasets = dataset_index(json);

        let cells: im::Vector<NotebookCell> = hydrate_modules(json, &datasets)
            .into_iter()
            .map(|module| {
                let carried = match previous.get(&module.id) {
                    Some(old) if Some(&module.id) != modified && old.module.same_outcome(&module) => {
                        Some((old.output.clone(), old.active_cell.clone()))
                    }
                    _ => None,
                };
                match carried {
                    Some((output, active_cell)) => NotebookCell {
                        module,
                        output,
                        active_cell,
                    },
                    None => NotebookCell::derive(module),
                }
            })
            .collect();

        tracing::debug!(
            cells = cells.len(),
            modified = modified.map(ModuleId::as_str),
            "notebook updated from workflow"
        );

        Self {
            workflow: WorkflowDescriptor::from_wire(json),
            datasets: Arc::new(datasets),
            cells,
        }
    }

    /// Index of the first failed or cancelled cell
    #[must_use]
    pub fn freeze_boundary(&self) -> Option<usize> {
        self.cells.iter().position(NotebookCell::has_error)
    }

    /// Whether the cell at `index` is frozen for editing
    #[must_use]
    pub fn is_frozen(&self, index: usize) -> bool {
        self.freeze_boundary().is_some_and(|b| index >= b)
    }

    /// Whether a new cell may be inserted at `index`
    ///
    /// Inserting right before the failing cell is allowed; appending after a
    /// failure is not.
    #[must_use]
    pub fn can_insert_at(&self, index: usize) -> bool {
        !self.workflow.read_only
            && index <= self.cells.len()
            && self.freeze_boundary().map_or(true, |b| index <= b)
    }

    /// Whether the cell at `index` may be replaced or deleted
    ///
    /// The failing cell itself stays editable so the failure can be fixed.
    #[must_use]
    pub fn can_edit(&self, index: usize) -> bool {
        !self.workflow.read_only
            && index < self.cells.len()
            && self.freeze_boundary().map_or(true, |b| index <= b)
    }

    /// Collapse runs of consecutive cells matching `predicate`
    ///
    /// Non-matching cells, and matching cells that stand alone, are emitted
    /// as [`CellRun::Cell`].
    pub fn group_runs<F>(&self, mut predicate: F) -> Vec<CellRun>
    where
        F: FnMut(&NotebookCell) -> bool,
    {
        let mut runs = Vec::new();
        let mut open: Option<usize> = None;
        let close = |runs: &mut Vec<CellRun>, start: usize, end: usize| {
            if start == end {
                runs.push(CellRun::Cell(start));
            } else {
                runs.push(CellRun::Collapsed { start, end });
            }
        };

        for (i, cell) in self.cells.iter().enumerate() {
            if predicate(cell) {
                open.get_or_insert(i);
            } else {
                if let Some(start) = open.take() {
                    close(&mut runs, start, i - 1);
                }
                runs.push(CellRun::Cell(i));
            }
        }
        if let Some(start) = open {
            close(&mut runs, start, self.cells.len() - 1);
        }
        runs
    }
}

impl Default for Notebook {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::{OutputTag, OutputVariant};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use vizier_resource::CellPointer;

    fn module(id: &str, state: i64, out: &str) -> Value {
        json!({
            "id": id,
            "state": state,
            "command": {"packageId": "vizual", "commandId": "load", "arguments": []},
            "stdout": [{"type": "text/plain", "value": out}],
            "links": [{"rel": "module-delete", "href": format!("http://api/m/{id}")}]
        })
    }

    fn workflow(modules: Vec<Value>) -> Value {
        json!({
            "version": "1",
            "modules": modules,
            "datasets": [{"id": "d1", "name": "people", "columns": [{"id": 0, "name": "age"}]}],
            "links": [{"rel": "module-append", "href": "http://api/append"}]
        })
    }

    fn id(s: &str) -> ModuleId {
        ModuleId::new(s)
    }

    #[test]
    fn build_resolves_datasets() {
        let mut m = module("m1", 4, "ok");
        m["datasets"] = json!([{"id": "d1", "name": "people"}]);
        let nb = Notebook::from_workflow_json(&workflow(vec![m]));

        assert_eq!(nb.len(), 1);
        let ds = &nb.get(0).unwrap().module.datasets[0];
        assert_eq!(ds.columns.as_ref().map(Vec::len), Some(1));
        assert!(nb.dataset("d1").is_some());
        assert_eq!(nb.download_url("d1"), None);
        assert_eq!(nb.workflow().version, "1");
    }

    #[test]
    fn replace_output_is_local() {
        let nb = Notebook::from_workflow_json(&workflow(vec![
            module("a", 4, "1"),
            module("b", 4, "2"),
        ]));
        let replaced = nb.replace_output(&id("b"), OutputVariant::Hidden);

        assert_eq!(replaced.get(0), nb.get(0));
        assert_eq!(replaced.get(1).unwrap().output.tag(), OutputTag::Hidden);
        assert_eq!(nb.get(1).unwrap().output.tag(), OutputTag::Text);
        assert_eq!(nb.replace_output(&id("zzz"), OutputVariant::Hidden), nb);
    }

    #[test]
    fn fetching_and_annotations() {
        let nb = Notebook::from_workflow_json(&workflow(vec![module("a", 4, "1")]));
        let fetching = nb.set_fetching(&id("a"));
        assert!(fetching.get(0).unwrap().output.is_fetching());

        let marked = nb.show_annotations(&id("a"), ActiveCell::Cell(CellPointer::new(0, "r1")));
        let cell = marked.get(0).unwrap();
        assert!(cell.active_cell.pointer().is_some());
        assert_eq!(cell.output, nb.get(0).unwrap().output);
    }

    #[test]
    fn freeze_boundary_from_first_error() {
        let nb = Notebook::from_workflow_json(&workflow(vec![
            module("a", 4, "1"),
            module("b", 3, "2"),
            module("c", 4, "3"),
        ]));
        assert_eq!(nb.freeze_boundary(), Some(1));
        assert!(!nb.is_frozen(0));
        assert!(nb.is_frozen(1));
        assert!(nb.is_frozen(2));
        assert!(nb.can_insert_at(1));
        assert!(!nb.can_insert_at(2));
        assert!(!nb.can_insert_at(3));
        assert!(nb.can_edit(0));
        assert!(nb.can_edit(1));
        assert!(!nb.can_edit(2));

        let read_only = nb.with_workflow(nb.workflow().clone().with_head("2"));
        assert!(!read_only.can_edit(0));
        assert!(!read_only.can_insert_at(0));
    }

    #[test]
    fn update_workflow_carries_unchanged_outputs() {
        let nb = Notebook::from_workflow_json(&workflow(vec![
            module("a", 4, "1"),
            module("b", 4, "2"),
        ]))
        .replace_output(&id("a"), OutputVariant::Hidden)
        .replace_output(&id("b"), OutputVariant::Hidden);

        let next = workflow(vec![module("a", 4, "1"), module("b", 4, "2"), module("c", 4, "3")]);
        let updated = nb.update_workflow(&next, Some(&id("b")));

        assert_eq!(updated.len(), 3);
        assert_eq!(updated.get(0).unwrap().output.tag(), OutputTag::Hidden);
        assert_eq!(updated.get(1).unwrap().output.tag(), OutputTag::Text);
        assert_eq!(updated.get(2).unwrap().output.tag(), OutputTag::Text);
    }

    #[test]
    fn update_workflow_rederives_changed_outcome() {
        let nb = Notebook::from_workflow_json(&workflow(vec![module("a", 4, "1")]))
            .replace_output(&id("a"), OutputVariant::Hidden);
        let updated = nb.update_workflow(&workflow(vec![module("a", 4, "changed")]), None);
        assert_eq!(updated.get(0).unwrap().output.tag(), OutputTag::Text);
    }

    #[test]
    fn group_runs_collapses_consecutive_matches() {
        let mut modules: Vec<Value> = (0..6).map(|i| module(&format!("m{i}"), 4, "x")).collect();
        for i in [1, 2, 3, 5] {
            modules[i]["command"]["packageId"] = json!("markdown");
        }
        let nb = Notebook::from_workflow_json(&workflow(modules));
        let runs = nb.group_runs(|c| c.module.command.package_id == "markdown");
        assert_eq!(
            runs,
            vec![
                CellRun::Cell(0),
                CellRun::Collapsed { start: 1, end: 3 },
                CellRun::Cell(4),
                CellRun::Cell(5),
            ]
        );
        assert_eq!(nb.len(), 6);
    }

    #[test]
    fn modules_beside_a_nested_descriptor() {
        let mut m = module("b", 4, "2");
        m["datasets"] = json!([{"id": "d1", "name": "people"}]);
        let response = json!({
            "workflow": {"id": "2", "readOnly": false},
            "modules": [module("a", 4, "1"), m, module("c", 4, "3")],
            "datasets": [{"id": "d1", "name": "people", "columns": [{"id": 0, "name": "age"}]}]
        });

        let nb = Notebook::empty().update_workflow(&response, None);
        assert_eq!(nb.len(), 3);
        assert_eq!(nb.workflow().version, "2");
        assert!(nb.dataset("d1").is_some());
        let ds = &nb.get(1).unwrap().module.datasets[0];
        assert_eq!(ds.columns.as_ref().map(Vec::len), Some(1));
        assert_eq!(Notebook::from_workflow_json(&response), nb);
    }

    #[test]
    fn modules_nested_under_workflow() {
        let response = json!({
            "workflow": {
                "version": "4",
                "modules": [module("a", 4, "1")],
                "datasets": [{"id": "d1", "name": "people"}]
            }
        });
        assert!(workflow_body(&response).is_some());
        let nb = Notebook::from_workflow_json(&response);
        assert_eq!(nb.len(), 1);
        assert_eq!(nb.workflow().version, "4");
        assert!(nb.dataset("d1").is_some());
        assert!(workflow_body(&json!({"workflow": {"id": "4"}})).is_none());
    }

    #[test]
    fn empty_workflow() {
        let nb = Notebook::empty();
        assert!(nb.is_empty());
        assert_eq!(nb.freeze_boundary(), None);
        assert!(nb.can_insert_at(0));
        assert!(nb.group_runs(|_| true).is_empty());
    }
}
