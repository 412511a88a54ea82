//! Variables, variable scopes and frame slots.
//!
//! Every variable has a unit-wide unique [`VarId`] and belongs to exactly one
//! [`VarScope`], the scope of one function body (or of the main expression).
//! Expressions refer to variables by id and cached slot only. Whenever an
//! expression tree is duplicated (closure copies, inline expansion) the
//! variables are duplicated explicitly and an [`IdMap`] records the
//! old-to-new correspondence, so the copy can be verified against it.

use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::context::QueryContext;
use crate::types::SeqType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
pub struct VarId(pub u32);

impl std::fmt::Display for VarId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Id generator shared by all scopes of one query unit.
///
/// Hands out variable ids and origin tokens (identities of closures and
/// function items). Deliberately `!Send`: a unit never crosses threads.
#[derive(Debug, Clone, Default)]
pub struct Ids(Rc<IdCounters>);

#[derive(Debug, Default)]
struct IdCounters {
    vars: Cell<u32>,
    origins: Cell<u32>,
}

impl Ids {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_var(&self) -> VarId {
        let id = self.0.vars.get();
        self.0.vars.set(id + 1);
        VarId(id)
    }

    pub fn next_origin(&self) -> u32 {
        let id = self.0.origins.get();
        self.0.origins.set(id + 1);
        id
    }
}

impl PartialEq for Ids {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Var {
    pub id: VarId,
    pub name: String,
    /// Declared type; arguments bound to parameters are checked against it.
    pub declared: Option<SeqType>,
    /// Static type, refined during compilation.
    pub ty: SeqType,
    pub slot: usize,
    /// Pinned variables keep their slot for the whole activation.
    pinned: bool,
}

/// Old-to-new variable table built while copying expressions.
#[derive(Debug, Clone, Default)]
pub struct IdMap(HashMap<VarId, Var>);

impl IdMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, old: VarId, new: Var) {
        self.0.insert(old, new);
    }

    pub fn get(&self, old: VarId) -> Option<&Var> {
        self.0.get(&old)
    }

    /// Variable that `old` was copied to. A variable that must have been
    /// copied but was not is a compiler defect, never a query error.
    pub fn require(&self, old: VarId) -> &Var {
        match self.0.get(&old) {
            Some(var) => var,
            None => panic!("variable {old} is missing from the copy map"),
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Variables of one function body plus the slot bookkeeping of its frame.
#[derive(Debug, Clone, Default)]
pub struct VarScope {
    ids: Ids,
    vars: Vec<Var>,
    /// Occupancy per slot; its length is the frame size.
    slots: Vec<bool>,
}

impl PartialEq for VarScope {
    fn eq(&self, other: &Self) -> bool {
        self.vars == other.vars && self.slots.len() == other.slots.len()
    }
}

impl VarScope {
    pub fn new(ids: &Ids) -> Self {
        Self { ids: ids.clone(), vars: Vec::new(), slots: Vec::new() }
    }

    pub fn ids(&self) -> &Ids {
        &self.ids
    }

    /// Declare a scoped local. Its slot is released again by [`VarScope::close`].
    pub fn new_local(&mut self, name: &str, declared: Option<SeqType>) -> VarId {
        self.add(name, declared, false)
    }

    /// Declare a local that lives for the whole activation (parameters, captures).
    pub fn new_pinned(&mut self, name: &str, declared: Option<SeqType>) -> VarId {
        self.add(name, declared, true)
    }

    fn add(&mut self, name: &str, declared: Option<SeqType>, pinned: bool) -> VarId {
        let slot = match self.slots.iter().position(|used| !used) {
            Some(free) => free,
            None => {
                self.slots.push(false);
                self.slots.len() - 1
            }
        };
        self.slots[slot] = true;
        let id = self.ids.next_var();
        let ty = declared.clone().unwrap_or(SeqType::Item);
        self.vars.push(Var { id, name: name.to_string(), declared, ty, slot, pinned });
        id
    }

    /// Mark the start of a binding region.
    pub fn open(&self) -> usize {
        self.vars.len()
    }

    /// End a binding region: scoped locals declared since `mark` free their slots.
    pub fn close(&mut self, mark: usize) {
        for var in &self.vars[mark.min(self.vars.len())..] {
            if !var.pinned {
                self.slots[var.slot] = false;
            }
        }
    }

    pub fn var(&self, id: VarId) -> Option<&Var> {
        self.vars.iter().find(|v| v.id == id)
    }

    fn var_mut(&mut self, id: VarId) -> Option<&mut Var> {
        self.vars.iter_mut().find(|v| v.id == id)
    }

    pub fn vars(&self) -> &[Var] {
        &self.vars
    }

    /// High-water mark of concurrently live variables.
    pub fn frame_size(&self) -> usize {
        self.slots.len()
    }

    /// Narrow the static type of a variable. Declared types are never widened.
    pub fn refine(&mut self, id: VarId, ty: SeqType) {
        if let Some(var) = self.var_mut(id) {
            let keep = var.declared.as_ref().is_some_and(|d| !ty.instance_of(d));
            if !keep {
                var.ty = ty;
            }
        }
    }

    pub fn set_declared(&mut self, id: VarId, declared: Option<SeqType>) {
        if let Some(var) = self.var_mut(id) {
            var.ty = declared.clone().unwrap_or(SeqType::Item);
            var.declared = declared;
        }
    }

    pub fn rename(&mut self, id: VarId, name: &str) {
        if let Some(var) = self.var_mut(id) {
            var.name = name.to_string();
        }
    }

    /// Structurally identical scope with fresh ids. Slots are preserved and
    /// every original variable gets an entry in `map`.
    pub fn copy(&self, map: &mut IdMap) -> VarScope {
        let mut copy = VarScope { ids: self.ids.clone(), vars: Vec::with_capacity(self.vars.len()), slots: self.slots.clone() };
        for var in &self.vars {
            let new = Var { id: self.ids.next_var(), ..var.clone() };
            map.insert(var.id, new.clone());
            copy.vars.push(new);
        }
        copy
    }

    /// Re-declare all variables of this scope inside `target`, each with a
    /// fresh id and a fresh pinned slot of the target frame.
    pub fn adopt_into(&self, target: &mut VarScope, map: &mut IdMap) {
        for var in &self.vars {
            let id = target.new_pinned(&var.name, var.declared.clone());
            target.refine(id, var.ty.clone());
            if let Some(new) = target.var(id) {
                map.insert(var.id, new.clone());
            }
        }
    }

    /// Allocate this scope's frame on the context stack. Returns the frame
    /// pointer that must be handed back to [`VarScope::exit`].
    pub fn enter(&self, qc: &mut QueryContext<'_>) -> usize {
        qc.push_frame(self.frame_size())
    }

    pub fn exit(&self, qc: &mut QueryContext<'_>, fp: usize) {
        qc.pop_frame(fp);
    }
}
