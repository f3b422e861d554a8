//! Revision-history graph layout: turns a commit DAG into rails, risers
//! and merge arrows suitable for a timeline view, the way a version
//! control system lays out its "network" graph.
//!
//! Rows are built up with [`GraphContext::add_row`] in display order
//! (newest first) and resolved in one shot by [`GraphContext::finish`].
//! After that the context is read-only: [`GraphContext::rows`] exposes
//! the laid-out rows, [`GraphContext::rail_map`] the rail-to-column
//! remap, and [`GraphContext::max_rail`] the highest rail actually used.

mod error;
mod label;
mod layout;
mod rail;
mod topology;

use std::collections::HashMap;

pub use error::GraphError;
pub use label::Label;
use label::Interner;

/// Rails are numbered 0..[`MAX_RAIL`); a layout that needs more than this
/// many simultaneous columns fails with [`GraphError::RailExhausted`].
pub const MAX_RAIL: usize = 40;

/// Rows of slack kept between a rail's last use and where it's reused
/// for something else, so a descender or a reused rail doesn't collide
/// visually with whatever drew it last.
pub(crate) const RISER_MARGIN: usize = 4;

/// Commit hashes are truncated to this many bytes; the layout only ever
/// needs them for display, not as a lookup key.
pub const MAX_HASH_LEN: usize = 64;

bitflags::bitflags! {
    /// Layout options, passed to [`GraphContext::finish`].
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct Flags: u32 {
        /// Omit descenders and the trailing rail margin below a leaf;
        /// the caller is rendering a disjoint subgraph with nothing
        /// below the last row, so there is nothing to descend toward.
        const DISJOINT = 1 << 0;
        /// Fill gaps left by an off-screen primary parent with a
        /// dashed step-parent riser instead of leaving the rail dangling.
        const FILLGAPS = 1 << 1;
        /// Drop merge parents (not the primary parent) that point
        /// off-screen instead of routing an off-screen merge rail for
        /// them.
        const XMERGE = 1 << 2;
    }
}

/// A row's parent set, as handed to [`GraphContext::add_row`].
#[derive(Clone, Debug)]
pub enum Parents {
    /// This row exists only to carry a background color across a span
    /// of the timeline; it never participates in rail/child resolution
    /// (Fossil's `nParent == -1` row).
    NonParticipating,
    /// `ids[0]` is the primary parent; the trailing `n_cherrypick`
    /// entries are cherry-pick merges (dashed), the rest ordinary merges
    /// (solid). Clamped so `n_cherrypick < ids.len()` when `ids` is
    /// non-empty, and to zero otherwise.
    Known { ids: Vec<i64>, n_cherrypick: u8 },
}

/// One row of the timeline, after [`GraphContext::finish`] has resolved
/// it. Fields are public because the only way to get a `&Row` is through
/// [`GraphContext::rows`], which hands out shared references.
#[derive(Debug)]
pub struct Row {
    pub id: i64,
    /// 1-based display position, top row first.
    pub idx: u32,
    pub parents: Vec<i64>,
    pub n_cherrypick: u8,
    pub branch: Label,
    pub bg_color: Label,
    pub hash: String,
    pub is_leaf: bool,
    /// A later row shares this row's id; this row is the shadowed,
    /// off-to-the-side copy.
    pub is_dup: bool,
    /// This row's primary parent was rewritten by the step-parent filler.
    pub is_step_parent: bool,
    /// This row's primary parent is displayed *after* it (below), so its
    /// rail extension stops here instead of reading into the future.
    pub time_warp: bool,
    pub has_normal_out_merge: bool,
    /// A descender is drawn below this row because it has a parent.
    pub b_descender: bool,
    /// `false` for a non-participating (background-only) row.
    pub participates: bool,

    pub prev: Option<usize>,
    pub next: Option<usize>,
    /// The row directly above this one on the same rail: whichever row
    /// claims this one as its primary parent.
    pub child: Option<usize>,
    pub idx_top: u32,

    /// -1 until assigned by the layout pass.
    pub rail: i32,
    /// `risers[r]` is the display row this row's riser on rail `r`
    /// reaches up to; 0 means "off the top", -1 means no riser.
    pub risers: [i32; MAX_RAIL],
    /// How many rows above this one its rail extends as slack once its
    /// `child` chain runs out (not drawn, just reserved).
    pub self_up: u32,
    /// Rail this row's outgoing merge arrow departs on, or -1.
    pub merge_out: i32,
    pub merge_upto: u32,
    pub cherrypick_upto: u32,
    /// `merge_in[r]`: 0 none, 1 ordinary merge arrives on rail `r`, 2 a
    /// cherry-pick merge does.
    pub merge_in: [u8; MAX_RAIL],
    pub merge_down: u64,
    pub cherrypick_down: u64,
    pub rail_in_use: u64,
}

impl Row {
    pub(crate) fn n_non_cherrypick(&self) -> usize {
        self.parents.len() - self.n_cherrypick as usize
    }
}

/// Builds up a set of rows and resolves them into a rail layout.
///
/// Rows may only be added before [`finish`](GraphContext::finish) is
/// called; `finish` may only be called once.
pub struct GraphContext {
    rows: Vec<Row>,
    interner: Interner,
    by_id: HashMap<i64, usize>,
    max_rail: i32,
    rail_map: Vec<usize>,
    n_err: u32,
    finished: bool,
}

impl Default for GraphContext {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphContext {
    pub fn new() -> Self {
        GraphContext {
            rows: Vec::new(),
            interner: Interner::new(),
            by_id: HashMap::new(),
            max_rail: -1,
            rail_map: Vec::new(),
            n_err: 0,
            finished: false,
        }
    }

    /// Append a row in display order (top first). Returns the row's
    /// 1-based display index.
    pub fn add_row(
        &mut self,
        id: i64,
        parents: Parents,
        branch: &str,
        bg_color: &str,
        hash: &str,
        is_leaf: bool,
    ) -> Result<u32, GraphError> {
        if self.finished {
            return Err(GraphError::AlreadyFinished);
        }

        let (ids, n_cherrypick, participates) = match parents {
            Parents::NonParticipating => (Vec::new(), 0, false),
            Parents::Known { ids, n_cherrypick } => {
                let n_cherrypick = if ids.is_empty() {
                    0
                } else if n_cherrypick as usize >= ids.len() {
                    (ids.len() - 1) as u8
                } else {
                    n_cherrypick
                };
                (ids, n_cherrypick, true)
            }
        };

        let branch = self.interner.intern(branch);
        let bg_color = self.interner.intern(bg_color);
        let mut hash = hash.to_string();
        hash.truncate(MAX_HASH_LEN);

        let index = self.rows.len();
        let idx = (index + 1) as u32;
        let prev = if index == 0 { None } else { Some(index - 1) };

        self.rows.push(Row {
            id,
            idx,
            parents: ids,
            n_cherrypick,
            branch,
            bg_color,
            hash,
            is_leaf,
            is_dup: false,
            is_step_parent: false,
            time_warp: false,
            has_normal_out_merge: false,
            b_descender: false,
            participates,
            prev,
            next: None,
            child: None,
            idx_top: idx,
            rail: -1,
            risers: [-1; MAX_RAIL],
            self_up: 0,
            merge_out: -1,
            merge_upto: 0,
            cherrypick_upto: 0,
            merge_in: [0; MAX_RAIL],
            merge_down: 0,
            cherrypick_down: 0,
            rail_in_use: 0,
        });
        if let Some(p) = prev {
            self.rows[p].next = Some(index);
        }
        Ok(idx)
    }

    /// Resolve every row added so far into a rail layout.
    ///
    /// `preferred_left_branch`, if given, is pulled as far left as
    /// possible in the final rail-to-column remap; it's ignored if any
    /// row in the graph turned out to be a time warp.
    ///
    /// `count_nonbranch_children` answers, for a given row id, how many
    /// children it has outside its own branch; used to decide whether a
    /// childless row on its own branch still needs its riser extended to
    /// the top of the chart for an off-screen merge to land on.
    pub fn finish(
        &mut self,
        preferred_left_branch: Option<&str>,
        flags: Flags,
        count_nonbranch_children: impl Fn(i64) -> u32,
    ) -> Result<(), GraphError> {
        if self.finished {
            return Err(GraphError::AlreadyFinished);
        }
        self.finished = true;
        self.n_err = 1;
        self.max_rail = -1;

        if self.rows.is_empty() {
            self.n_err = 0;
            self.rail_map = Vec::new();
            return Ok(());
        }

        let n_timewarp = topology::resolve(self, flags);

        layout::root_pass(self, flags)?;
        layout::remaining_pass(self, flags, &count_nonbranch_children)?;
        layout::merge_routing(self)?;
        layout::duplicate_routing(self)?;
        layout::find_max_rail(self);
        layout::rail_remap(self, preferred_left_branch, n_timewarp);

        self.n_err = 0;
        Ok(())
    }

    /// Rows in display order, valid whether or not `finish` succeeded.
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Highest rail number actually used, or -1 for an empty graph.
    pub fn max_rail(&self) -> i32 {
        self.max_rail
    }

    /// Rail-to-display-column remap computed by `finish`; `rail_map()[r]`
    /// is the column rail `r` should be drawn in.
    pub fn rail_map(&self) -> &[usize] {
        &self.rail_map
    }

    /// Whether `finish` hit the rail budget. The layout is still fully
    /// populated on error; callers typically fall back to a plain list
    /// without graph ornamentation rather than dropping rows.
    pub fn has_error(&self) -> bool {
        self.n_err > 0
    }

    /// Resolve a [`Label`] back to the branch name or background color
    /// string it was interned from.
    pub fn resolve_label(&self, label: Label) -> &str {
        self.interner.resolve(label)
    }
}
