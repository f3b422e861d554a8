//! Resolves raw parent/child ids into the in-memory links (`child`, the
//! per-row `idx_top` propagation, time-warp detection) that the layout
//! pass walks. Runs once, at the top of [`crate::GraphContext::finish`].

use crate::{Flags, GraphContext};

pub(crate) fn resolve(ctx: &mut GraphContext, flags: Flags) -> u32 {
    populate_id_hash(ctx);
    if flags.intersects(Flags::DISJOINT | Flags::XMERGE) {
        purge_offscreen_merges(ctx);
    }
    swap_primary_parent(ctx);
    let n_timewarp = choose_primary_child(ctx);
    if flags.contains(Flags::FILLGAPS) {
        step_parent_filler(ctx);
    }
    propagate_idx_top(ctx);
    n_timewarp
}

/// Build the id -> row-index table. A row whose id collides with one
/// already in the table is shadowed: the earlier row is marked a
/// duplicate and routed off to the side in layout's duplicate pass, the
/// later row becomes the canonical entry for that id.
fn populate_id_hash(ctx: &mut GraphContext) {
    for i in 0..ctx.rows.len() {
        let id = ctx.rows[i].id;
        if let Some(&prev) = ctx.by_id.get(&id) {
            ctx.rows[prev].is_dup = true;
            log::trace!("row {i} duplicates id {id} already seen at row {prev}");
        }
        ctx.by_id.insert(id, i);
    }
}

/// Drop merge parents (anything past position 0) that point off-screen.
/// Only the primary parent is ever allowed to dangle off-screen; a
/// disjoint or cross-merge timeline has no use for a merge arrow that
/// leads nowhere visible.
fn purge_offscreen_merges(ctx: &mut GraphContext) {
    for i in 0..ctx.rows.len() {
        let mut j = 1;
        while j < ctx.rows[i].parents.len() {
            let parent_id = ctx.rows[i].parents[j];
            if ctx.by_id.contains_key(&parent_id) {
                j += 1;
                continue;
            }
            let n_non_cherrypick = ctx.rows[i].n_non_cherrypick();
            ctx.rows[i].parents.remove(j);
            if j >= n_non_cherrypick {
                ctx.rows[i].n_cherrypick -= 1;
            }
        }
    }
}

/// When a row has more than one non-cherry-pick parent and its current
/// primary parent lives on a different branch, prefer whichever
/// candidate shares this row's branch — keeps same-branch history running
/// down a single rail instead of jumping sideways at every fork.
fn swap_primary_parent(ctx: &mut GraphContext) {
    for i in 0..ctx.rows.len() {
        if ctx.rows[i].is_dup {
            continue;
        }
        let n_non_cherrypick = ctx.rows[i].n_non_cherrypick();
        if n_non_cherrypick < 2 {
            continue;
        }
        let primary_id = ctx.rows[i].parents[0];
        let Some(&primary_idx) = ctx.by_id.get(&primary_id) else {
            continue;
        };
        let row_branch = ctx.rows[i].branch;
        if ctx.rows[primary_idx].branch == row_branch {
            continue;
        }
        for k in 1..n_non_cherrypick {
            let candidate_id = ctx.rows[i].parents[k];
            if let Some(&candidate_idx) = ctx.by_id.get(&candidate_id) {
                if ctx.rows[candidate_idx].branch == row_branch {
                    ctx.rows[i].parents.swap(0, k);
                    break;
                }
            }
        }
    }
}

/// Assign each row's `child` pointer: the row directly above it on the
/// same rail, i.e. the row that claims this one as its primary parent.
/// A row whose primary parent already comes before it in display order
/// (parent "above" child) is a time warp; we mark the *parent*, not the
/// child, since it's the parent's rail-extension that needs to stop
/// early to avoid drawing a riser running backwards in time.
fn choose_primary_child(ctx: &mut GraphContext) -> u32 {
    let mut n_timewarp = 0;
    for i in 0..ctx.rows.len() {
        if ctx.rows[i].is_dup || !ctx.rows[i].participates {
            continue;
        }
        let Some(&primary_id) = ctx.rows[i].parents.first() else {
            continue;
        };
        let Some(&parent_idx) = ctx.by_id.get(&primary_id) else {
            continue;
        };
        if ctx.rows[parent_idx].branch != ctx.rows[i].branch {
            continue;
        }
        if ctx.rows[parent_idx].idx <= ctx.rows[i].idx {
            ctx.rows[parent_idx].time_warp = true;
            n_timewarp += 1;
            continue;
        }
        let row_idx_top = ctx.rows[i].idx_top;
        let keep_existing = ctx.rows[parent_idx]
            .child
            .map(|c| ctx.rows[c].idx_top <= row_idx_top)
            .unwrap_or(false);
        if !keep_existing {
            ctx.rows[parent_idx].child = Some(i);
            ctx.rows[parent_idx].idx_top = row_idx_top;
        }
    }
    n_timewarp
}

/// For a row with no primary parent on screen, adopt a childless row
/// above it on the same branch as a stand-in parent, joined with a
/// dashed (step-parent) riser instead of leaving the rail to dangle.
fn step_parent_filler(ctx: &mut GraphContext) {
    for i in 0..ctx.rows.len() {
        if ctx.rows[i].child.is_some() {
            continue;
        }
        let mut found = None;
        let mut j = i;
        while j > 0 {
            j -= 1;
            let candidate = &ctx.rows[j];
            let parent_offscreen = candidate
                .parents
                .first()
                .map_or(false, |p| !ctx.by_id.contains_key(p));
            if parent_offscreen && candidate.branch == ctx.rows[i].branch {
                found = Some(j);
                break;
            }
        }
        if let Some(j) = found {
            ctx.rows[i].child = Some(j);
            ctx.rows[i].is_step_parent = true;
            let r_id = ctx.rows[i].id;
            ctx.rows[j].parents[0] = r_id;
        }
    }
}

/// A single forward pass suffices: each row's `child` always has a
/// smaller index, so by the time we visit a row its child's `idx_top`
/// already holds its final value.
fn propagate_idx_top(ctx: &mut GraphContext) {
    for i in 0..ctx.rows.len() {
        if let Some(c) = ctx.rows[i].child {
            let child_top = ctx.rows[c].idx_top;
            if ctx.rows[i].idx_top > child_top {
                ctx.rows[i].idx_top = child_top;
            }
        }
    }
}
