//! Rail assignment: walks the rows resolved by [`crate::topology`] and
//! decides which vertical column (rail) each row sits on, where risers run,
//! and where merge arrows cross rails.

use crate::{Flags, GraphContext, GraphError, MAX_RAIL, RISER_MARGIN};

fn check_budget(ctx: &mut GraphContext) -> Result<(), GraphError> {
    if ctx.n_err > 0 {
        return Err(GraphError::RailExhausted {
            reached: ctx.max_rail,
        });
    }
    if ctx.max_rail >= MAX_RAIL as i32 {
        ctx.n_err += 1;
        return Err(GraphError::RailExhausted {
            reached: ctx.max_rail,
        });
    }
    Ok(())
}

/// D.1: give every row whose primary parent is absent or off-screen a
/// rail of its own. Runs trunk-only first so the trunk is biased toward
/// low rail numbers, then again over every remaining row.
pub(crate) fn root_pass(ctx: &mut GraphContext, flags: Flags) -> Result<(), GraphError> {
    let trunk = ctx.interner.intern("trunk");
    let span_margin = if flags.contains(Flags::DISJOINT) {
        0
    } else {
        RISER_MARGIN
    };

    for trunk_only in [true, false] {
        let n = ctx.rows.len();
        for i in (0..n).rev() {
            let row = &ctx.rows[i];
            if trunk_only && row.branch != trunk {
                continue;
            }
            if row.rail >= 0 || row.is_dup || !row.participates {
                continue;
            }
            let primary_absent = row
                .parents
                .first()
                .map_or(true, |p| !ctx.by_id.contains_key(p));
            if !primary_absent {
                continue;
            }

            let idx_top = row.idx_top;
            let idx = row.idx;
            let has_parent = !row.parents.is_empty();

            let rail = ctx.find_free_rail(idx_top, idx + span_margin as u32, 0);
            check_budget(ctx)?;

            ctx.rows[i].rail = rail;
            let mask = 1u64 << rail;
            if !flags.contains(Flags::DISJOINT) {
                ctx.rows[i].b_descender = has_parent;
                let span_end = (idx + RISER_MARGIN as u32 - 1).min(n as u32);
                for j in idx..=span_end {
                    ctx.rows[(j - 1) as usize].rail_in_use |= mask;
                }
            }
            assign_children(ctx, i, flags);
        }
    }
    Ok(())
}

/// Walk a row's `child` chain, putting every row on it on the same rail
/// and marking that rail occupied along the way, then extend the rail a
/// short distance past the top of the chain so a later merge arrow has
/// somewhere to land.
fn assign_children(ctx: &mut GraphContext, bottom: usize, flags: Flags) {
    let rail = ctx.rows[bottom].rail;
    let mask = 1u64 << rail;
    ctx.rows[bottom].rail_in_use |= mask;

    let mut prior = bottom;
    while let Some(current) = ctx.rows[prior].child {
        if ctx.rows[prior].time_warp {
            break;
        }
        ctx.rows[current].rail = rail;
        ctx.rows[current].rail_in_use |= mask;
        let current_idx = ctx.rows[current].idx;
        ctx.rows[prior].risers[rail as usize] = current_idx as i32;

        for p in (current + 1)..=prior {
            ctx.rows[p].rail_in_use |= mask;
        }
        prior = current;
    }

    if !ctx.rows[prior].is_leaf && !flags.contains(Flags::DISJOINT) {
        let start = prior.saturating_sub(RISER_MARGIN - 1);
        for p in start..=prior {
            ctx.rows[p].rail_in_use |= mask;
        }
        ctx.rows[prior].self_up = (prior - start + 1) as u32;
    }
}

/// Extend a childless row's riser all the way to the top of the chart
/// (riser target 0 means "off the top"), used when something off-screen
/// still needs to draw a merge arrow down into this rail.
fn riser_to_top(ctx: &mut GraphContext, row_index: usize) {
    let rail = ctx.rows[row_index].rail;
    let mask = 1u64 << rail;
    ctx.rows[row_index].risers[rail as usize] = 0;
    let start = row_index.saturating_sub(RISER_MARGIN - 1);
    for p in start..=row_index {
        ctx.rows[p].rail_in_use |= mask;
    }
}

/// D.2: everything [`root_pass`] left unassigned. Normal rows get a
/// rail near their primary parent's; a time warp (primary parent
/// already displayed above the child) gets its own down-rail instead.
pub(crate) fn remaining_pass(
    ctx: &mut GraphContext,
    flags: Flags,
    count_nonbranch_children: &dyn Fn(i64) -> u32,
) -> Result<(), GraphError> {
    let n = ctx.rows.len();
    let omit_descenders = flags.contains(Flags::DISJOINT);

    for i in (0..n).rev() {
        if ctx.rows[i].rail >= 0 {
            if ctx.rows[i].child.is_none()
                && !ctx.rows[i].time_warp
                && !omit_descenders
                && count_nonbranch_children(ctx.rows[i].id) != 0
            {
                riser_to_top(ctx, i);
            }
            continue;
        }
        if ctx.rows[i].is_dup || !ctx.rows[i].participates {
            continue;
        }

        let parent_id = ctx.rows[i].parents[0];
        let parent_index = ctx.by_id.get(&parent_id).copied();

        let (mask, parent_index) = match parent_index {
            None => {
                ctx.max_rail += 1;
                let rail = ctx.max_rail;
                check_budget(ctx)?;
                ctx.rows[i].rail = rail;
                ctx.rows[i].rail_in_use = 1u64 << rail;
                continue;
            }
            Some(pidx) => {
                let parent_idx_val = ctx.rows[pidx].idx;
                let row_idx_val = ctx.rows[i].idx;
                let mask = if parent_idx_val > row_idx_val {
                    let idx_top = ctx.rows[i].idx_top;
                    let near = ctx.rows[pidx].rail;
                    let rail = ctx.find_free_rail(idx_top, parent_idx_val, near);
                    check_budget(ctx)?;
                    ctx.rows[i].rail = rail;
                    ctx.rows[pidx].risers[rail as usize] = row_idx_val as i32;
                    1u64 << rail
                } else {
                    ctx.max_rail += 1;
                    let mut down_rail = ctx.max_rail;
                    if down_rail < 1 {
                        ctx.max_rail += 1;
                        down_rail = ctx.max_rail;
                    }
                    ctx.max_rail += 1;
                    let rail = ctx.max_rail;
                    check_budget(ctx)?;
                    ctx.rows[i].rail = rail;
                    ctx.rows[i].rail_in_use = 1u64 << rail;
                    ctx.rows[pidx].risers[down_rail as usize] = row_idx_val as i32;
                    let down_mask = 1u64 << down_rail;
                    for r in ctx.rows.iter_mut() {
                        r.rail_in_use |= down_mask;
                    }
                    1u64 << rail
                };
                (mask, pidx)
            }
        };

        ctx.rows[i].rail_in_use |= mask;
        if ctx.rows[i].child.is_some() {
            assign_children(ctx, i, flags);
        } else if !omit_descenders
            && count_nonbranch_children(ctx.rows[i].id) != 0
            && !ctx.rows[i].time_warp
        {
            riser_to_top(ctx, i);
        }

        let parent_idx_val = ctx.rows[parent_index].idx;
        let row_idx_val = ctx.rows[i].idx;
        if parent_idx_val > row_idx_val {
            for p in (i + 1)..parent_index {
                ctx.rows[p].rail_in_use |= mask;
            }
        } else {
            for p in (parent_index + 1)..i {
                ctx.rows[p].rail_in_use |= mask;
            }
        }
    }
    Ok(())
}

/// D.5/D.6: draw a merge arrow from every non-primary parent into the
/// row that names it, allocating an off-screen rail the first time a
/// given off-screen id appears.
pub(crate) fn merge_routing(ctx: &mut GraphContext) -> Result<(), GraphError> {
    let mut merge_riser_from: [Option<i64>; MAX_RAIL] = [None; MAX_RAIL];
    let n = ctx.rows.len();

    for i in 0..n {
        let parents = ctx.rows[i].parents.clone();
        let n_non_cherrypick = ctx.rows[i].n_non_cherrypick();
        for (pos, &parent_id) in parents.iter().enumerate().skip(1) {
            let is_cherrypick = pos >= n_non_cherrypick;
            match ctx.by_id.get(&parent_id).copied() {
                None => {
                    let rail = match merge_riser_from
                        .iter()
                        .position(|slot| *slot == Some(parent_id))
                    {
                        Some(r) => r as i32,
                        None => {
                            let row_idx = ctx.rows[i].idx;
                            let last_idx = ctx.rows.len() as u32;
                            let rail = ctx.find_free_rail(row_idx, last_idx, 0);
                            check_budget(ctx)?;
                            merge_riser_from[rail as usize] = Some(parent_id);
                            rail
                        }
                    };
                    let mask = 1u64 << rail;
                    if is_cherrypick {
                        ctx.rows[i].merge_in[rail as usize] = 2;
                        ctx.rows[i].cherrypick_down |= mask;
                    } else {
                        ctx.rows[i].merge_in[rail as usize] = 1;
                        ctx.rows[i].merge_down |= mask;
                    }
                    for p in (i + 1)..n {
                        ctx.rows[p].rail_in_use |= mask;
                    }
                }
                Some(parent_index) => {
                    create_merge_riser(ctx, parent_index, i, is_cherrypick)?;
                }
            }
        }
    }
    Ok(())
}

/// D.6: give a merge-parent row an outgoing riser, reusing its own rail
/// when the existing riser (or the slack left by `self_up`) already
/// reaches far enough up to meet the child.
fn create_merge_riser(
    ctx: &mut GraphContext,
    parent_index: usize,
    child_index: usize,
    is_cherrypick: bool,
) -> Result<(), GraphError> {
    if ctx.rows[parent_index].merge_out < 0 {
        let prail = ctx.rows[parent_index].rail;
        let existing_riser = ctx.rows[parent_index].risers[prail as usize];
        let child_idx = ctx.rows[child_index].idx;
        let parent_idx = ctx.rows[parent_index].idx;
        let self_up = ctx.rows[parent_index].self_up;

        let reuse_own_rail = (existing_riser > 0 && (existing_riser as u32) < child_idx)
            || (parent_idx as i64 - child_idx as i64) < self_up as i64;

        if reuse_own_rail {
            ctx.rows[parent_index].merge_out = prail;
        } else {
            let rail = ctx.find_free_rail(child_idx, parent_idx.saturating_sub(1), prail);
            check_budget(ctx)?;
            ctx.rows[parent_index].merge_out = rail;
            let mask = 1u64 << rail;
            let parent_id = ctx.rows[parent_index].id;
            for p in (child_index + 1)..ctx.rows.len() {
                if ctx.rows[p].id == parent_id {
                    break;
                }
                ctx.rows[p].rail_in_use |= mask;
            }
        }
    }

    let child_idx = ctx.rows[child_index].idx;
    if is_cherrypick {
        let existing = ctx.rows[parent_index].cherrypick_upto;
        if existing == 0 || existing > child_idx {
            ctx.rows[parent_index].cherrypick_upto = child_idx;
        }
    } else {
        ctx.rows[parent_index].has_normal_out_merge = true;
        let existing = ctx.rows[parent_index].merge_upto;
        if existing == 0 || existing > child_idx {
            ctx.rows[parent_index].merge_upto = child_idx;
        }
    }
    let merge_out = ctx.rows[parent_index].merge_out;
    ctx.rows[child_index].merge_in[merge_out as usize] = if is_cherrypick { 2 } else { 1 };
    Ok(())
}

/// D.7: a duplicated row (same id displayed a second time) gets routed
/// to the rightmost rail, joined to its canonical row by a merge riser.
pub(crate) fn duplicate_routing(ctx: &mut GraphContext) -> Result<(), GraphError> {
    if !ctx.rows.iter().any(|r| r.is_dup) {
        return Ok(());
    }
    find_max_rail(ctx);
    let mut mx_rail = ctx.max_rail;
    let mut dup_rail = mx_rail + 1;
    check_budget(ctx)?;

    let dup_indices: Vec<usize> = (0..ctx.rows.len()).filter(|&i| ctx.rows[i].is_dup).collect();
    for i in dup_indices.iter().copied() {
        ctx.rows[i].rail = dup_rail;
        let id = ctx.rows[i].id;
        let canonical = *ctx
            .by_id
            .get(&id)
            .expect("a duplicate id always has a canonical row registered");
        debug_assert_ne!(canonical, i);
        create_merge_riser(ctx, canonical, i, false)?;
        if ctx.rows[canonical].merge_out > mx_rail {
            mx_rail = ctx.rows[canonical].merge_out;
        }
    }
    if dup_rail <= mx_rail {
        dup_rail = mx_rail + 1;
        for i in dup_indices.iter().copied() {
            ctx.rows[i].rail = dup_rail;
        }
    }
    // Resolved open question: the reallocated dup_rail is never checked
    // against the budget in the original; a port should, since the
    // second bump can itself cross MAX_RAIL.
    if mx_rail >= MAX_RAIL as i32 || dup_rail >= MAX_RAIL as i32 {
        ctx.n_err += 1;
        return Err(GraphError::RailExhausted {
            reached: mx_rail.max(dup_rail),
        });
    }
    find_max_rail(ctx);
    Ok(())
}

/// Recompute `max_rail` from scratch by scanning every row's rail,
/// merge-out rail, and merge/cherry-pick down-rail bitmasks.
pub(crate) fn find_max_rail(ctx: &mut GraphContext) {
    let mut mx = 0i32;
    for row in &ctx.rows {
        if row.rail > mx {
            mx = row.rail;
        }
        if row.merge_out > mx {
            mx = row.merge_out;
        }
        while mx < MAX_RAIL as i32 && (row.merge_down | row.cherrypick_down) > (1u64 << (mx + 1)) - 1 {
            mx += 1;
        }
    }
    ctx.max_rail = mx;
}

/// D.8: remap rail numbers to display columns, pulling every row of
/// `preferred_left` as far left as the rails already claimed allow.
/// Skipped whenever a time warp occurred, since the remap assumes rails
/// run strictly top-to-bottom in commit order.
pub(crate) fn rail_remap(ctx: &mut GraphContext, preferred_left: Option<&str>, n_timewarp: u32) {
    let rail_map_len = if ctx.max_rail < 0 {
        0
    } else {
        ctx.max_rail as usize + 1
    };
    ctx.rail_map = (0..rail_map_len).collect();

    if rail_map_len == 0 || n_timewarp != 0 {
        return;
    }
    let Some(branch_name) = preferred_left else {
        return;
    };
    let left = ctx.interner.intern(branch_name);
    let mut j = 0usize;
    for i in 0..ctx.rows.len() {
        let row = &ctx.rows[i];
        if row.rail < 0 || row.branch != left {
            continue;
        }
        let rail = row.rail as usize;
        if ctx.rail_map[rail] < j {
            continue;
        }
        for k in 0..rail_map_len {
            if ctx.rail_map[k] >= j && ctx.rail_map[k] <= rail {
                ctx.rail_map[k] += 1;
            }
        }
        ctx.rail_map[rail] = j;
        j += 1;
    }
}
