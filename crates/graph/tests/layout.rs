//! End-to-end layout scenarios. Rows are added newest-first, as a caller
//! walking a commit history backwards would: a row's parents are added
//! *after* it and so get a larger `idx`, except in the time-warp
//! scenario where that invariant is deliberately broken.

use tlgraph::{Flags, GraphContext, Parents};

fn known(ids: &[i64]) -> Parents {
    Parents::Known {
        ids: ids.to_vec(),
        n_cherrypick: 0,
    }
}

fn no_nonbranch_children(_id: i64) -> u32 {
    0
}

#[test]
fn s1_linear_trunk_stays_on_one_rail() {
    let mut ctx = GraphContext::new();
    ctx.add_row(3, known(&[2]), "trunk", "", "cafe3", true).unwrap();
    ctx.add_row(2, known(&[1]), "trunk", "", "cafe2", false).unwrap();
    ctx.add_row(1, known(&[]), "trunk", "", "cafe1", false).unwrap();

    ctx.finish(None, Flags::empty(), no_nonbranch_children).unwrap();
    assert!(!ctx.has_error());

    for row in ctx.rows() {
        assert_eq!(row.rail, 0, "row {} should stay on rail 0", row.id);
    }
    assert_eq!(ctx.max_rail(), 0);
}

#[test]
fn primary_child_never_crosses_branches() {
    // off-branch tip (feature) is added before the same-branch tip
    // (trunk), so a buggy picker that ignores branch would let the
    // off-branch row win the base's `child` slot.
    let mut ctx = GraphContext::new();
    ctx.add_row(30, known(&[10]), "feature", "", "", true).unwrap();
    ctx.add_row(20, known(&[10]), "trunk", "", "", true).unwrap();
    ctx.add_row(10, known(&[]), "trunk", "", "", false).unwrap();

    ctx.finish(None, Flags::empty(), no_nonbranch_children).unwrap();
    assert!(!ctx.has_error());

    for row in ctx.rows() {
        if let Some(child) = row.child {
            let child_branch = ctx.rows()[child].branch;
            assert_eq!(
                child_branch, row.branch,
                "a primary-child edge must connect rows on the same branch"
            );
        }
    }

    let base = ctx.rows().iter().find(|r| r.id == 10).unwrap();
    let child = &ctx.rows()[base.child.unwrap()];
    assert_eq!(child.id, 20, "trunk tip, not the feature tip, should be the base's primary child");
}

#[test]
fn s2_fork_uses_two_rails() {
    let mut ctx = GraphContext::new();
    // two tips forking off a shared base, newest first
    ctx.add_row(30, known(&[10]), "feature", "", "", true).unwrap();
    ctx.add_row(20, known(&[10]), "trunk", "", "", true).unwrap();
    ctx.add_row(10, known(&[]), "trunk", "", "", false).unwrap();

    ctx.finish(None, Flags::empty(), no_nonbranch_children).unwrap();
    assert!(!ctx.has_error());

    let rails: std::collections::HashSet<i32> = ctx.rows().iter().map(|r| r.rail).collect();
    assert_eq!(rails.len(), 2, "fork should occupy two distinct rails");
    assert_eq!(ctx.max_rail(), 1);
}

#[test]
fn s3_merge_draws_an_incoming_merge_arrow() {
    let mut ctx = GraphContext::new();
    // id 40 merges id 10 (the feature tip) into trunk.
    ctx.add_row(40, known(&[20, 10]), "trunk", "", "", true).unwrap();
    ctx.add_row(20, known(&[5]), "trunk", "", "", false).unwrap();
    ctx.add_row(10, known(&[5]), "feature", "", "", true).unwrap();
    ctx.add_row(5, known(&[]), "trunk", "", "", false).unwrap();

    ctx.finish(None, Flags::empty(), no_nonbranch_children).unwrap();
    assert!(!ctx.has_error());

    let merge_row = ctx.rows().iter().find(|r| r.id == 40).unwrap();
    assert!(merge_row.merge_in.iter().any(|&m| m == 1), "expected a solid incoming merge");

    let feature_tip = ctx.rows().iter().find(|r| r.id == 10).unwrap();
    assert!(feature_tip.merge_out >= 0, "feature tip should have an outgoing merge riser");
    assert!(feature_tip.has_normal_out_merge);
}

#[test]
fn s4_cherry_pick_merge_is_marked_dashed() {
    let mut ctx = GraphContext::new();
    ctx.add_row(
        40,
        Parents::Known {
            ids: vec![20, 10],
            n_cherrypick: 1,
        },
        "trunk",
        "",
        "",
        true,
    )
    .unwrap();
    ctx.add_row(20, known(&[5]), "trunk", "", "", false).unwrap();
    ctx.add_row(10, known(&[5]), "feature", "", "", true).unwrap();
    ctx.add_row(5, known(&[]), "trunk", "", "", false).unwrap();

    ctx.finish(None, Flags::empty(), no_nonbranch_children).unwrap();
    assert!(!ctx.has_error());

    let merge_row = ctx.rows().iter().find(|r| r.id == 40).unwrap();
    assert!(
        merge_row.merge_in.iter().any(|&m| m == 2),
        "expected a dashed cherry-pick incoming merge"
    );
    assert_ne!(merge_row.cherrypick_down, 0);

    let feature_tip = ctx.rows().iter().find(|r| r.id == 10).unwrap();
    assert_ne!(feature_tip.cherrypick_upto, 0);
    assert!(!feature_tip.has_normal_out_merge);
}

#[test]
fn s5_time_warp_marks_the_parent_not_the_child() {
    let mut ctx = GraphContext::new();
    // id 1 (the parent) is added *before* id 2 (its child), so id 1 ends
    // up displayed above id 2 -- an inverted, broken-clock history.
    ctx.add_row(1, known(&[]), "trunk", "", "", false).unwrap();
    ctx.add_row(2, known(&[1]), "trunk", "", "", true).unwrap();

    ctx.finish(None, Flags::empty(), no_nonbranch_children).unwrap();
    assert!(!ctx.has_error());

    let parent = ctx.rows().iter().find(|r| r.id == 1).unwrap();
    let child = ctx.rows().iter().find(|r| r.id == 2).unwrap();
    assert!(parent.time_warp, "the parent should carry the time-warp flag");
    assert!(!child.time_warp, "the child is never the one marked");
}

#[test]
fn s6_rail_exhaustion_is_reported_as_an_error() {
    let mut ctx = GraphContext::new();
    // one root with far more same-branch-crossing children than rails
    // available forces every fork onto its own rail until the budget is
    // blown; 50 leaves on distinct branches guarantees > MAX_RAIL rails.
    let root_id = 1000;
    for i in 0..50i64 {
        ctx.add_row(
            i,
            known(&[root_id]),
            &format!("branch-{i}"),
            "",
            "",
            true,
        )
        .unwrap();
    }
    ctx.add_row(root_id, known(&[]), "trunk", "", "", false).unwrap();

    let result = ctx.finish(None, Flags::empty(), no_nonbranch_children);
    assert!(result.is_err());
    assert!(ctx.has_error());
}

#[test]
fn disjoint_flag_omits_descenders() {
    let mut ctx = GraphContext::new();
    ctx.add_row(2, known(&[1]), "trunk", "", "", true).unwrap();
    ctx.add_row(1, known(&[]), "trunk", "", "", false).unwrap();

    ctx.finish(None, Flags::DISJOINT, no_nonbranch_children).unwrap();
    assert!(!ctx.has_error());
    for row in ctx.rows() {
        assert!(!row.b_descender);
    }
}

#[test]
fn fillgaps_bridges_a_missing_primary_parent() {
    let mut ctx = GraphContext::new();
    // row 2's primary parent (id 99) is never added: off-screen.
    ctx.add_row(2, known(&[99]), "trunk", "", "", true).unwrap();
    ctx.add_row(1, known(&[]), "trunk", "", "", false).unwrap();

    ctx.finish(None, Flags::FILLGAPS, no_nonbranch_children).unwrap();
    assert!(!ctx.has_error());

    let bridged = ctx.rows().iter().find(|r| r.id == 1).unwrap();
    assert!(bridged.is_step_parent);
}

#[test]
fn second_finish_call_is_rejected() {
    let mut ctx = GraphContext::new();
    ctx.add_row(1, known(&[]), "trunk", "", "", true).unwrap();
    ctx.finish(None, Flags::empty(), no_nonbranch_children).unwrap();
    let second = ctx.finish(None, Flags::empty(), no_nonbranch_children);
    assert!(second.is_err());
}

#[test]
fn add_row_after_finish_is_rejected() {
    let mut ctx = GraphContext::new();
    ctx.add_row(1, known(&[]), "trunk", "", "", true).unwrap();
    ctx.finish(None, Flags::empty(), no_nonbranch_children).unwrap();
    let result = ctx.add_row(2, known(&[1]), "trunk", "", "", true);
    assert!(result.is_err());
}

#[test]
fn empty_graph_finishes_cleanly() {
    let mut ctx = GraphContext::new();
    ctx.finish(None, Flags::empty(), no_nonbranch_children).unwrap();
    assert!(!ctx.has_error());
    assert_eq!(ctx.max_rail(), -1);
    assert!(ctx.rail_map().is_empty());
}
