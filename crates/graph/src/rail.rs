//! The rail allocator: find a free vertical column over a span of rows.

use crate::{GraphContext, MAX_RAIL};

impl GraphContext {
    /// Return a rail with no bit set in `railInUse` for any row in
    /// `[top_idx, bottom_idx]` (both 1-based, inclusive; `bottom_idx` is
    /// clamped to the last row).
    ///
    /// If `near_rail <= 0`, the smallest free rail wins. Otherwise the free
    /// rail closest to `near_rail` wins, with the lowest-index rail
    /// breaking ties (we scan in increasing order and only replace the
    /// current best on a strictly smaller distance).
    ///
    /// On exhaustion this bumps the error counter and returns rail 0 (the
    /// caller is expected to check [`GraphContext::has_error`] — or more
    /// precisely the internal budget check — right after calling this).
    pub(crate) fn find_free_rail(&mut self, top_idx: u32, bottom_idx: u32, near_rail: i32) -> i32 {
        let bottom_idx = bottom_idx.min(self.rows.len() as u32);
        let mut in_use: u64 = 0;
        if top_idx >= 1 && top_idx <= bottom_idx {
            for idx in top_idx..=bottom_idx {
                in_use |= self.rows[(idx - 1) as usize].rail_in_use;
            }
        }

        let mut best = 0i32;
        let mut best_dist = i32::MAX;
        let mut found = false;
        for rail in 0..MAX_RAIL as i32 {
            if in_use & (1u64 << rail) != 0 {
                continue;
            }
            if near_rail <= 0 {
                best = rail;
                found = true;
                break;
            }
            let dist = (rail - near_rail).abs();
            if dist < best_dist {
                best_dist = dist;
                best = rail;
                found = true;
            }
        }

        if !found {
            self.n_err += 1;
            log::debug!(
                "rail allocator exhausted: no free rail in rows {top_idx}..={bottom_idx} (near rail {near_rail})"
            );
            return best;
        }
        if best > self.max_rail {
            self.max_rail = best;
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Parents;

    fn ctx_with_rows(n: usize) -> GraphContext {
        let mut ctx = GraphContext::new();
        for i in 0..n {
            ctx.add_row(
                i as i64 + 1,
                Parents::Known {
                    ids: vec![],
                    n_cherrypick: 0,
                },
                "trunk",
                "",
                "",
                true,
            )
            .unwrap();
        }
        ctx
    }

    #[test]
    fn picks_smallest_free_rail_by_default() {
        let mut ctx = ctx_with_rows(3);
        ctx.rows[0].rail_in_use = 0b1; // rail 0 occupied on row idx=1
        let rail = ctx.find_free_rail(1, 3, 0);
        assert_eq!(rail, 1);
    }

    #[test]
    fn picks_rail_nearest_to_hint() {
        let mut ctx = ctx_with_rows(1);
        // rails 0,1,2 occupied, nearest free to 1 among {3,4,...} is 3
        ctx.rows[0].rail_in_use = 0b111;
        let rail = ctx.find_free_rail(1, 1, 1);
        assert_eq!(rail, 3);
    }

    #[test]
    fn exhaustion_sets_error() {
        let mut ctx = ctx_with_rows(1);
        ctx.rows[0].rail_in_use = u64::MAX;
        let _ = ctx.find_free_rail(1, 1, 0);
        assert!(ctx.has_error());
    }
}
