//! Who cooks next.
//!
//! Waiting dishes are ranked by effective wait (projected idle time divided by priority),
//! ties keeping arrival order. With `N = cooks - cooking`, the first `N` dishes start and
//! every other dish gains `max(N, 1)` priority, so a dish that keeps losing climbs the
//! ranking even when no cook is free.

#[derive(Debug, Clone, PartialEq)]
pub struct Plan<D> {
    pub start: Vec<D>,
    pub passed_over: Vec<D>,
    /// Priority added to every passed-over dish.
    pub increment: u32,
}

pub fn plan_activations<D>(mut ranked: Vec<(D, f64)>, cooks: usize, cooking: usize) -> Plan<D> {
    ranked.sort_by(|a, b| a.1.total_cmp(&b.1));

    let capacity = cooks.saturating_sub(cooking);
    let increment = u32::try_from(capacity.max(1)).unwrap_or(u32::MAX);

    let mut dishes = ranked.into_iter().map(|(dish, _)| dish);
    let start = dishes.by_ref().take(capacity).collect();
    Plan {
        start,
        passed_over: dishes.collect(),
        increment,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_cook_two_dishes() {
        let plan = plan_activations(vec![("soup", 0.0), ("steak", 0.0)], 1, 0);
        assert_eq!(plan.start, vec!["soup"], "arrival order breaks the tie");
        assert_eq!(plan.passed_over, vec!["steak"]);
        assert_eq!(plan.increment, 1);
    }

    #[test]
    fn test_shortest_effective_wait_first() {
        let plan = plan_activations(vec![("a", 4.0), ("b", 0.5), ("c", 2.0), ("d", f64::INFINITY)], 3, 1);
        assert_eq!(plan.start, vec!["b", "c"]);
        assert_eq!(plan.passed_over, vec!["a", "d"]);
        assert_eq!(plan.increment, 2);
    }

    #[test]
    fn test_busy_kitchen_still_ages_everyone() {
        let plan = plan_activations(vec![("a", 1.0), ("b", 2.0)], 2, 2);
        assert!(plan.start.is_empty());
        assert_eq!(plan.passed_over, vec!["a", "b"]);
        assert_eq!(plan.increment, 1);

        let overbooked = plan_activations(vec![("a", 1.0)], 1, 3);
        assert!(overbooked.start.is_empty());
    }

    #[test]
    fn test_more_cooks_than_dishes() {
        let plan = plan_activations(vec![("a", 1.0)], 4, 0);
        assert_eq!(plan.start, vec!["a"]);
        assert!(plan.passed_over.is_empty());
    }
}
