//! Pure planning of reorder operations.
//!
//! A [`MovePlan`] turns "item at `from` goes to `to`" into the range shifts
//! that keep every touched container dense. The plan never touches storage;
//! the position manager executes its shifts and then places the item.

use crate::domain::container::{ContainerKey, IndexRange, Slot};

/// Bulk `index = index + delta` over one container
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shift {
    pub container: ContainerKey,
    pub range: IndexRange,
    pub delta: i64,
}

impl Shift {
    pub fn new(container: ContainerKey, range: IndexRange, delta: i64) -> Self {
        Self {
            container,
            range,
            delta,
        }
    }

    /// Closes the gap left at `index` after a removal
    pub fn close_gap(container: ContainerKey, index: i64) -> Self {
        Self::new(container, IndexRange::above(index), -1)
    }

    /// Opens a free slot at `index` for an insertion
    pub fn open_slot(container: ContainerKey, index: i64) -> Self {
        Self::new(container, IndexRange::starting_at(index), 1)
    }

    /// New index for an item at `index` in `container` after this shift
    pub fn apply(&self, container: &ContainerKey, index: i64) -> i64 {
        if &self.container == container && self.range.contains(index) {
            index + self.delta
        } else {
            index
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovePlan {
    /// Target equals the current slot
    Stay(Slot),
    /// Same container, towards the end
    Increase {
        container: ContainerKey,
        from: i64,
        to: i64,
    },
    /// Same container, towards the front
    Decrease {
        container: ContainerKey,
        from: i64,
        to: i64,
    },
    /// Into a different container
    Transfer { from: Slot, to: Slot },
}

impl MovePlan {
    pub fn new(from: Slot, to: Slot) -> Self {
        if from.container != to.container {
            return Self::Transfer { from, to };
        }

        let container = from.container;
        match to.index.cmp(&from.index) {
            std::cmp::Ordering::Greater => Self::Increase {
                container,
                from: from.index,
                to: to.index,
            },
            std::cmp::Ordering::Less => Self::Decrease {
                container,
                from: from.index,
                to: to.index,
            },
            std::cmp::Ordering::Equal => Self::Stay(from),
        }
    }

    /// Where the item ends up
    pub fn target(&self) -> Slot {
        match *self {
            Self::Stay(slot) => slot,
            Self::Increase { container, to, .. } | Self::Decrease { container, to, .. } => {
                Slot::new(container, to)
            }
            Self::Transfer { to, .. } => to,
        }
    }

    pub fn is_transfer(&self) -> bool {
        matches!(self, Self::Transfer { .. })
    }

    pub fn is_stay(&self) -> bool {
        matches!(self, Self::Stay(_))
    }

    /// Shifts to run, in order, before the item is placed at [`target`](Self::target)
    pub fn shifts(&self) -> Vec<Shift> {
        match *self {
            Self::Stay(_) => Vec::new(),
            Self::Increase {
                container,
                from,
                to,
            } => vec![Shift::new(container, IndexRange::between(from + 1, to), -1)],
            Self::Decrease {
                container,
                from,
                to,
            } => vec![Shift::new(container, IndexRange::between(to, from - 1), 1)],
            Self::Transfer { from, to } => vec![
                Shift::close_gap(from.container, from.index),
                Shift::open_slot(to.container, to.index),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{container::is_dense, ListId};

    fn list(id: i64) -> ContainerKey {
        ContainerKey::List(ListId::new(id))
    }

    /// Runs `plan` over `(name, container, index)` rows, moving `mover`
    fn simulate(rows: &mut [(&str, ContainerKey, i64)], mover: &str, plan: MovePlan) {
        for shift in plan.shifts() {
            for row in rows.iter_mut().filter(|row| row.0 != mover) {
                row.2 = shift.apply(&row.1, row.2);
            }
        }
        let target = plan.target();
        let row = rows.iter_mut().find(|row| row.0 == mover).unwrap();
        row.1 = target.container;
        row.2 = target.index;
    }

    fn ordered(rows: &[(&str, ContainerKey, i64)], container: ContainerKey) -> Vec<String> {
        let mut items: Vec<_> = rows.iter().filter(|row| row.1 == container).collect();
        items.sort_by_key(|row| row.2);
        items
            .iter()
            .map(|row| format!("{}:{}", row.0, row.2))
            .collect()
    }

    fn five(container: ContainerKey) -> Vec<(&'static str, ContainerKey, i64)> {
        vec![
            ("A", container, 0),
            ("B", container, 1),
            ("C", container, 2),
            ("D", container, 3),
            ("E", container, 4),
        ]
    }

    #[test]
    fn test_plan_kinds() {
        let c = list(1);
        assert!(MovePlan::new(Slot::new(c, 2), Slot::new(c, 2)).is_stay());
        assert!(matches!(
            MovePlan::new(Slot::new(c, 1), Slot::new(c, 3)),
            MovePlan::Increase { from: 1, to: 3, .. }
        ));
        assert!(matches!(
            MovePlan::new(Slot::new(c, 3), Slot::new(c, 1)),
            MovePlan::Decrease { from: 3, to: 1, .. }
        ));
        assert!(MovePlan::new(Slot::new(c, 0), Slot::new(list(2), 0)).is_transfer());
    }

    #[test]
    fn test_increase_shifts_between_down() {
        let c = list(1);
        let mut rows = five(c);
        simulate(&mut rows, "B", MovePlan::new(Slot::new(c, 1), Slot::new(c, 3)));

        assert_eq!(ordered(&rows, c), ["A:0", "C:1", "D:2", "B:3", "E:4"]);
    }

    #[test]
    fn test_decrease_shifts_between_up() {
        let c = list(1);
        let mut rows = five(c);
        simulate(&mut rows, "D", MovePlan::new(Slot::new(c, 3), Slot::new(c, 1)));

        assert_eq!(ordered(&rows, c), ["A:0", "D:1", "B:2", "C:3", "E:4"]);
    }

    #[test]
    fn test_transfer_closes_source_and_opens_destination() {
        let (source, dest) = (list(1), list(2));
        let mut rows = vec![
            ("a0", source, 0),
            ("a1", source, 1),
            ("a2", source, 2),
            ("b0", dest, 0),
            ("b1", dest, 1),
            ("b2", dest, 2),
        ];
        simulate(
            &mut rows,
            "a1",
            MovePlan::new(Slot::new(source, 1), Slot::new(dest, 2)),
        );

        assert_eq!(ordered(&rows, source), ["a0:0", "a2:1"]);
        assert_eq!(ordered(&rows, dest), ["b0:0", "b1:1", "a1:2", "b2:3"]);
    }

    #[test]
    fn test_stay_has_no_shifts() {
        let c = list(1);
        let plan = MovePlan::new(Slot::new(c, 2), Slot::new(c, 2));
        assert!(plan.shifts().is_empty());
        assert_eq!(plan.target(), Slot::new(c, 2));
    }

    #[test]
    fn test_every_same_container_move_stays_dense() {
        let c = list(1);
        for from in 0..5 {
            for to in 0..5 {
                let mut rows = five(c);
                let mover = rows[from as usize].0;
                simulate(&mut rows, mover, MovePlan::new(Slot::new(c, from), Slot::new(c, to)));
                assert!(is_dense(rows.iter().map(|row| row.2)), "{from} -> {to}");
            }
        }
    }
}
