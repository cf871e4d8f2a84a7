//! Pure tree helpers shared by the folder service.

use uuid::Uuid;

use stowage_entity::folder::Folder;

/// Whether moving `folder_id` under the folder whose ancestor chain is
/// `target_chain` would make the folder its own ancestor.
///
/// `target_chain` must include the target itself, so moving a folder into
/// itself is a cycle too.
pub fn would_create_cycle(folder_id: Uuid, target_chain: &[Uuid]) -> bool {
    target_chain.contains(&folder_id)
}

/// Display names of an ancestor chain, root to leaf.
pub fn path_names(chain: &[Folder]) -> Vec<String> {
    chain.iter().map(|f| f.name.clone()).collect()
}

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, HashSet, VecDeque};

    use proptest::prelude::*;

    use super::*;

    /// In-memory forest: `parents[i]` is the parent index of node `i`.
    struct Forest {
        ids: Vec<Uuid>,
        parents: Vec<Option<usize>>,
    }

    impl Forest {
        fn new(parents: Vec<Option<usize>>) -> Self {
            let ids = (0..parents.len()).map(|_| Uuid::new_v4()).collect();
            Self { ids, parents }
        }

        /// Ancestor chain of `node`, including itself, root first.
        fn chain(&self, node: usize) -> Vec<Uuid> {
            let mut chain = Vec::new();
            let mut current = Some(node);
            while let Some(i) = current {
                chain.push(self.ids[i]);
                current = self.parents[i];
                assert!(chain.len() <= self.ids.len(), "cycle in forest");
            }
            chain.reverse();
            chain
        }

        /// Every node in the subtree rooted at `node`, found top-down.
        fn subtree(&self, node: usize) -> HashSet<usize> {
            let mut children: HashMap<usize, Vec<usize>> = HashMap::new();
            for (i, parent) in self.parents.iter().enumerate() {
                if let Some(p) = parent {
                    children.entry(*p).or_default().push(i);
                }
            }
            let mut seen = HashSet::from([node]);
            let mut queue = VecDeque::from([node]);
            while let Some(n) = queue.pop_front() {
                for &c in children.get(&n).into_iter().flatten() {
                    if seen.insert(c) {
                        queue.push_back(c);
                    }
                }
            }
            seen
        }

        fn is_acyclic(&self) -> bool {
            (0..self.ids.len()).all(|start| {
                let mut steps = 0;
                let mut current = self.parents[start];
                while let Some(i) = current {
                    steps += 1;
                    if steps > self.ids.len() {
                        return false;
                    }
                    current = self.parents[i];
                }
                true
            })
        }
    }

    fn forest_strategy() -> impl Strategy<Value = Vec<Option<usize>>> {
        (2usize..24).prop_flat_map(|n| {
            (0..n)
                .map(|i| {
                    if i == 0 {
                        Just(None).boxed()
                    } else {
                        prop_oneof![1 => Just(None), 4 => (0..i).prop_map(Some)].boxed()
                    }
                })
                .collect::<Vec<_>>()
        })
    }

    proptest! {
        #[test]
        fn rejected_moves_are_exactly_the_cyclic_ones(
            parents in forest_strategy(),
            moves in proptest::collection::vec((0usize..64, 0usize..64), 1..32),
        ) {
            let mut forest = Forest::new(parents);
            let n = forest.ids.len();

            for (a, b) in moves {
                let (folder, target) = (a % n, b % n);
                let rejected = would_create_cycle(forest.ids[folder], &forest.chain(target));
                let cyclic = forest.subtree(folder).contains(&target);
                prop_assert_eq!(rejected, cyclic);

                if !rejected {
                    forest.parents[folder] = Some(target);
                }
                prop_assert!(forest.is_acyclic());
            }
        }
    }

    #[test]
    fn test_moving_into_itself_is_a_cycle() {
        let id = Uuid::new_v4();
        assert!(would_create_cycle(id, &[Uuid::new_v4(), id]));
        assert!(!would_create_cycle(id, &[Uuid::new_v4()]));
    }
}
