//! Parallel Merkle tree construction.
//!
//! The bottom of an XMSS tree is embarrassingly parallel: each batch of
//! leaves needs only its own compact seeds and the shared public seed. The
//! `2^h` leaves are split into contiguous batches of `2^p` leaves, one
//! task per batch. Every task computes its sub-tree root with the
//! single-threaded [`rfc::tree_hash`], publishes it into a shared node
//! matrix, and then merges upward: while its parent slot is empty and the
//! sibling has already been published, it computes the parent with
//! `RAND_HASH` and continues. The last task to reach each junction carries
//! the merge one level higher, so the top of the tree is reduced without a
//! second pass.
//!
//! For small `h` the fixed overhead makes the single-threaded
//! [`rfc::tree_hash`] the better choice; [`crate::xmss::Xmss::key_pair`]
//! switches on `parallelism`. Both paths produce byte-identical roots and
//! flat trees.

use std::sync::Mutex;

use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::wots_plus::adrs::{Adrs, AdrsType};
use crate::xmss::config::XmssConfig;
use crate::xmss::keys::XmssTree;
use crate::xmss::rfc;

type NodeMatrix = Vec<Vec<Option<Vec<u8>>>>;

/// Shared state of one parallel tree build.
pub(crate) struct TreeHash<'a> {
    config: &'a XmssConfig,
    compact_private_seeds: &'a [u8],
    public_seed: &'a [u8],
    /// Levels 0 (leaves) to h (root); level `i` holds `2^(h - i)` slots.
    tree: Mutex<NodeMatrix>,
}

struct Task {
    start_leaf: u64,
    root_level: u32,
    store_tree: bool,
}

impl<'a> TreeHash<'a> {
    pub(crate) fn new(
        config: &'a XmssConfig,
        compact_private_seeds: &'a [u8],
        public_seed: &'a [u8],
    ) -> Self {
        let h = config.h();
        let tree = (0..=h)
            .map(|level| vec![None; 1usize << (h - level)])
            .collect();
        Self {
            config,
            compact_private_seeds,
            public_seed,
            tree: Mutex::new(tree),
        }
    }

    /// Runs the build on a worker pool of exactly `parallelism` threads.
    /// A hash failure in any worker surfaces here, at the barrier.
    pub(crate) fn run(&self, store_tree: bool, parallelism: usize) -> Result<()> {
        let tasks = self.build_tasks(store_tree, parallelism)?;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(parallelism)
            .build()
            .map_err(|e| Error::argument(format!("cannot build worker pool: {e}")))?;
        pool.install(|| tasks.par_iter().try_for_each(|task| self.run_task(task)))
    }

    /// Splits the leaves into contiguous batches of `2^p` with `p` the
    /// largest value in `[1, h)` keeping every worker busy
    /// (`2^p * parallelism < 2^h`), falling back to batches of two.
    fn build_tasks(&self, store_tree: bool, parallelism: usize) -> Result<Vec<Task>> {
        let h = self.config.h();
        let leaf_count = self.config.wotsp_count();
        let parallelism = parallelism as u64;

        let mut batch: u64 = 0;
        for i in 1..h {
            let leaves_per_task = 1u64 << i;
            if leaves_per_task * parallelism >= leaf_count {
                break;
            }
            batch = leaves_per_task;
        }
        if batch == 0 {
            batch = 2;
        }

        if batch % 2 != 0 || !batch.is_power_of_two() {
            return Err(Error::invariant(format!(
                "leaves per task must be an even power of 2, was {batch}"
            )));
        }

        let root_level = batch.trailing_zeros();
        let task_count = leaf_count / batch;

        let tasks: Vec<Task> = (0..leaf_count)
            .step_by(batch as usize)
            .map(|start_leaf| Task {
                start_leaf,
                root_level,
                store_tree,
            })
            .collect();

        if tasks.len() as u64 != task_count {
            return Err(Error::invariant(format!(
                "built {} tasks, expected {task_count}",
                tasks.len()
            )));
        }
        Ok(tasks)
    }

    fn run_task(&self, task: &Task) -> Result<()> {
        let config = self.config;
        let h = config.h();
        let n = config.wots().n();

        // Phase 1, outside the lock: the task's own sub-tree.
        let mut local_flat = if task.store_tree {
            vec![0u8; ((1usize << (task.root_level + 1)) - 1) * n]
        } else {
            Vec::new()
        };
        let mut adrs = Adrs::new();
        let root = rfc::tree_hash(
            config,
            task.start_leaf,
            task.root_level,
            self.compact_private_seeds,
            self.public_seed,
            &mut adrs,
            task.store_tree.then(|| local_flat.as_mut_slice()),
        )?;
        let root_index = task.start_leaf >> task.root_level;

        let mut tree = self
            .tree
            .lock()
            .map_err(|_| Error::invariant("node matrix lock poisoned"))?;

        // Phase 2: publish, translating local flat offsets to absolute
        // (height, index) coordinates when storing.
        if task.store_tree {
            for height in 0..=task.root_level {
                let count = 1u64 << (task.root_level - height);
                let absolute_base = task.start_leaf >> height;
                for i in 0..count {
                    let offset = rfc::flat_tree_index(height, i, 0, task.root_level, n)?;
                    let value = local_flat[offset..offset + n].to_vec();
                    Self::publish(&mut tree, height, absolute_base + i, value)?;
                }
            }
        } else {
            Self::publish(&mut tree, task.root_level, root_index, root.clone())?;
        }

        // Phase 3, same critical section: merge upward while the parent is
        // missing and the sibling is available.
        let mut height = task.root_level;
        let mut index = root_index;
        let mut value = root;
        let mut merge_adrs = Adrs::from(AdrsType::HashTree);
        while height < h {
            let parent_index = index >> 1;
            if tree[(height + 1) as usize][parent_index as usize].is_some() {
                break;
            }
            let sibling = match &tree[height as usize][(index ^ 1) as usize] {
                Some(node) => node.clone(),
                None => break,
            };

            merge_adrs.set_tree_height(height);
            merge_adrs.set_tree_index(parent_index as u32);
            let mut parent = vec![0u8; n];
            if index % 2 == 0 {
                rfc::rand_hash(config, &value, &sibling, self.public_seed, &mut merge_adrs, &mut parent)?;
            } else {
                rfc::rand_hash(config, &sibling, &value, self.public_seed, &mut merge_adrs, &mut parent)?;
            }
            Self::publish(&mut tree, height + 1, parent_index, parent.clone())?;

            height += 1;
            index = parent_index;
            value = parent;
        }

        Ok(())
    }

    fn publish(tree: &mut NodeMatrix, height: u32, index: u64, value: Vec<u8>) -> Result<()> {
        let slot = &mut tree[height as usize][index as usize];
        if slot.is_some() {
            return Err(Error::invariant(format!(
                "tree node ({height}, {index}) already set"
            )));
        }
        *slot = Some(value);
        Ok(())
    }

    /// The Merkle root, available once [`run`](Self::run) returned.
    pub(crate) fn root(&self) -> Result<Vec<u8>> {
        let tree = self
            .tree
            .lock()
            .map_err(|_| Error::invariant("node matrix lock poisoned"))?;
        tree[self.config.h() as usize][0]
            .clone()
            .ok_or_else(|| Error::invariant("tree root was never published"))
    }

    /// Assembles the canonical flat tree. Only valid after a storing run;
    /// a hole in the matrix is an invariant violation.
    pub(crate) fn to_tree(&self) -> Result<XmssTree> {
        let h = self.config.h();
        let n = self.config.wots().n();
        let tree = self
            .tree
            .lock()
            .map_err(|_| Error::invariant("node matrix lock poisoned"))?;

        let mut flat = vec![0u8; self.config.tree_node_count() * n];
        for (height, level) in tree.iter().enumerate() {
            for (index, node) in level.iter().enumerate() {
                let node = node.as_ref().ok_or_else(|| {
                    Error::invariant(format!("tree node ({height}, {index}) was never published"))
                })?;
                let offset = rfc::flat_tree_index(height as u32, index as u64, 0, h, n)?;
                flat[offset..offset + n].copy_from_slice(node);
            }
        }

        XmssTree::new(h, n, flat)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::sha2::Sha256Hash;
    use crate::wots_plus::WotsConfig;
    use rand::rngs::StdRng;
    use rand::{RngCore, SeedableRng};
    use std::sync::Arc;

    fn config(h: u32) -> XmssConfig {
        let wots = WotsConfig::compact_32(Arc::new(Sha256Hash)).unwrap();
        XmssConfig::new(None, wots, h).unwrap()
    }

    fn seeds(config: &XmssConfig, seed: u64) -> (Vec<u8>, Vec<u8>) {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut compact = vec![0u8; config.compact_private_keys_length()];
        let mut public_seed = vec![0u8; config.wots().n()];
        rng.fill_bytes(&mut compact);
        rng.fill_bytes(&mut public_seed);
        (compact, public_seed)
    }

    fn serial_flat_tree(config: &XmssConfig, compact: &[u8], public_seed: &[u8]) -> (Vec<u8>, Vec<u8>) {
        let n = config.wots().n();
        let mut flat = vec![0u8; config.tree_node_count() * n];
        let mut adrs = Adrs::new();
        let root = rfc::tree_hash(
            config,
            0,
            config.h(),
            compact,
            public_seed,
            &mut adrs,
            Some(&mut flat),
        )
        .unwrap();
        (root, flat)
    }

    #[test]
    fn parallel_matches_serial_for_every_worker_count() {
        let config = config(4);
        let (compact, public_seed) = seeds(&config, 1);
        let (serial_root, serial_flat) = serial_flat_tree(&config, &compact, &public_seed);

        for parallelism in [2usize, 3, 4, 8] {
            let builder = TreeHash::new(&config, &compact, &public_seed);
            builder.run(true, parallelism).unwrap();

            let root = builder.root().unwrap();
            assert_eq!(root, serial_root, "root with parallelism {parallelism}");

            let tree = builder.to_tree().unwrap();
            assert_eq!(
                tree.flat_tree(),
                &serial_flat[..],
                "flat tree with parallelism {parallelism}"
            );
        }
    }

    #[test]
    fn non_storing_run_still_reduces_to_the_root() {
        let config = config(4);
        let (compact, public_seed) = seeds(&config, 2);
        let (serial_root, _) = serial_flat_tree(&config, &compact, &public_seed);

        let builder = TreeHash::new(&config, &compact, &public_seed);
        builder.run(false, 3).unwrap();
        assert_eq!(builder.root().unwrap(), serial_root);

        // Without storing, only levels at and above the batch root are
        // populated, so the flat tree cannot be assembled.
        assert!(builder.to_tree().is_err());
    }

    #[test]
    fn minimal_tree_runs_as_a_single_task() {
        let config = config(1);
        let (compact, public_seed) = seeds(&config, 3);
        let (serial_root, serial_flat) = serial_flat_tree(&config, &compact, &public_seed);

        let builder = TreeHash::new(&config, &compact, &public_seed);
        builder.run(true, 4).unwrap();
        assert_eq!(builder.root().unwrap(), serial_root);
        assert_eq!(builder.to_tree().unwrap().flat_tree(), &serial_flat[..]);
    }

    #[test]
    fn publish_rejects_duplicates() {
        let config = config(2);
        let (compact, public_seed) = seeds(&config, 4);
        let builder = TreeHash::new(&config, &compact, &public_seed);

        let mut tree = builder.tree.lock().unwrap();
        TreeHash::publish(&mut tree, 0, 0, vec![0u8; 32]).unwrap();
        let err = TreeHash::publish(&mut tree, 0, 0, vec![0u8; 32]).unwrap_err();
        assert!(matches!(err, Error::Invariant(_)));
    }
}
