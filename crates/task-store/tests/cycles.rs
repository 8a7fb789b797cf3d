//! Scenario S2: cycle and self-dependency rejection.

use std::collections::{HashSet, VecDeque};

use task_store::{TaskId, TaskStore, TaskStoreError};

#[test]
fn direct_cycle_is_rejected() {
	let store = TaskStore::new();
	let a = store.create("a", None, None).unwrap();
	let b = store.create("b", None, None).unwrap();

	store.add_dependency(&b.id, &a.id).unwrap(); // b blocked by a
	let err = store.add_dependency(&a.id, &b.id).unwrap_err(); // a blocked by b: cycle
	assert_eq!(err, TaskStoreError::DependencyCycle);
}

#[test]
fn transitive_cycle_is_rejected() {
	let store = TaskStore::new();
	let a = store.create("a", None, None).unwrap();
	let b = store.create("b", None, None).unwrap();
	let c = store.create("c", None, None).unwrap();

	store.add_dependency(&b.id, &a.id).unwrap(); // b blocked by a: a -> b
	store.add_dependency(&c.id, &b.id).unwrap(); // c blocked by b: b -> c
	let err = store.add_dependency(&a.id, &c.id).unwrap_err(); // a blocked by c: c -> a closes the loop
	assert_eq!(err, TaskStoreError::DependencyCycle);
}

#[test]
fn self_dependency_is_rejected() {
	let store = TaskStore::new();
	let a = store.create("a", None, None).unwrap();
	let err = store.add_dependency(&a.id, &a.id).unwrap_err();
	assert_eq!(err, TaskStoreError::SelfDependency);
}

#[test]
fn adding_same_dependency_twice_is_idempotent() {
	let store = TaskStore::new();
	let a = store.create("a", None, None).unwrap();
	let b = store.create("b", None, None).unwrap();
	store.add_dependency(&b.id, &a.id).unwrap();
	store.add_dependency(&b.id, &a.id).unwrap();
	assert_eq!(store.get(&b.id).unwrap().blocked_by.len(), 1);
	assert_eq!(store.get(&a.id).unwrap().blocks.len(), 1);
}

#[test]
fn removing_absent_dependency_is_idempotent() {
	let store = TaskStore::new();
	let a = store.create("a", None, None).unwrap();
	let b = store.create("b", None, None).unwrap();
	store.remove_dependency(&b.id, &a.id).unwrap();
	store.remove_dependency(&b.id, &a.id).unwrap();
}

/// Whether `to` is reachable from `from` by following one or more
/// `blocks` edges (i.e. strictly downstream of `from`, not counting
/// `from` itself as trivially reachable from `from`).
fn is_reachable(store: &TaskStore, from: &TaskId, to: &TaskId) -> bool {
	let mut visited: HashSet<TaskId> = HashSet::new();
	let mut queue: VecDeque<TaskId> = store.get(from).map(|t| t.blocks.into()).unwrap_or_default();
	while let Some(id) = queue.pop_front() {
		if &id == to {
			return true;
		}
		if !visited.insert(id.clone()) {
			continue;
		}
		if let Ok(task) = store.get(&id) {
			queue.extend(task.blocks);
		}
	}
	false
}

proptest::proptest! {
	/// No matter which sequence of dependency edges is attempted across a
	/// fixed pool of tasks, the graph never ends up with a task blocking
	/// itself transitively — every rejected edge stays rejected and no
	/// accepted edge ever closes a loop (spec.md §4.2 invariant 3).
	#[test]
	fn arbitrary_dependency_attempts_never_produce_a_cycle(
		edges in proptest::collection::vec((0usize..6, 0usize..6), 0..40),
	) {
		let store = TaskStore::new();
		let ids: Vec<TaskId> = (0..6)
			.map(|i| store.create(format!("t{i}"), None, None).unwrap().id)
			.collect();

		for (from_idx, to_idx) in edges {
			let _ = store.add_dependency(&ids[from_idx], &ids[to_idx]);
		}

		for id in &ids {
			proptest::prop_assert!(!is_reachable(&store, id, id));
		}
	}
}
