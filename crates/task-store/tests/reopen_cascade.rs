//! Scenario S3: reopening a completed task transitively re-blocks every
//! downstream task, overriding a downstream task's own `completed`
//! status if it had raced ahead.

use task_store::{TaskStatus, TaskStore, TaskUpdate};

fn complete(store: &TaskStore, id: &task_store::TaskId) {
	store
		.update(
			id,
			TaskUpdate {
				status: Some(TaskStatus::Completed),
				..Default::default()
			},
		)
		.unwrap();
}

#[test]
fn reopening_a_transitively_reblocks_b_and_c() {
	let store = TaskStore::new();
	let a = store.create("a", None, None).unwrap();
	let b = store.create("b", None, None).unwrap();
	let c = store.create("c", None, None).unwrap();

	store.add_dependency(&b.id, &a.id).unwrap(); // a -> b
	store.add_dependency(&c.id, &b.id).unwrap(); // b -> c

	complete(&store, &a.id);
	complete(&store, &b.id);
	complete(&store, &c.id);

	assert_eq!(store.get(&a.id).unwrap().status, TaskStatus::Completed);
	assert_eq!(store.get(&b.id).unwrap().status, TaskStatus::Completed);
	assert_eq!(store.get(&c.id).unwrap().status, TaskStatus::Completed);

	// Reopen a.
	store
		.update(
			&a.id,
			TaskUpdate {
				status: Some(TaskStatus::Pending),
				..Default::default()
			},
		)
		.unwrap();

	assert_eq!(store.get(&a.id).unwrap().status, TaskStatus::Pending);
	assert_eq!(store.get(&b.id).unwrap().status, TaskStatus::Blocked);
	assert_eq!(store.get(&c.id).unwrap().status, TaskStatus::Blocked);
}
