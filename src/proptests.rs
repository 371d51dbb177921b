use super::*;

use proptest::prelude::*;

fn validate_heap<T, C: Comparer<T>>(heap: &IndexedMinHeap<T, C>) {
    if let Err(msg) = heap.check_invariants() {
        panic!("invariant violated: {msg}");
    }
    assert!(
        heap.slots.len() <= heap.slots.capacity(),
        "len must not exceed backing capacity"
    );
}

/// Multiset model: a sorted vector plus the value each live handle refers to.
#[derive(Default)]
struct Model {
    values: Vec<i32>,
    handles: Vec<(Handle, i32)>,
    dead: Vec<Handle>,
}

impl Model {
    fn insert(&mut self, value: i32) {
        let at = self.values.partition_point(|&v| v <= value);
        self.values.insert(at, value);
    }

    fn remove(&mut self, value: i32) {
        let at = self
            .values
            .binary_search(&value)
            .unwrap_or_else(|_| panic!("model lost value {value}"));
        self.values.remove(at);
    }

    fn forget(&mut self, handle: Handle) {
        self.handles.retain(|&(h, _)| h != handle);
        self.dead.push(handle);
    }
}

#[derive(Clone, Debug)]
enum Op {
    Push(i32),
    Insert(i32),
    Pop,
    RemoveHandle(usize),
    Update(usize, i32),
    RemoveValue(i32),
    UseDead(usize),
    Clear,
    Trim,
}

fn ops_strategy() -> impl Strategy<Value = Vec<Op>> {
    let value = -50i32..50;
    let op = prop_oneof![
        20 => value.clone().prop_map(Op::Push),
        25 => value.clone().prop_map(Op::Insert),
        15 => Just(Op::Pop),
        15 => any::<usize>().prop_map(Op::RemoveHandle),
        15 => (any::<usize>(), value.clone()).prop_map(|(i, v)| Op::Update(i, v)),
        5 => value.prop_map(Op::RemoveValue),
        3 => any::<usize>().prop_map(Op::UseDead),
        1 => Just(Op::Clear),
        1 => Just(Op::Trim),
    ];
    prop::collection::vec(op, 0..=500)
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        max_shrink_iters: 50_000,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_matches_sorted_model(ops in ops_strategy()) {
        let mut heap: IndexedMinHeap<i32> = IndexedMinHeap::new();
        let mut m = Model::default();

        for op in ops {
            match op {
                Op::Push(v) => {
                    heap.push(v);
                    m.insert(v);
                }
                Op::Insert(v) => {
                    let h = heap.insert(v);
                    m.insert(v);
                    m.handles.push((h, v));
                }
                Op::Pop => {
                    let got = heap.pop();
                    match m.values.first().copied() {
                        Some(min) => {
                            prop_assert_eq!(got, Ok(min));
                            m.remove(min);
                            // Whichever element carried the handle is gone; drop
                            // any handle that no longer resolves.
                            let gone: Vec<Handle> = m
                                .handles
                                .iter()
                                .filter(|&&(h, _)| !heap.contains_handle(h))
                                .map(|&(h, _)| h)
                                .collect();
                            prop_assert!(gone.len() <= 1);
                            for h in gone {
                                m.forget(h);
                            }
                        }
                        None => prop_assert_eq!(got, Err(HeapError::Empty)),
                    }
                }
                Op::RemoveHandle(i) => {
                    if m.handles.is_empty() {
                        continue;
                    }
                    let (h, v) = m.handles[i % m.handles.len()];
                    prop_assert_eq!(heap.remove(h), Ok(v));
                    m.remove(v);
                    m.forget(h);
                }
                Op::Update(i, v) => {
                    if m.handles.is_empty() {
                        continue;
                    }
                    let idx = i % m.handles.len();
                    let (h, old) = m.handles[idx];
                    let len = heap.len();
                    prop_assert_eq!(heap.update(h, v), Ok(old));
                    prop_assert_eq!(heap.len(), len);
                    m.remove(old);
                    m.insert(v);
                    m.handles[idx].1 = v;
                }
                Op::RemoveValue(v) => {
                    let present = m.values.binary_search(&v).is_ok();
                    prop_assert_eq!(heap.remove_value(&v), present);
                    if present {
                        m.remove(v);
                        let gone: Vec<Handle> = m
                            .handles
                            .iter()
                            .filter(|&&(h, _)| !heap.contains_handle(h))
                            .map(|&(h, _)| h)
                            .collect();
                        for h in gone {
                            m.forget(h);
                        }
                    }
                }
                Op::UseDead(i) => {
                    if m.dead.is_empty() {
                        continue;
                    }
                    let h = m.dead[i % m.dead.len()];
                    let before = heap.len();
                    let err = heap.remove(h).unwrap_err();
                    prop_assert_eq!(err.kind(), ErrorKind::InvalidOperation);
                    prop_assert!(heap.update(h, 0).is_err());
                    prop_assert_eq!(heap.len(), before);
                }
                Op::Clear => {
                    heap.clear();
                    m.values.clear();
                    let live: Vec<Handle> = m.handles.iter().map(|&(h, _)| h).collect();
                    for h in live {
                        m.forget(h);
                    }
                }
                Op::Trim => heap.trim_excess(),
            }

            prop_assert_eq!(heap.len(), m.values.len());
            prop_assert_eq!(heap.peek().ok().copied(), m.values.first().copied());
            validate_heap(&heap);
            for &(h, v) in &m.handles {
                prop_assert_eq!(heap.get(h), Ok(&v));
            }
        }

        prop_assert_eq!(heap.into_sorted_vec(), m.values);
    }

    #[test]
    fn prop_mutation_breaks_cursor(
        values in prop::collection::vec(any::<i16>(), 1..64),
        extra in any::<i16>(),
    ) {
        let mut heap: IndexedMinHeap<i16> = values.iter().copied().collect();
        let mut cursor = heap.cursor();
        prop_assert!(cursor.next(&heap).unwrap().is_some());
        heap.push(extra);
        prop_assert_eq!(cursor.next(&heap), Err(HeapError::ConcurrentModification));
    }
}

/// Visit every ordering of `items` (Heap's algorithm, iterative).
fn for_each_permutation<T: Clone>(items: &[T], mut visit: impl FnMut(Vec<T>)) {
    let mut perm = items.to_vec();
    let mut counters = vec![0usize; perm.len()];
    visit(perm.clone());

    let mut level = 1;
    while level < perm.len() {
        if counters[level] < level {
            let other = if level % 2 == 0 { 0 } else { counters[level] };
            perm.swap(other, level);
            visit(perm.clone());
            counters[level] += 1;
            level = 1;
        } else {
            counters[level] = 0;
            level += 1;
        }
    }
}

#[test]
fn permutation_helper_covers_all_orders() {
    let mut seen = std::collections::BTreeSet::new();
    for_each_permutation(&[1, 2, 3, 4], |perm| {
        seen.insert(perm);
    });
    assert_eq!(seen.len(), 24);
}

#[test]
fn exhaustive_insert_order_small_set() {
    let values = vec![3, 1, 4, 1, 5, 9];

    for_each_permutation(&values, |perm| {
        let mut heap = IndexedMinHeap::new();
        for v in perm {
            heap.insert(v);
            validate_heap(&heap);
        }
        assert_eq!(heap.into_sorted_vec(), vec![1, 1, 3, 4, 5, 9]);
    });
}

#[test]
fn exhaustive_remove_order_small_set() {
    let values = [3, 1, 4, 1, 5, 9];

    for_each_permutation(&(0..values.len()).collect::<Vec<_>>(), |order| {
        let mut heap = IndexedMinHeap::new();
        let handles: Vec<Handle> = values.iter().map(|&v| heap.insert(v)).collect();

        for i in order {
            assert_eq!(heap.remove(handles[i]), Ok(values[i]));
            assert!(!heap.contains_handle(handles[i]));
            validate_heap(&heap);
        }
        assert!(heap.is_empty());
        assert_eq!(heap.issued_handles(), 0);
    });
}
