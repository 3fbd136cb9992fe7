use tenrec::arena::{active_blocks, free_blocks};
use tenrec::{independents, Context, MDiff};

// The block counters are process-global observations, so the whole
// lifecycle runs in a single test to keep them deterministic.
#[test]
fn arena_lifecycle_recycles_and_releases() {
    assert_eq!(active_blocks(), 0);

    // Small buffers: many fit in one block, a few thousand span several.
    let ctx = Context::<f64>::new(10);
    assert_eq!(ctx.num_directions(), 12);

    let vars: Vec<MDiff<f64>> = (0..2000).map(|i| MDiff::constant(i as f64)).collect();
    assert!(active_blocks() > 1);

    // Dropping every owner returns all blocks to the shared free list.
    drop(vars);
    assert_eq!(active_blocks(), 0);
    assert!(free_blocks() > 0);

    // New allocations pull recycled blocks back out.
    let revived = independents(&[1.0, 2.0, 3.0]);
    assert!(active_blocks() > 0);
    assert_eq!(revived[1].deriv(1), 1.0);
    drop(revived);

    // Closing the context returns everything to the allocator.
    drop(ctx);
    assert_eq!(active_blocks(), 0);
    assert_eq!(free_blocks(), 0);

    // Re-open with a direction count whose buffers exceed one preferred
    // block; old block sizes no longer match and must not be reused.
    let ctx = Context::<f64>::new(1000);
    assert_eq!(ctx.num_directions(), 1000);
    let vars = independents(&vec![0.5; 1000]);
    assert!(active_blocks() >= vars.len());
    for (i, v) in vars.iter().enumerate() {
        assert_eq!(v.deriv(i), 1.0);
        assert_eq!(v.gradient().len(), 1000);
    }
    drop(vars);
    assert_eq!(active_blocks(), 0);
    drop(ctx);
    assert_eq!(free_blocks(), 0);

    // Clones own distinct buffers; mutating one leaves the other intact.
    let _ctx = Context::<f64>::new(4);
    let a = MDiff::<f64>::independent(2.0, 0);
    let mut b = a.clone();
    b.set_independent(7.0, 3);
    assert_eq!(a.value(), 2.0);
    assert_eq!(a.deriv(0), 1.0);
    assert_eq!(a.deriv(3), 0.0);
    assert_eq!(b.deriv(0), 0.0);
    assert_eq!(b.deriv(3), 1.0);

    // Moves transfer the buffer without copying or releasing it.
    let mut held = Vec::new();
    held.push(a);
    let blocks_before = active_blocks();
    let moved = held.pop().unwrap();
    assert_eq!(active_blocks(), blocks_before);
    assert_eq!(moved.deriv(0), 1.0);
}
