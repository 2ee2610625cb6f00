use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};

use chatline_core::{Cursor, Message, Page, PageCache};

/// A cache holding `pages` pages of `per_page` messages each.
fn filled_cache(pages: usize, per_page: usize) -> PageCache {
    let mut cache = PageCache::new();
    for p in 0..pages {
        let items = (0..per_page)
            .map(|i| Message::new(format!("m-{p}-{i}")).with_field("content", "lorem ipsum"))
            .collect();
        cache.append_older_page(Page::new(items, Some(Cursor::new(format!("c-{p}")))));
    }
    cache
}

fn bench_merge_created(c: &mut Criterion) {
    c.bench_function("merge_created_5k", |b| {
        b.iter_batched(
            || filled_cache(100, 50),
            |mut cache| cache.merge_created(black_box(Message::new("fresh"))),
            BatchSize::LargeInput,
        )
    });
}

fn bench_apply_updated_tail(c: &mut Criterion) {
    c.bench_function("apply_updated_tail_5k", |b| {
        b.iter_batched(
            || filled_cache(100, 50),
            |mut cache| {
                cache.apply_updated(black_box(
                    Message::new("m-99-49").with_field("content", "edited"),
                ))
            },
            BatchSize::LargeInput,
        )
    });
}

fn bench_head_merge(c: &mut Criterion) {
    let polled = Page::new(
        (0..50).map(|i| Message::new(format!("m-0-{i}"))).collect(),
        Some(Cursor::from("c-0")),
    );
    c.bench_function("merge_head_page_overlap_5k", |b| {
        b.iter_batched(
            || (filled_cache(100, 50), polled.clone()),
            |(mut cache, page)| cache.merge_head_page(page),
            BatchSize::LargeInput,
        )
    });
}

criterion_group!(benches, bench_merge_created, bench_apply_updated_tail, bench_head_merge);
criterion_main!(benches);
