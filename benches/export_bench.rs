use criterion::{criterion_group, criterion_main, Criterion};
use markpic::rendering::paint::build_display_list;
use markpic::rendering::raster::compose_svg;
use markpic::{resolve, Mode, PreviewElement, StyleConfig};

const CARD: &str = r#"# Release notes

Hello **world**, this card mixes *inline styles*, `code` and lists.

- [x] layout
- [ ] raster

| crate | role |
|-------|------|
| resvg | raster |

```rust
fn main() {
    println!("hi");
}
```
"#;

fn bench_resolve(c: &mut Criterion) {
    let config = StyleConfig::default();
    c.bench_function("resolve_style", |b| b.iter(|| resolve(&config, Mode::Dark)));
}

fn bench_preview(c: &mut Criterion) {
    let config = StyleConfig::default();
    c.bench_function("preview_from_markdown", |b| {
        b.iter(|| PreviewElement::from_markdown(CARD, &config, Mode::Light).unwrap())
    });
}

fn bench_display_list(c: &mut Criterion) {
    let preview = PreviewElement::from_markdown(CARD, &StyleConfig::default(), Mode::Light).unwrap();
    c.bench_function("display_list_and_compose", |b| {
        b.iter(|| {
            let list = build_display_list(&preview.tree, preview.width as f32, "#111827");
            compose_svg(&list, preview.width, preview.height)
        })
    });
}

fn bench_rasterize(c: &mut Criterion) {
    let preview = PreviewElement::from_markdown(CARD, &StyleConfig::default(), Mode::Light).unwrap();
    let mut group = c.benchmark_group("rasterize");
    group.sample_size(10);
    group.bench_function("card_2x", |b| {
        b.iter(|| markpic::rendering::render_tree(&preview.tree, preview.width, preview.height, 2.0, "#111827").unwrap())
    });
    group.finish();
}

criterion_group!(benches, bench_resolve, bench_preview, bench_display_list, bench_rasterize);
criterion_main!(benches);
