use criterion::Criterion;
use criterion::black_box;
use criterion::criterion_group;
use criterion::criterion_main;
use richmark_core::convert::to_portable_markup;
use richmark_core::decoration::decorate;
use richmark_core::font::FontCache;
use richmark_core::layout::layout;
use richmark_markdown::{StyleConfig, parse, render};
use std::sync::Arc;

fn sample_markdown(code_lines: usize) -> String {
    let mut s = String::new();
    s.push_str("# Performance\n\n");
    s.push_str("This is a long paragraph to stress wrapping. ");
    for _ in 0..12 {
        s.push_str("The quick brown fox jumps over the *lazy* dog. ");
    }
    s.push_str("\n\n");

    s.push_str("## Lists\n\n");
    for i in 0..20 {
        s.push_str(&format!("{}. item with `code` and a [link](https://example.com/{i})\n", i + 1));
    }
    s.push('\n');

    s.push_str("> A quote with **strong** text\n> spanning two lines.\n\n");

    s.push_str("## Code\n\n");
    s.push_str("```rs\n");
    s.push_str("fn main() {\n");
    for i in 0..code_lines {
        s.push_str(&format!("    let x{i} = {i} + 1;\n"));
    }
    s.push_str("    println!(\"done\");\n");
    s.push_str("}\n");
    s.push_str("```\n");
    s
}

fn bench_parse_render(c: &mut Criterion) {
    let md = sample_markdown(200);
    let config = StyleConfig::default();
    c.bench_function("pipeline/parse+render", |b| {
        b.iter(|| {
            let buffer = render(&parse(black_box(&md)), &config);
            black_box(buffer.len());
        })
    });
}

fn bench_layout_decorate(c: &mut Criterion) {
    let md = sample_markdown(200);
    let config = Arc::new(StyleConfig::default());
    let buffer = render(&parse(&md), &config);
    let fonts = FontCache::default();
    fonts.configure(&config);
    let options = config.decoration_options();
    c.bench_function("pipeline/layout+decorate/warm_cache", |b| {
        b.iter(|| {
            let geometry = layout(&buffer, &fonts, black_box(Some(640.0)));
            let decorations = decorate(&buffer, &geometry, &options);
            black_box(decorations.regions.len());
        })
    });
}

fn bench_portable_markup(c: &mut Criterion) {
    let md = sample_markdown(200);
    let buffer = render(&parse(&md), &StyleConfig::default());
    c.bench_function("pipeline/to_portable_markup", |b| {
        b.iter(|| {
            let html = to_portable_markup(black_box(&buffer));
            black_box(html.len());
        })
    });
}

criterion_group!(
    benches,
    bench_parse_render,
    bench_layout_decorate,
    bench_portable_markup
);
criterion_main!(benches);
