use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use stat_tables::archetype::{BEDWARS, SKYWARS};
use stat_tables::formula::{evaluate, format_number};
use stat_tables::parse::parse_stat_table;
use stat_tables::pipeline::assemble_table;
use stat_tables::table::Justify;

fn bench_bedwars_parse(c: &mut Criterion) {
    c.bench_function("bedwars_parse", |b| {
        b.iter(|| {
            let stats = parse_stat_table(black_box(ALPHA_HTML), &BEDWARS).unwrap();
            black_box(stats.len());
        })
    });
}

fn bench_skywars_parse(c: &mut Criterion) {
    c.bench_function("skywars_parse", |b| {
        b.iter(|| {
            let stats = parse_stat_table(black_box(ALPHA_HTML), &SKYWARS).unwrap();
            black_box(stats.len());
        })
    });
}

fn bench_formula_evaluate(c: &mut Criterion) {
    c.bench_function("formula_evaluate", |b| {
        b.iter(|| {
            let value = evaluate(black_box("(1200 + 300) / (1200 - 300) * -2.5")).unwrap();
            black_box(format_number(value));
        })
    });
}

fn bench_table_render(c: &mut Criterion) {
    let alpha = parse_stat_table(ALPHA_HTML, &BEDWARS).unwrap();
    let beta = parse_stat_table(BETA_HTML, &BEDWARS).unwrap();
    let players: Vec<(String, Option<_>)> = (0..8)
        .map(|idx| {
            let stats = if idx % 2 == 0 { &alpha } else { &beta };
            (format!("player{idx}"), Some(stats.clone()))
        })
        .collect();

    c.bench_function("table_render", |b| {
        b.iter(|| {
            let table = assemble_table(&BEDWARS, black_box(&players), Justify::Right)
                .sorted_players_by_row(1);
            black_box(table.to_string().len());
        })
    });
}

criterion_group!(
    perf,
    bench_bedwars_parse,
    bench_skywars_parse,
    bench_formula_evaluate,
    bench_table_render
);
criterion_main!(perf);

static ALPHA_HTML: &str = include_str!("../tests/fixtures/plancke_alpha.html");
static BETA_HTML: &str = include_str!("../tests/fixtures/plancke_beta.html");
