//! Compile-time benchmarks for UnrealScript classes.
//!
//! ## Profiling with Puffin
//!
//! Run with the `profile-with-puffin` feature to see where the two passes
//! spend their time:
//!
//! ```bash
//! cargo bench --features profile-with-puffin -- --profile-time 5
//! ```

use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use std::fmt::Write;
use std::hint::black_box;
use uscript::compiler::lexer::{Lexer, TokenKind};
use uscript::prelude::*;

#[cfg(feature = "profile-with-puffin")]
use std::collections::HashMap;

#[cfg(feature = "profile-with-puffin")]
static FRAME_VIEW: std::sync::OnceLock<puffin::GlobalFrameView> = std::sync::OnceLock::new();

#[cfg(feature = "profile-with-puffin")]
fn setup_profiler() {
    puffin::set_scopes_on(true);
    FRAME_VIEW.get_or_init(puffin::GlobalFrameView::default);
}

#[cfg(not(feature = "profile-with-puffin"))]
fn setup_profiler() {}

#[cfg(feature = "profile-with-puffin")]
fn end_profiling_frame() {
    puffin::GlobalProfiler::lock().new_frame();
}

#[cfg(not(feature = "profile-with-puffin"))]
fn end_profiling_frame() {}

/// Sums top-level scope durations per name over the recorded frames.
#[cfg(feature = "profile-with-puffin")]
fn print_profiling_stats() {
    use puffin::Reader;

    let Some(frame_view) = FRAME_VIEW.get() else {
        return;
    };
    let view = frame_view.lock();
    let scope_collection = view.scope_collection();

    let mut timings: HashMap<String, i64> = HashMap::new();
    let mut frames = 0i64;
    for frame in view.recent_frames() {
        frames += 1;
        let Ok(unpacked) = frame.unpacked() else {
            continue;
        };
        for stream_info in unpacked.thread_streams.values() {
            let Ok(scopes) = Reader::from_start(&stream_info.stream).read_top_scopes() else {
                continue;
            };
            for scope in scopes {
                if let Some(details) = scope_collection.fetch_by_id(&scope.id) {
                    *timings.entry(details.name().to_string()).or_insert(0) += scope.record.duration_ns;
                }
            }
        }
    }

    println!("\n=== Profiling Summary ({frames} frames) ===");
    let mut entries: Vec<_> = timings.into_iter().collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1));
    for (name, ns) in entries {
        let avg = ns / frames.max(1);
        println!("  {:30} {:>10.2?}", name, std::time::Duration::from_nanos(avg as u64));
    }
}

#[cfg(not(feature = "profile-with-puffin"))]
fn print_profiling_stats() {}

const OBJECT_SOURCE: &str = include_str!("../tests/scripts/Object.uc");

/// A class with `functions` functions, each doing a little arithmetic and
/// control flow.
fn generated_class(name: &str, functions: usize) -> String {
    let mut source = format!("class {name} extends Object;\n\nvar int Total;\nvar float Scale;\n\n");
    for i in 0..functions {
        let _ = write!(
            source,
            r#"function int Step{i}(int A, optional int B)
{{
	local int I;

	for (I = 0; I < A; I++)
	{{
		if (I == B)
			continue;
		Total += I * 2 + {i};
	}}
	switch (A)
	{{
	case 0:
		return 1;
	default:
		break;
	}}
	return Total + A;
}}

"#
        );
    }
    source
}

fn compile(sources: &[(String, String)]) -> bool {
    let mut db = Database::new();
    let mut classes = vec![db.add_class("Object", OBJECT_SOURCE)];
    for (name, source) in sources {
        classes.push(db.add_class(name, source));
    }
    let mut session = Session::new(CompilerOptions::default());
    let ok = session.make(&mut db, &classes);
    end_profiling_frame();
    ok
}

fn lexer_benchmarks(c: &mut Criterion) {
    let source = generated_class("Bench", 200);
    let mut group = c.benchmark_group("lexer");
    group.throughput(Throughput::Bytes(source.len() as u64));
    group.bench_function("tokenize_200_functions", |b| {
        b.iter(|| {
            let mut lexer = Lexer::new(black_box(&source), 1);
            let mut count = 0usize;
            while let Ok(token) = lexer.get_raw_token(false) {
                if token.kind == TokenKind::End {
                    break;
                }
                count += 1;
            }
            black_box(count)
        });
    });
    group.finish();
}

fn size_based_benchmarks(c: &mut Criterion) {
    setup_profiler();

    let mut group = c.benchmark_group("compile/class_sizes");
    for functions in [1, 20, 200] {
        let source = generated_class("Bench", functions);
        let sources = vec![("Bench".to_string(), source)];
        group.throughput(Throughput::Bytes(sources[0].1.len() as u64));
        group.bench_function(format!("{functions}_functions"), |b| {
            b.iter(|| black_box(compile(black_box(&sources))));
        });
    }
    group.finish();

    print_profiling_stats();
}

fn hierarchy_benchmarks(c: &mut Criterion) {
    let mut sources = vec![("Level0".to_string(), generated_class("Level0", 10))];
    for depth in 1..10 {
        let name = format!("Level{depth}");
        let source = generated_class(&name, 10).replacen(
            "extends Object",
            &format!("extends Level{}", depth - 1),
            1,
        );
        sources.push((name, source));
    }
    // Subclasses redeclare Total and Scale; only the timings matter here.
    let mut group = c.benchmark_group("compile/hierarchy");
    group.bench_function("depth_10", |b| {
        b.iter(|| black_box(compile(black_box(&sources))));
    });
    group.finish();
}

criterion_group!(benches, lexer_benchmarks, size_based_benchmarks, hierarchy_benchmarks);
criterion_main!(benches);
