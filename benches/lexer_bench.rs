use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use ganges::lexer::{Lexer, tokenize};

// One chunk of representative source; the benchmark repeats it
const PROGRAM_CHUNK: &str = r#"
rama fib = kriya(n) {
  yadi (n < 2) { daan n; }
  fib(n - 1) + fib(n - 2)
};

rama factorial = kriya(n) {
  yadi (n == 0) { 1 } anyatha { n * factorial(n - 1) }
};

rama total = 0;
rama i = 0;
chakra (i <= 100) { total = total + i; i = i + 1; }

rama people = [{"name": "Arjun", "age": 28}, {"name": "Meera", "age": 31}];
rama seen = set(1, "two", satya);
add(seen, 4); remove(seen, "two");
print(dairghya(people), pratham(people)["name"], antha(push([1, 2], 3)));
yadi (has(seen, 4) != asatya) { print("string with spaces and symbols <= >= != =="); }
"#;

fn bench_tokenizers(c: &mut Criterion) {
    let mut group = c.benchmark_group("Tokenizer");

    for repetitions in [1usize, 16, 128] {
        let input = PROGRAM_CHUNK.repeat(repetitions);

        // Collects every token, including the trailing Eof
        group.bench_with_input(
            BenchmarkId::new("tokenize", repetitions),
            &input,
            |b, input| b.iter(|| tokenize(black_box(input))),
        );

        // Pull-based, without building a token vector
        group.bench_with_input(
            BenchmarkId::new("lexer_iter", repetitions),
            &input,
            |b, input| b.iter(|| Lexer::new(black_box(input)).count()),
        );
    }

    group.finish();
}

criterion_group!(benches, bench_tokenizers);
criterion_main!(benches);
