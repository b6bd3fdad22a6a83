use criterion::{Criterion, black_box, criterion_group, criterion_main};
use mirror_fs::checksum::{compute_file_digest, DigestAlgorithm};
use mirror_fs::{NormalizedPath, io};
use tempfile::tempdir;

fn write_atomic_benchmark(c: &mut Criterion) {
    c.bench_function("io::write_atomic", |b| {
        let dir = tempdir().unwrap();
        let path = NormalizedPath::new(dir.path().join("test_file.txt"));
        let content = "hello world".as_bytes();

        b.iter(|| {
            io::write_atomic(black_box(&path), black_box(content)).unwrap();
        })
    });
}

fn file_digest_benchmark(c: &mut Criterion) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("payload.bin");
    std::fs::write(&path, vec![42u8; 1024 * 1024]).unwrap();

    for algorithm in [DigestAlgorithm::Md5, DigestAlgorithm::Sha256] {
        c.bench_function(&format!("checksum::compute_file_digest ({algorithm}, 1 MiB)"), |b| {
            b.iter(|| compute_file_digest(black_box(&path), algorithm).unwrap())
        });
    }
}

criterion_group!(benches, write_atomic_benchmark, file_digest_benchmark);
criterion_main!(benches);
