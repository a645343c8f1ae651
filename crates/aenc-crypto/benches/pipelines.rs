use std::io::{self, Cursor};

use aenc_crypto::{dual, single, CipherSuite, SessionKeys};

fn make_data(size: usize) -> Vec<u8> {
    (0..size)
        .map(|i| (i.wrapping_mul(7) ^ (i >> 3)) as u8)
        .collect()
}

fn single_keys() -> aenc_crypto::SingleKeys {
    match SessionKeys::generate(CipherSuite::Single) {
        SessionKeys::Single(keys) => keys,
        SessionKeys::Dual(_) => unreachable!("generated for the single suite"),
    }
}

fn dual_keys() -> aenc_crypto::DualKeys {
    match SessionKeys::generate(CipherSuite::Dual) {
        SessionKeys::Dual(keys) => keys,
        SessionKeys::Single(_) => unreachable!("generated for the dual suite"),
    }
}

#[divan::bench(args = [4096, 65536, 1048576])]
fn bench_single_encrypt(bencher: divan::Bencher, size: usize) {
    let keys = single_keys();
    let data = make_data(size);
    bencher
        .counter(divan::counter::BytesCount::new(size))
        .bench(|| {
            single::encrypt_body(
                divan::black_box(&data[..]),
                &mut io::sink(),
                divan::black_box(&keys),
                &mut |_| {},
            )
            .unwrap()
        });
}

#[divan::bench(args = [4096, 65536, 1048576])]
fn bench_single_decrypt(bencher: divan::Bencher, size: usize) {
    let keys = single_keys();
    let mut body = Vec::new();
    single::encrypt_body(&make_data(size)[..], &mut body, &keys, &mut |_| {}).unwrap();
    bencher
        .counter(divan::counter::BytesCount::new(size))
        .bench(|| {
            single::decrypt_body(
                &mut Cursor::new(divan::black_box(&body)),
                &mut io::sink(),
                divan::black_box(&keys),
                &mut |_| {},
            )
            .unwrap()
        });
}

#[divan::bench(args = [4096, 65536, 1048576])]
fn bench_dual_encrypt(bencher: divan::Bencher, size: usize) {
    let keys = dual_keys();
    let data = make_data(size);
    bencher
        .counter(divan::counter::BytesCount::new(size))
        .bench(|| {
            dual::encrypt_body(
                divan::black_box(&data[..]),
                &mut io::sink(),
                divan::black_box(&keys),
                &mut |_| {},
            )
            .unwrap()
        });
}

#[divan::bench(args = [4096, 65536, 1048576])]
fn bench_dual_decrypt(bencher: divan::Bencher, size: usize) {
    let keys = dual_keys();
    let mut body = Vec::new();
    dual::encrypt_body(&make_data(size)[..], &mut body, &keys, &mut |_| {}).unwrap();
    bencher
        .counter(divan::counter::BytesCount::new(size))
        .bench(|| {
            dual::decrypt_body(
                &mut Cursor::new(divan::black_box(&body)),
                &mut io::sink(),
                divan::black_box(&keys),
                &mut |_| {},
            )
            .unwrap()
        });
}

fn main() {
    divan::main();
}
