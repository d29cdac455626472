//! Performance benchmarks for formscan
//!
//! Run with: `cargo bench`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use formscan::config::PreprocessConfig;
use formscan::ocr::preprocess;
use formscan::{FieldExtractor, FormTemplate};
use image::{DynamicImage, GrayImage, Luma};

const FORM_TEXT: &str = "APPLICATION FORM
First Name: Sakshi
Middle Name: Ravi
Last Name: Kale
Date of Birth: 14/02/2001
Age: 24
Gender: Female
Passport No: K1234567
Email ID: sakshi.kale@example.com
Mobile No: 9876543210

Permanent Address: 44 Lake View Road
Nashik 422001

Current Address: Flat 7, Baner
Pune

Education
1 Pune University BSc 78 2019
2 Mumbai University MSc 81 2021

Certification: AWS Cloud Practitioner
Organizer: Amazon
Duration: 3 months

Relation: Father
Occupation: Teacher
Location: Nashik
";

/// Benchmark rule evaluation over recognized text
fn bench_field_extraction(c: &mut Criterion) {
    let mut group = c.benchmark_group("field_extraction");

    for template in FormTemplate::ALL {
        let extractor = FieldExtractor::for_template(template).unwrap();
        group.throughput(Throughput::Bytes(FORM_TEXT.len() as u64));
        group.bench_with_input(
            BenchmarkId::new("template", template.as_str()),
            &extractor,
            |b, extractor| {
                b.iter(|| extractor.extract(black_box(FORM_TEXT)));
            },
        );
    }

    // Ten concatenated forms
    let long_text = FORM_TEXT.repeat(10);
    let extractor = FieldExtractor::for_template(FormTemplate::ApplicationForm).unwrap();
    group.throughput(Throughput::Bytes(long_text.len() as u64));
    group.bench_function("application_form_x10", |b| {
        b.iter(|| extractor.extract(black_box(&long_text)));
    });

    group.finish();
}

/// Synthetic page with dark text-like bars on a light background
fn synthetic_page(width: u32, height: u32) -> DynamicImage {
    let page = GrayImage::from_fn(width, height, |x, y| {
        if (y / 12) % 3 == 0 && (x / 7) % 5 != 0 {
            Luma([40])
        } else {
            Luma([225])
        }
    });
    DynamicImage::ImageLuma8(page)
}

/// Benchmark binarization and upscaling of rendered pages
fn bench_preprocessing(c: &mut Criterion) {
    let mut group = c.benchmark_group("preprocessing");
    group.sample_size(20);

    let config = PreprocessConfig::default();
    for (name, width, height) in [("a6_150dpi", 620, 874), ("a4_150dpi", 1240, 1754)] {
        let page = synthetic_page(width, height);
        group.throughput(Throughput::Elements(u64::from(width) * u64::from(height)));
        group.bench_with_input(BenchmarkId::new("page", name), &page, |b, page| {
            b.iter(|| preprocess(black_box(page), &config));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_field_extraction, bench_preprocessing);
criterion_main!(benches);
