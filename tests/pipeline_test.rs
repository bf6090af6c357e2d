// Copyright (c) 2026 triagrs Contributors
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use triagrs::analysis::fetcher::SandboxedFetcher;
use triagrs::analysis::pipeline::AnalysisPipeline;
use triagrs::analysis::signatures::SignatureSet;
use triagrs::config::settings::{AnalysisSettings, FetchSettings};
use triagrs::domain::models::job::{EndpointKind, Job, JobStatus};
use triagrs::domain::models::report::{AnalysisReport, SuspicionLevel};
use triagrs::domain::repositories::job_repository::JobRepository;
use triagrs::infrastructure::repositories::memory_job_repo::MemoryJobRepository;
use triagrs::queue::job_queue::{JobQueue, StoreJobQueue};
use triagrs::workers::triage_worker::TriageWorker;

fn pipeline(job_root: &Path, max_depth: u32) -> AnalysisPipeline {
    let fetcher = SandboxedFetcher::new(&FetchSettings {
        timeout_secs: 5,
        max_body_bytes: 64 * 1024 * 1024,
    })
    .unwrap();

    let signatures = Arc::new(SignatureSet::compile_dir(Path::new("/nonexistent/rules")));
    let settings = AnalysisSettings {
        job_root: job_root.display().to_string(),
        max_archive_depth: max_depth,
    };

    AnalysisPipeline::new(fetcher, signatures, None, None, &settings)
}

async fn serve(server: &MockServer, route: &str, body: Vec<u8>) {
    Mock::given(method("GET"))
        .and(path(route.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
        .mount(server)
        .await;
}

async fn analyze(server: &MockServer, route: &str, max_depth: u32) -> AnalysisReport {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = pipeline(dir.path(), max_depth);
    pipeline
        .analyze(uuid::Uuid::new_v4(), &format!("{}{route}", server.uri()))
        .await
}

/// Deterministic high-entropy filler, close to 8 bits per byte
fn random_bytes(count: usize) -> Vec<u8> {
    let mut state: u64 = 0x0123_4567_89ab_cdef;
    (0..count)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            state as u8
        })
        .collect()
}

fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer = zip::ZipWriter::new(&mut cursor);
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Stored);
        for (name, data) in entries {
            writer.start_file(*name, options).unwrap();
            writer.write_all(data).unwrap();
        }
        writer.finish().unwrap();
    }
    cursor.into_inner()
}

/// Build a minimal but well-formed PE32+ image: one packed-looking code
/// section and an import table pulling CreateRemoteThread from kernel32.
fn pe32plus_with_suspicious_import() -> Vec<u8> {
    let mut image = Vec::new();
    let push16 = |image: &mut Vec<u8>, v: u16| image.extend_from_slice(&v.to_le_bytes());
    let push32 = |image: &mut Vec<u8>, v: u32| image.extend_from_slice(&v.to_le_bytes());
    let push64 = |image: &mut Vec<u8>, v: u64| image.extend_from_slice(&v.to_le_bytes());

    // DOS header: magic and e_lfanew, the rest zero
    image.extend_from_slice(b"MZ");
    image.resize(0x3c, 0);
    push32(&mut image, 0x40);

    // PE signature + COFF header
    image.extend_from_slice(b"PE\0\0");
    push16(&mut image, 0x8664); // machine: x86-64
    push16(&mut image, 2); // sections
    push32(&mut image, 0); // timestamp
    push32(&mut image, 0); // symbol table
    push32(&mut image, 0); // symbol count
    push16(&mut image, 240); // optional header size
    push16(&mut image, 0x0022); // executable image

    // Optional header, PE32+ magic
    push16(&mut image, 0x020b);
    image.extend_from_slice(&[14, 0]); // linker version
    push32(&mut image, 0x4000); // size of code
    push32(&mut image, 0x200); // size of initialized data
    push32(&mut image, 0); // size of uninitialized data
    push32(&mut image, 0x1000); // entry point
    push32(&mut image, 0x1000); // base of code
    push64(&mut image, 0x1_4000_0000); // image base
    push32(&mut image, 0x1000); // section alignment
    push32(&mut image, 0x200); // file alignment
    push16(&mut image, 6); // os version
    push16(&mut image, 0);
    push16(&mut image, 0); // image version
    push16(&mut image, 0);
    push16(&mut image, 6); // subsystem version
    push16(&mut image, 0);
    push32(&mut image, 0); // win32 version
    push32(&mut image, 0x6000); // size of image
    push32(&mut image, 0x200); // size of headers
    push32(&mut image, 0); // checksum
    push16(&mut image, 3); // subsystem: console
    push16(&mut image, 0); // dll characteristics
    push64(&mut image, 0x100000); // stack reserve
    push64(&mut image, 0x1000); // stack commit
    push64(&mut image, 0x100000); // heap reserve
    push64(&mut image, 0x1000); // heap commit
    push32(&mut image, 0); // loader flags
    push32(&mut image, 16); // data directory count
    for index in 0..16u32 {
        if index == 1 {
            // Import table directory
            push32(&mut image, 0x5000);
            push32(&mut image, 0x100);
        } else {
            push32(&mut image, 0);
            push32(&mut image, 0);
        }
    }

    // Section headers
    let mut section = |name: &[u8], vsize: u32, va: u32, rsize: u32, rptr: u32, chars: u32| {
        let mut header = [0u8; 8];
        header[..name.len()].copy_from_slice(name);
        image.extend_from_slice(&header);
        push32(&mut image, vsize);
        push32(&mut image, va);
        push32(&mut image, rsize);
        push32(&mut image, rptr);
        push32(&mut image, 0); // relocations pointer
        push32(&mut image, 0); // line numbers pointer
        push16(&mut image, 0); // relocation count
        push16(&mut image, 0); // line number count
        push32(&mut image, chars);
    };
    section(b".text", 0x4000, 0x1000, 0x4000, 0x200, 0x6000_0020);
    section(b".idata", 0x200, 0x5000, 0x200, 0x4200, 0xc000_0040);

    // Pad headers to the file alignment, then the packed-looking code
    image.resize(0x200, 0);
    image.extend_from_slice(&random_bytes(0x4000));

    // Import section, laid out at RVA 0x5000 / file offset 0x4200
    let mut idata = Vec::new();
    // Import directory: one entry plus the null terminator
    idata.extend_from_slice(&0x5028u32.to_le_bytes()); // original first thunk
    idata.extend_from_slice(&0u32.to_le_bytes());
    idata.extend_from_slice(&0u32.to_le_bytes());
    idata.extend_from_slice(&0x5040u32.to_le_bytes()); // dll name rva
    idata.extend_from_slice(&0x5050u32.to_le_bytes()); // first thunk
    idata.extend_from_slice(&[0u8; 20]);
    // Import lookup table at 0x5028
    idata.extend_from_slice(&0x5060u64.to_le_bytes());
    idata.extend_from_slice(&0u64.to_le_bytes());
    // Dll name at 0x5040
    idata.resize(0x40, 0);
    idata.extend_from_slice(b"KERNEL32.dll\0");
    // Import address table at 0x5050
    idata.resize(0x50, 0);
    idata.extend_from_slice(&0x5060u64.to_le_bytes());
    idata.extend_from_slice(&0u64.to_le_bytes());
    // Hint/name entry at 0x5060
    idata.extend_from_slice(&0u16.to_le_bytes());
    idata.extend_from_slice(b"CreateRemoteThread\0");
    idata.resize(0x200, 0);
    image.extend_from_slice(&idata);

    image
}

#[tokio::test]
async fn test_plain_text_artifact_scores_nothing() {
    let server = MockServer::start().await;
    serve(&server, "/note.txt", b"just a harmless note\n".to_vec()).await;

    let report = analyze(&server, "/note.txt", 3).await;

    assert!(report.download_success);
    assert!(report.error.is_none());
    assert_eq!(report.file_type.as_deref(), Some("ascii text"));
    assert!(report.sha256.is_some());
    assert!(report.file_entropy.unwrap() < 7.5);
    assert_eq!(
        report.signature_matches,
        Some(vec!["no yara rules loaded".to_string()])
    );
    assert_eq!(report.antivirus_scan.as_deref(), Some("clamav not available"));
    assert!(report.details.is_empty());
    assert_eq!(report.suspicion_score, 0);
    assert_eq!(report.suspicion_level, SuspicionLevel::Unknown);
}

#[tokio::test]
async fn test_zip_with_packed_pe_scores_medium() {
    let server = MockServer::start().await;
    let payload = pe32plus_with_suspicious_import();
    serve(
        &server,
        "/dropper.zip",
        zip_bytes(&[("payload.exe", &payload)]),
    )
    .await;

    let report = analyze(&server, "/dropper.zip", 3).await;

    assert!(report.download_success);
    assert!(report.error.is_none());
    assert_eq!(report.file_type.as_deref(), Some("zip archive data"));

    // Root zip plus the extracted executable
    assert_eq!(report.details.len(), 2);
    assert!(report
        .details
        .iter()
        .any(|d| d.file_type.contains("pe32+")));

    let pe = report.pe_analysis.as_ref().expect("pe summary");
    assert!(pe
        .suspicious_imports
        .iter()
        .any(|i| i == "CreateRemoteThread"));
    assert!(pe.high_entropy_sections.iter().any(|s| s == ".text"));

    // Stored high-entropy payload dominates the archive bytes
    assert!(report.file_entropy.unwrap() >= 7.5);

    // entropy (5) + suspicious import (5) + import name as a string (2)
    assert!(report.suspicion_score >= 10);
    assert!(report.suspicion_level >= SuspicionLevel::Medium);
}

#[tokio::test]
async fn test_failed_download_still_produces_a_report() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let report = analyze(&server, "/gone", 3).await;

    assert!(!report.download_success);
    assert!(report.error.as_ref().unwrap().contains("404"));
    assert!(report.sha256.is_none());
    assert!(report.file_type.is_none());
    assert_eq!(report.suspicion_score, 0);
    assert_eq!(report.suspicion_level, SuspicionLevel::Unknown);
}

#[tokio::test]
async fn test_corrupt_archive_degrades_to_a_warning() {
    let server = MockServer::start().await;
    let mut body = b"PK\x03\x04".to_vec();
    body.extend_from_slice(b"this is not a valid archive body at all");
    serve(&server, "/broken.zip", body).await;

    let report = analyze(&server, "/broken.zip", 3).await;

    assert!(report.download_success);
    assert!(report.error.is_none());
    assert_eq!(report.file_type.as_deref(), Some("zip archive data"));
    assert!(report.sha256.is_some());
    assert!(report.file_entropy.is_some());
    assert!(report
        .warnings
        .iter()
        .any(|w| w.contains("extraction failed")));
}

#[tokio::test]
async fn test_expansion_stops_at_max_depth() {
    let server = MockServer::start().await;
    let inner = zip_bytes(&[("secret.txt", b"buried text")]);
    let outer = zip_bytes(&[("inner.zip", &inner)]);
    serve(&server, "/nested.zip", outer).await;

    let report = analyze(&server, "/nested.zip", 1).await;

    assert!(report
        .warnings
        .iter()
        .any(|w| w.contains("max archive depth exceeded")));
    // The innermost file was never analyzed
    assert!(!report.details.iter().any(|d| d.file.contains("secret.txt")));
    // But both archives were
    assert_eq!(report.details.len(), 2);
}

#[tokio::test]
async fn test_sibling_archives_expand_in_isolation() {
    let server = MockServer::start().await;
    let inner_a = zip_bytes(&[("a.txt", b"alpha payload")]);
    let inner_b = zip_bytes(&[("b.txt", b"beta payload")]);
    let outer = zip_bytes(&[("a.zip", &inner_a), ("b.zip", &inner_b)]);
    serve(&server, "/twins.zip", outer).await;

    let report = analyze(&server, "/twins.zip", 3).await;

    assert!(report.error.is_none());
    // Outer zip, both inner zips, and one text file out of each
    assert_eq!(report.details.len(), 5);

    let mut files: Vec<&str> = report.details.iter().map(|d| d.file.as_str()).collect();
    let total = files.len();
    files.sort();
    files.dedup();
    assert_eq!(files.len(), total, "a file was analyzed more than once");

    assert_eq!(
        report
            .details
            .iter()
            .filter(|d| d.file.ends_with("a.txt"))
            .count(),
        1
    );
    assert_eq!(
        report
            .details
            .iter()
            .filter(|d| d.file.ends_with("b.txt"))
            .count(),
        1
    );
}

#[tokio::test]
async fn test_oversized_archive_entry_is_skipped_with_warning() {
    let server = MockServer::start().await;

    // One entry past the per-entry extraction cap; zeros deflate to a
    // body small enough to serve
    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer = zip::ZipWriter::new(&mut cursor);
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated);
        writer.start_file("huge.bin", options).unwrap();
        let chunk = vec![0u8; 1024 * 1024];
        for _ in 0..101 {
            writer.write_all(&chunk).unwrap();
        }
        writer.start_file("small.txt", options).unwrap();
        writer.write_all(b"still analyzed").unwrap();
        writer.finish().unwrap();
    }
    serve(&server, "/bloated.zip", cursor.into_inner()).await;

    let report = analyze(&server, "/bloated.zip", 3).await;

    assert!(report.download_success);
    assert!(report.error.is_none());
    assert!(report.warnings.iter().any(|w| w.contains("size cap")));
    // The oversized entry never reaches the stage set; its sibling does
    assert!(!report.details.iter().any(|d| d.file.contains("huge.bin")));
    assert!(report.details.iter().any(|d| d.file.contains("small.txt")));
}

#[tokio::test]
async fn test_worker_processes_submitted_job() {
    let server = MockServer::start().await;
    serve(&server, "/note.txt", b"worker loop test artifact\n".to_vec()).await;

    let dir = tempfile::tempdir().unwrap();
    let pipeline = Arc::new(pipeline(dir.path(), 3));
    let repository = Arc::new(MemoryJobRepository::new());
    let queue = Arc::new(StoreJobQueue::new(repository.clone()));

    let worker = TriageWorker::new(pipeline, Duration::from_millis(20));
    let worker_queue = queue.clone();
    let handle = tokio::spawn(async move {
        worker.run(worker_queue).await;
    });

    let job = queue
        .enqueue(Job::new(
            EndpointKind::Analyze,
            format!("{}/note.txt", server.uri()),
        ))
        .await
        .unwrap();

    let mut processed = None;
    for _ in 0..100 {
        let current = repository.find_by_id(job.id).await.unwrap().unwrap();
        if current.status == JobStatus::Processed {
            processed = Some(current);
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    handle.abort();

    let job = processed.expect("job was not processed in time");
    assert!(job.processed_at.is_some());
    let result = job.result.expect("processed job carries a result");
    assert_eq!(result["file_type"], "ascii text");
    assert_eq!(result["download_success"], true);
}

#[tokio::test]
async fn test_peripheral_jobs_commit_error_payloads() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = Arc::new(pipeline(dir.path(), 3));
    let repository = Arc::new(MemoryJobRepository::new());
    let queue = Arc::new(StoreJobQueue::new(repository.clone()));

    let worker = TriageWorker::new(pipeline, Duration::from_millis(20));
    let worker_queue = queue.clone();
    let handle = tokio::spawn(async move {
        worker.run(worker_queue).await;
    });

    let job = queue
        .enqueue(Job::new(
            EndpointKind::Ztest,
            "http://irrelevant.invalid/x".to_string(),
        ))
        .await
        .unwrap();

    let mut processed = None;
    for _ in 0..100 {
        let current = repository.find_by_id(job.id).await.unwrap().unwrap();
        if current.status == JobStatus::Processed {
            processed = Some(current);
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    handle.abort();

    let job = processed.expect("job was not processed in time");
    let result = job.result.unwrap();
    assert!(result["error"]
        .as_str()
        .unwrap()
        .contains("not handled by this service"));
}
