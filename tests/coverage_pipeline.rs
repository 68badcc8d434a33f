#![cfg(unix)]

use deeppass_tools::config::{Config, ToolPaths};
use deeppass_tools::coverage::{CoverageOptions, CoveragePipeline, Stage};
use deeppass_tools::PipelineError;
use rust_htslib::bam::{self, record::Cigar, record::CigarString, Read};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

// Freshly written scripts can fail to exec with ETXTBSY while another test
// thread is forking, so the tests in this file run one at a time.
static SERIAL: Mutex<()> = Mutex::new(());

const REVERSE: u16 = 0x10;

/// Emits unsorted, fractional coverage, the way a scaled run would.
const FAKE_GENOME_COV: &str = r#"#!/bin/sh
# -bg -split -ibam <bam> -g <sizes> -scale <ratio>
[ "$3" = "-ibam" ] || { echo "unexpected arguments: $*" >&2; exit 2; }
[ -f "$4" ] || { echo "missing bam $4" >&2; exit 1; }
[ -f "$6" ] || { echo "missing genome file $6" >&2; exit 1; }
printf 'chr2\t0\t5\t0.5\nchr1\t10\t20\t2.5\nchr1\t0\t10\t1.5\n'
"#;

/// Copies the sorted bedGraph to the track path so the test can inspect it.
const FAKE_BG_TO_BW: &str = r#"#!/bin/sh
[ -f "$2" ] || { echo "missing chrom sizes $2" >&2; exit 1; }
cp "$1" "$3"
"#;

const FAILING_TOOL: &str = "#!/bin/sh\necho 'Error: bad genome file' >&2\nexit 1\n";

fn write_script(dir: &Path, name: &str, body: &str) -> String {
    let path = dir.join(name);
    fs::write(&path, body).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path.to_string_lossy().into_owned()
}

fn write_bam(path: &Path, reads: &[(i32, i64, u16)]) {
    let mut header = bam::Header::new();
    for (name, len) in [("chr1", 1000), ("chr2", 500)] {
        let mut sq = bam::header::HeaderRecord::new(b"SQ");
        sq.push_tag(b"SN", &name.to_string());
        sq.push_tag(b"LN", &len.to_string());
        header.push_record(&sq);
    }

    let mut writer = bam::Writer::from_path(path, &header, bam::Format::Bam).unwrap();
    for (i, &(tid, pos, flags)) in reads.iter().enumerate() {
        let mut record = bam::Record::new();
        let qname = format!("read{}", i);
        let cigar = CigarString(vec![Cigar::Match(4)]);
        record.set(qname.as_bytes(), Some(&cigar), b"ACGT", &[30, 30, 30, 30]);
        record.set_tid(tid);
        record.set_pos(pos);
        record.set_mapq(60);
        record.set_flags(flags);
        writer.write(&record).unwrap();
    }
}

fn count_reads(path: &Path) -> (usize, usize) {
    let mut reader = bam::Reader::from_path(path).unwrap();
    let mut forward = 0;
    let mut reverse = 0;
    for record in reader.records() {
        if record.unwrap().is_reverse() {
            reverse += 1;
        } else {
            forward += 1;
        }
    }
    (forward, reverse)
}

struct Fixture {
    dir: tempfile::TempDir,
    bam: PathBuf,
    options: CoverageOptions,
}

fn fixture(coverage_tool: &str) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let bam = dir.path().join("sample.bam");
    write_bam(
        &bam,
        &[(0, 10, 0), (0, 12, REVERSE), (0, 40, 0), (1, 5, REVERSE)],
    );

    let tools_dir = dir.path().join("tools");
    fs::create_dir(&tools_dir).unwrap();
    let tools = ToolPaths {
        genome_coverage_bed: write_script(&tools_dir, "genomeCoverageBed", coverage_tool),
        bed_graph_to_big_wig: write_script(&tools_dir, "bedGraphToBigWig", FAKE_BG_TO_BW),
        sort: "sort".to_string(),
    };

    let mut options = CoverageOptions::from_config(&Config::default());
    options.tools = tools;
    options.threads = 1;
    options.timeout = Duration::from_secs(30);

    Fixture { dir, bam, options }
}

fn files_with_extension(dir: &Path, ext: &str) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| p.extension().is_some_and(|e| e == ext))
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

const EXPECTED_TRACK: &str = "chr1\t0\t10\t2\nchr1\t10\t20\t2\nchr2\t0\t5\t0\n";

#[test]
fn unstranded_run_yields_one_track_and_cleans_up() {
    let _guard = SERIAL.lock().unwrap_or_else(|e| e.into_inner());
    let fx = fixture(FAKE_GENOME_COV);

    let tracks = CoveragePipeline::new(&fx.bam, fx.options.clone()).run().unwrap();

    assert_eq!(tracks, vec![fx.dir.path().join("sample.bw")]);
    assert_eq!(fs::read_to_string(&tracks[0]).unwrap(), EXPECTED_TRACK);
    assert_eq!(files_with_extension(fx.dir.path(), "bw"), vec!["sample.bw"]);
    assert!(files_with_extension(fx.dir.path(), "bg").is_empty());
    assert!(!fx.dir.path().join("sample.chromesize").exists());
    assert!(fx.dir.path().join("sample.bam.bai").exists());
}

#[test]
fn stranded_run_yields_plus_and_minus_tracks() {
    let _guard = SERIAL.lock().unwrap_or_else(|e| e.into_inner());
    let mut fx = fixture(FAKE_GENOME_COV);
    fx.options.stranded = true;

    let tracks = CoveragePipeline::new(&fx.bam, fx.options.clone()).run().unwrap();

    assert_eq!(
        tracks,
        vec![
            fx.dir.path().join("sample.PLUS.bw"),
            fx.dir.path().join("sample.MINUS.bw"),
        ]
    );
    assert_eq!(
        files_with_extension(fx.dir.path(), "bw"),
        vec!["sample.MINUS.bw", "sample.PLUS.bw"]
    );
    assert_eq!(files_with_extension(fx.dir.path(), "bam"), vec!["sample.bam"]);
    assert!(files_with_extension(fx.dir.path(), "bg").is_empty());
}

#[test]
fn keep_temp_retains_intermediates() {
    let _guard = SERIAL.lock().unwrap_or_else(|e| e.into_inner());
    let mut fx = fixture(FAKE_GENOME_COV);
    fx.options.stranded = true;
    fx.options.keep_temp = true;

    CoveragePipeline::new(&fx.bam, fx.options.clone()).run().unwrap();

    let dir = fx.dir.path();
    assert_eq!(
        fs::read_to_string(dir.join("sample.chromesize")).unwrap(),
        "chr1\t1000\nchr2\t500\n"
    );
    assert_eq!(count_reads(&dir.join("sample.PLUS.bam")), (2, 0));
    assert_eq!(count_reads(&dir.join("sample.MINUS.bam")), (0, 2));
    assert_eq!(
        fs::read_to_string(dir.join("sample.PLUS.bg")).unwrap(),
        "chr2\t0\t5\t0\nchr1\t10\t20\t2\nchr1\t0\t10\t2\n"
    );
    assert_eq!(
        fs::read_to_string(dir.join("sample.MINUS_sorted.bg")).unwrap(),
        EXPECTED_TRACK
    );
}

#[test]
fn failing_sort_aborts_at_the_sort_stage() {
    let _guard = SERIAL.lock().unwrap_or_else(|e| e.into_inner());
    let mut fx = fixture(FAKE_GENOME_COV);
    fx.options.tools.sort = write_script(&fx.dir.path().join("tools"), "sort", FAILING_TOOL);

    let err = CoveragePipeline::new(&fx.bam, fx.options.clone())
        .run()
        .unwrap_err();

    match err {
        PipelineError::ExternalToolFailure { stage, path, .. } => {
            assert_eq!(stage, Stage::Sort);
            assert_eq!(path, fx.dir.path().join("sample.bg"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!fx.dir.path().join("sample.bw").exists());
}

#[test]
fn existing_index_is_reused() {
    let _guard = SERIAL.lock().unwrap_or_else(|e| e.into_inner());
    let fx = fixture(FAKE_GENOME_COV);
    bam::index::build(&fx.bam, None, bam::index::Type::Bai, 1).unwrap();
    let index = fx.dir.path().join("sample.bam.bai");
    let before = fs::metadata(&index).unwrap().modified().unwrap();

    CoveragePipeline::new(&fx.bam, fx.options.clone()).run().unwrap();

    assert_eq!(fs::metadata(&index).unwrap().modified().unwrap(), before);
}

#[test]
fn failing_coverage_tool_aborts_with_context() {
    let _guard = SERIAL.lock().unwrap_or_else(|e| e.into_inner());
    let fx = fixture(FAILING_TOOL);

    let err = CoveragePipeline::new(&fx.bam, fx.options.clone())
        .run()
        .unwrap_err();

    match err {
        PipelineError::ExternalToolFailure {
            stage, path, stderr, ..
        } => {
            assert_eq!(stage, Stage::Coverage);
            assert_eq!(path, fx.bam);
            assert!(stderr.contains("bad genome file"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!fx.dir.path().join("sample.bw").exists());
    // Left behind for diagnosis.
    assert!(fx.dir.path().join("sample.chromesize").exists());
}

#[test]
fn hanging_tool_times_out() {
    let _guard = SERIAL.lock().unwrap_or_else(|e| e.into_inner());
    let mut fx = fixture("#!/bin/sh\nexec sleep 10\n");
    fx.options.timeout = Duration::from_millis(300);

    let err = CoveragePipeline::new(&fx.bam, fx.options.clone())
        .run()
        .unwrap_err();
    assert!(matches!(
        err,
        PipelineError::ExternalToolTimeout {
            stage: Stage::Coverage,
            ..
        }
    ));
}

#[test]
fn missing_bam_is_a_filesystem_error() {
    let _guard = SERIAL.lock().unwrap_or_else(|e| e.into_inner());
    let fx = fixture(FAKE_GENOME_COV);
    let err = CoveragePipeline::new(fx.dir.path().join("absent.bam"), fx.options.clone())
        .run()
        .unwrap_err();
    assert!(matches!(err, PipelineError::FileSystem { .. }));
}
