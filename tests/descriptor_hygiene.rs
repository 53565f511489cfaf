#![cfg(target_os = "linux")]

use std::fs::File;
use std::os::fd::AsFd;

use rawsh::parser::split_pipeline;
use rawsh::pipeline::{run_pipeline_with_io, PipelineIo};

fn open_descriptors() -> usize {
    std::fs::read_dir("/proc/self/fd").unwrap().count()
}

#[test]
fn completed_pipelines_leave_no_descriptors_open() {
    let null_in = File::open("/dev/null").unwrap();
    let null_out = File::options().write(true).open("/dev/null").unwrap();
    let io = PipelineIo {
        stdin: Some(null_in.as_fd()),
        stdout: Some(null_out.as_fd()),
    };
    let lines = [
        "echo a | cat | cat | tr a b",
        "seq 1 5000 | sort -r | head -n 1",
        "rawsh-no-such-program-xyz | cat",
        "true",
    ];

    // first run warms up any lazily opened descriptors
    run_pipeline_with_io(&split_pipeline(lines[0]).unwrap(), io).unwrap();
    let before = open_descriptors();
    for line in lines {
        let exits = run_pipeline_with_io(&split_pipeline(line).unwrap(), io).unwrap();
        assert_eq!(exits.len(), line.split('|').count());
        assert_eq!(open_descriptors(), before, "{line}");
    }
}
