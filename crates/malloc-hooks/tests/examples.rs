#[cfg(test)]
pub mod tests {
    use std::process::{Command, Output};

    fn run_example(example: &str, envs: &[(&str, &str)]) -> Output {
        let output = Command::new("cargo")
            .args(["run", "-p", "test-hooks", "--example", example])
            .env_remove("MALLOC_HOOKS_FORMAT")
            .env_remove("MALLOC_HOOKS_DISABLED")
            .envs(envs.iter().copied())
            .output()
            .expect("Failed to execute command");

        assert!(
            output.status.success(),
            "Process did not exit successfully.\n\nstderr:\n{}",
            String::from_utf8_lossy(&output.stderr)
        );
        output
    }

    fn last_json_line(stdout: &str) -> serde_json::Value {
        let line = stdout
            .lines()
            .rev()
            .find(|line| line.starts_with('{'))
            .unwrap_or_else(|| panic!("No JSON report in output:\n{stdout}"));
        serde_json::from_str(line).expect("Failed to parse JSON report")
    }

    // cargo run -p test-hooks --example basic
    #[test]
    fn test_basic_table_output() {
        let output = run_example("basic", &[("NO_COLOR", "1")]);

        let all_expected = [
            "indexed 3 words",
            "[malloc-hooks]",
            "outstanding allocations",
            "basic::main",
            "allocation_count",
            "heap_allocated_memory_in_bytes",
        ];

        let stdout = String::from_utf8_lossy(&output.stdout);
        for expected in all_expected {
            assert!(
                stdout.contains(expected),
                "Expected:\n{expected}\n\nGot:\n{stdout}",
            );
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(
            stderr.contains("malloc hooks torn down"),
            "Expected tear down log.\n\nGot:\n{stderr}",
        );
    }

    // cargo run -p test-hooks --example json_report
    #[test]
    fn test_json_report_counts_retained_block() {
        let output = run_example("json_report", &[]);
        let stdout = String::from_utf8_lossy(&output.stdout);
        let report = last_json_line(&stdout);

        assert_eq!(report["caller_name"], "json_report::main");
        assert!(report["allocation_count"].as_u64().unwrap() >= 1);
        assert!(report["heap_allocated_memory_in_bytes"].as_u64().unwrap() >= 4096);
        assert!(report["total_elapsed"].is_u64());
    }

    // MALLOC_HOOKS_FORMAT=json cargo run -p test-hooks --example basic
    #[test]
    fn test_format_env_override() {
        let output = run_example("basic", &[("MALLOC_HOOKS_FORMAT", "json")]);
        let stdout = String::from_utf8_lossy(&output.stdout);
        let report = last_json_line(&stdout);

        assert_eq!(report["caller_name"], "basic::main");
        assert!(!stdout.contains("[malloc-hooks]"));
    }

    // MALLOC_HOOKS_DISABLED=1 cargo run -p test-hooks --example json_report
    #[test]
    fn test_disabled_env_skips_report() {
        let output = run_example("json_report", &[("MALLOC_HOOKS_DISABLED", "1")]);
        let stdout = String::from_utf8_lossy(&output.stdout);

        assert!(
            !stdout.contains("heap_allocated_memory_in_bytes"),
            "Expected no report.\n\nGot:\n{stdout}",
        );
    }

    // cargo run -p test-hooks --example multithread_alloc
    #[test]
    fn test_multithread_report() {
        let output = run_example("multithread_alloc", &[]);
        let stdout = String::from_utf8_lossy(&output.stdout);
        let report = last_json_line(&stdout);

        assert_eq!(report["caller_name"], "multithread_alloc::main");
        assert!(report["allocation_count"].is_u64());
        assert!(report["heap_allocated_memory_in_bytes"].is_u64());
    }

    // cargo run -p test-hooks --example async_main
    #[test]
    fn test_async_main_pretty_json() {
        let output = run_example("async_main", &[]);
        let stdout = String::from_utf8_lossy(&output.stdout);

        let start = stdout.find('{').expect("No JSON report");
        let report: serde_json::Value =
            serde_json::from_str(stdout[start..].trim()).expect("Failed to parse JSON report");

        assert_eq!(report["caller_name"], "async_main::main");
        assert!(stdout.contains("\n  \"allocation_count\""));
    }

    // cargo run -p test-hooks --example measure_block
    #[test]
    fn test_measure_block_output() {
        let output = run_example("measure_block", &[]);

        let all_expected = [
            "vec: allocation_count=1 heap_allocated_memory_in_bytes=8000",
            "string: allocation_count=1 heap_allocated_memory_in_bytes=10",
            "freed: allocation_count=0 heap_allocated_memory_in_bytes=0 len=512",
            "torn down: allocation_count=0 heap_allocated_memory_in_bytes=0",
        ];

        let stdout = String::from_utf8_lossy(&output.stdout);
        for expected in all_expected {
            assert!(
                stdout.contains(expected),
                "Expected:\n{expected}\n\nGot:\n{stdout}",
            );
        }
    }
}
