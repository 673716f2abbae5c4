use volt_core::CommandReport;

/// Prints a finished command's report: status lines on stdout, the failure
/// summary (if any) on stderr. Returns the process exit code.
pub fn emit(report: &CommandReport) -> i32 {
    for line in &report.lines {
        println!("{line}");
    }
    if let Some(failure) = &report.failure {
        eprintln!("[ERROR] {failure}");
    }
    report.exit_code()
}
