use std::path::PathBuf;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let base_path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));

    match review_engine::run(base_path).await {
        Ok(result) if result.success => {
            println!("{}", result.report.unwrap_or_default());
            ExitCode::SUCCESS
        }
        Ok(result) => {
            eprintln!(
                "review {} failed [{}]: {}",
                result.execution_id,
                result.error_code.unwrap_or_default(),
                result.error.unwrap_or_default()
            );
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("review-engine: {}", e);
            ExitCode::from(2)
        }
    }
}
