use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    trendzo_etl::boot::boot().await
}
