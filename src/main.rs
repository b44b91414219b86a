#[tokio::main]
async fn main() -> anyhow::Result<()> {
    budget_buddy_api::cli::run_with_sys_args().await
}
