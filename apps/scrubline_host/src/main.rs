#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    scrubline_host::run().await
}
