#[tokio::main]
async fn main() -> anyhow::Result<()> {
    posetrack_lib::run().await
}
