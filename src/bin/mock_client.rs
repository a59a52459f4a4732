use anyhow::Result;
use tank_volley::client::mock::{ClientArgs, init_tracing, run};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let args = ClientArgs::parse()?;
    run(args).await
}
