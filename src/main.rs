#![allow(dead_code)]
#![allow(unused_imports)]
#![allow(unused_variables)]

use khi_inspect::cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = cli::parse_args();
    cli::run(args).await
}
