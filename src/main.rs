#[tokio::main]
async fn main() {
    if let Err(e) = tollgate::run().await {
        eprintln!("{:?}", e);
        std::process::exit(1);
    }
}
