#[tokio::main]
async fn main() {
    if let Err(e) = drivetube_uploader_lib::run().await {
        eprintln!("drivetube: {}", e);
        std::process::exit(1);
    }
}
